use crate::ee::memory::byte_backed_memory;
use crate::error::{EeError, EeResult};

/// EE main RAM: 32MB on retail units
pub const RAM_SIZE: usize = 32 * 1024 * 1024;

/// Flat little-endian RAM. The size must be a power of two, addresses wrap around (mirror) past the
/// end.
pub struct Ram {
    data: Vec<u8>,
    mask: u32,
}

impl Ram {
    pub fn new() -> Ram {
        Ram {
            data: vec![0; RAM_SIZE],
            mask: (RAM_SIZE - 1) as u32,
        }
    }

    pub fn with_size(size: usize) -> EeResult<Ram> {
        if !size.is_power_of_two() || size < 16 || size > RAM_SIZE * 4 {
            return Err(EeError::InvalidState(format!("Bad RAM size: {} bytes", size)));
        }

        Ok(Ram {
            data: vec![0; size],
            mask: (size - 1) as u32,
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copy `image` at `offset` without any mirroring. Returns an error if it doesn't fit.
    pub fn load_image(&mut self, offset: u32, image: &[u8]) -> EeResult<()> {
        let start = (offset & self.mask) as usize;
        let end = start + image.len();

        if end > self.data.len() {
            return Err(EeError::ImageTooLarge {
                addr: offset,
                size: image.len(),
            });
        }

        self.data[start..end].copy_from_slice(image);

        Ok(())
    }

    /// Accesses are naturally aligned, that also guarantees they never straddle the end of the
    /// buffer.
    fn offset(&self, addr: u32, width: usize) -> usize {
        ((addr & self.mask) as usize) & !(width - 1)
    }
}

byte_backed_memory!(Ram, data, offset);
