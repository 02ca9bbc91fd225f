use crate::ee::memory::byte_backed_memory;

/// The EE data scratchpad: 16kB of fast on-chip RAM
pub const SCRATCH_PAD_SIZE: usize = 16 * 1024;

pub struct ScratchPad {
    data: Vec<u8>,
}

impl ScratchPad {
    pub fn new() -> ScratchPad {
        ScratchPad {
            data: vec![0; SCRATCH_PAD_SIZE],
        }
    }

    fn offset(&self, addr: u32, width: usize) -> usize {
        (addr as usize & (SCRATCH_PAD_SIZE - 1)) & !(width - 1)
    }
}

byte_backed_memory!(ScratchPad, data, offset);
