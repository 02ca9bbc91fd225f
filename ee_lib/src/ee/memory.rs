//! EE memory interface and the concrete devices backing the default memory map

/// Memory collaborator used by the interpreter and the SIF engine. Every access takes `&mut self`
/// since reads can have side effects on memory-mapped registers.
///
/// Only the 32bit accessors are mandatory, the other widths are built on top of them. Devices
/// with real byte-level storage are expected to override everything.
pub trait Memory {
    fn read32(&mut self, addr: u32) -> u32;

    fn write32(&mut self, addr: u32, val: u32);

    fn read8(&mut self, addr: u32) -> u8 {
        let shift = (addr & 3) * 8;

        (self.read32(addr & !3) >> shift) as u8
    }

    fn read16(&mut self, addr: u32) -> u16 {
        let shift = (addr & 2) * 8;

        (self.read32(addr & !3) >> shift) as u16
    }

    fn read64(&mut self, addr: u32) -> u64 {
        let addr = addr & !7;
        let lo = self.read32(addr) as u64;
        let hi = self.read32(addr.wrapping_add(4)) as u64;

        lo | (hi << 32)
    }

    fn read128(&mut self, addr: u32) -> u128 {
        let addr = addr & !0xf;
        let lo = self.read64(addr) as u128;
        let hi = self.read64(addr.wrapping_add(8)) as u128;

        lo | (hi << 64)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        let shift = (addr & 3) * 8;
        let word = self.read32(addr & !3) & !(0xff << shift);

        self.write32(addr & !3, word | ((val as u32) << shift))
    }

    fn write16(&mut self, addr: u32, val: u16) {
        let shift = (addr & 2) * 8;
        let word = self.read32(addr & !3) & !(0xffff << shift);

        self.write32(addr & !3, word | ((val as u32) << shift))
    }

    fn write64(&mut self, addr: u32, val: u64) {
        let addr = addr & !7;

        self.write32(addr, val as u32);
        self.write32(addr.wrapping_add(4), (val >> 32) as u32);
    }

    fn write128(&mut self, addr: u32, val: u128) {
        let addr = addr & !0xf;

        self.write64(addr, val as u64);
        self.write64(addr.wrapping_add(8), (val >> 64) as u64);
    }
}

/// Implements every `Memory` accessor on top of a little-endian byte slice. `$offset` turns a
/// device-relative address and an access size into an index into `$data`.
macro_rules! byte_backed_memory {
    ($t:ty, $data:ident, $offset:ident) => {
        impl $crate::ee::memory::Memory for $t {
            fn read8(&mut self, addr: u32) -> u8 {
                self.$data[self.$offset(addr, 1)]
            }

            fn read16(&mut self, addr: u32) -> u16 {
                let off = self.$offset(addr, 2);

                u16::from_le_bytes(*array_ref![self.$data, off, 2])
            }

            fn read32(&mut self, addr: u32) -> u32 {
                let off = self.$offset(addr, 4);

                u32::from_le_bytes(*array_ref![self.$data, off, 4])
            }

            fn read64(&mut self, addr: u32) -> u64 {
                let off = self.$offset(addr, 8);

                u64::from_le_bytes(*array_ref![self.$data, off, 8])
            }

            fn read128(&mut self, addr: u32) -> u128 {
                let off = self.$offset(addr, 16);

                u128::from_le_bytes(*array_ref![self.$data, off, 16])
            }

            fn write8(&mut self, addr: u32, val: u8) {
                let off = self.$offset(addr, 1);

                self.$data[off] = val;
            }

            fn write16(&mut self, addr: u32, val: u16) {
                let off = self.$offset(addr, 2);

                self.$data[off..off + 2].copy_from_slice(&val.to_le_bytes());
            }

            fn write32(&mut self, addr: u32, val: u32) {
                let off = self.$offset(addr, 4);

                self.$data[off..off + 4].copy_from_slice(&val.to_le_bytes());
            }

            fn write64(&mut self, addr: u32, val: u64) {
                let off = self.$offset(addr, 8);

                self.$data[off..off + 8].copy_from_slice(&val.to_le_bytes());
            }

            fn write128(&mut self, addr: u32, val: u128) {
                let off = self.$offset(addr, 16);

                self.$data[off..off + 16].copy_from_slice(&val.to_le_bytes());
            }
        }
    };
}

pub(crate) use byte_backed_memory;

pub mod map;
pub mod ram;
pub mod scratch_pad;
