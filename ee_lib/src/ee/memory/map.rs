//! EE physical memory map

use super::ram::Ram;
use super::scratch_pad::ScratchPad;
use super::Memory;
use crate::ee::sif::registers::SifRegisters;

/// Mask array used to strip the region bits of the address. The mask is selected using the 3
/// MSBs of the address. KSEG0 and KSEG1 are direct windows on the low 512MB of physical memory,
/// KUSEG and KSEG2 are passed through untouched.
const REGION_MASK: [u32; 8] = [
    // KUSEG: 2048MB
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    // KSEG0: 512MB
    0x1fff_ffff,
    // KSEG1: 512MB
    0x1fff_ffff,
    // KSEG2: 1024MB
    0xffff_ffff,
    0xffff_ffff,
];

/// Mask a CPU address to remove the region bits.
pub fn mask_region(addr: u32) -> u32 {
    let index = (addr >> 29) as usize;

    addr & REGION_MASK[index]
}

#[derive(Clone, Copy)]
pub struct Range(pub u32, u32);

impl Range {
    /// Return `Some(offset)` if addr is contained in `self`
    pub fn contains(self, addr: u32) -> Option<u32> {
        let Range(start, length) = self;

        if addr >= start && addr - start < length {
            Some(addr - start)
        } else {
            None
        }
    }
}

/// Main RAM window. Smaller RAM configurations are mirrored across it.
pub const RAM: Range = Range(0x0000_0000, 0x0200_0000);

/// SIF mailbox and flag registers
pub const SIF_REGISTERS: Range = Range(0x1000_f200, 0x70);

/// Scratchpad RAM. Not reachable through KSEG0/KSEG1 so it's matched on the raw address.
pub const SCRATCH_PAD: Range = Range(0x7000_0000, 0x4000);

/// Default EE memory map: main RAM, scratchpad and the SIF registers. Anything else reads as 0 and
/// ignores writes.
pub struct MemoryMap {
    pub ram: Ram,
    pub scratch_pad: ScratchPad,
    pub sif: SifRegisters,
}

impl MemoryMap {
    pub fn new(ram: Ram) -> MemoryMap {
        MemoryMap {
            ram,
            scratch_pad: ScratchPad::new(),
            sif: SifRegisters::new(),
        }
    }

    fn device(&mut self, addr: u32) -> Option<(&mut dyn Memory, u32)> {
        if let Some(offset) = SCRATCH_PAD.contains(addr) {
            return Some((&mut self.scratch_pad, offset));
        }

        let abs_addr = mask_region(addr);

        if let Some(offset) = RAM.contains(abs_addr) {
            return Some((&mut self.ram, offset));
        }

        if let Some(offset) = SIF_REGISTERS.contains(abs_addr) {
            return Some((&mut self.sif, offset));
        }

        None
    }
}

macro_rules! dispatch {
    ($read:ident, $write:ident, $t:ty) => {
        fn $read(&mut self, addr: u32) -> $t {
            match self.device(addr) {
                Some((dev, offset)) => dev.$read(offset),
                None => {
                    debug!("Unhandled {} at 0x{:08x}", stringify!($read), addr);
                    0
                }
            }
        }

        fn $write(&mut self, addr: u32, val: $t) {
            match self.device(addr) {
                Some((dev, offset)) => dev.$write(offset, val),
                None => debug!(
                    "Unhandled {} at 0x{:08x}: 0x{:x}",
                    stringify!($write),
                    addr,
                    val
                ),
            }
        }
    };
}

impl Memory for MemoryMap {
    dispatch!(read8, write8, u8);
    dispatch!(read16, write16, u16);
    dispatch!(read32, write32, u32);
    dispatch!(read64, write64, u64);
    dispatch!(read128, write128, u128);
}
