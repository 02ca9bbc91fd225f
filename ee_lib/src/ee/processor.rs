//! R5900 integer core: register file, decoder and instruction handlers

pub mod bios;
pub mod cop0;
pub mod cpu;
pub mod instruction;
pub mod opcodes;
mod ops;
pub mod vu;

#[cfg(test)]
pub(crate) mod asm;

use std::fmt;

/// A simple wrapper around a register index to avoid coding errors where the register index could
/// be used instead of its value
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RegisterIndex(pub u8);

impl RegisterIndex {
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn name(self) -> &'static str {
        REGISTER_NAMES[self.0 as usize & 0x1f]
    }
}

impl fmt::Debug for RegisterIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Conventional names given to the MIPS registers
pub const REGISTER_NAMES: [&str; 32] = [
    "zero", // Hardwired to be always 0
    "at",   // Assembler Temporary (reserved for the assembler)
    "v0", "v1", // First and second return values. v1 also holds the BIOS call number
    "a0", "a1", "a2", "a3", // First four function arguments
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", // Temporary registers
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", // Saved registers
    "t8", "t9", // Temporary registers
    "k0", "k1", // Reserved for kernel use
    "gp", // Global pointer
    "sp", // Stack Pointer
    "fp", // Frame Pointer
    "ra", // Return address
];

pub mod reg {
    //! Indices of the registers the interpreter touches directly
    use super::RegisterIndex;

    pub const V1: RegisterIndex = RegisterIndex(3);
    pub const A0: RegisterIndex = RegisterIndex(4);
    pub const A1: RegisterIndex = RegisterIndex(5);
    pub const RA: RegisterIndex = RegisterIndex(31);
}
