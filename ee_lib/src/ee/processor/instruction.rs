use std::fmt;

use super::RegisterIndex;

/// A single R5900 instruction word wrapper to make decoding easier
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction(pub u32);

impl Instruction {
    pub fn new(machine_code: u32) -> Instruction {
        Instruction(machine_code)
    }

    /// Return bits [31:26] of the instruction
    pub fn opcode(self) -> usize {
        let Instruction(op) = self;

        (op >> 26) as usize
    }

    /// Return bits [5:0] of the instruction
    pub fn function(self) -> usize {
        let Instruction(op) = self;

        (op & 0x3f) as usize
    }

    /// Return immediate value in bits [15:0]
    pub fn imm(self) -> u32 {
        let Instruction(op) = self;

        op & 0xffff
    }

    /// Return immediate value in bits [15:0] sign-extended to 32 bits
    pub fn imm_se(self) -> u32 {
        let Instruction(op) = self;

        (op & 0xffff) as i16 as u32
    }

    /// Return immediate value in bits [15:0] sign-extended to 64 bits
    pub fn imm_se64(self) -> u64 {
        let Instruction(op) = self;

        (op & 0xffff) as i16 as u64
    }

    /// Jump target stored in bits [25:0].
    pub fn imm_jump(self) -> u32 {
        let Instruction(op) = self;

        // The two LSBs aren't stored since (due to alignment constraints) they're assumed to be 0.
        (op & 0x3ff_ffff) << 2
    }

    /// Shift amount in bits [10:6]. Also selects the operation in the MMI sub-groups.
    pub fn shift(self) -> u32 {
        let Instruction(op) = self;

        (op >> 6) & 0x1f
    }

    /// Return register index in bits [25:21]
    pub fn s(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 21) & 0x1f) as u8)
    }

    /// Return register index in bits [20:16]
    pub fn t(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 16) & 0x1f) as u8)
    }

    /// Return register index in bits [15:11]
    pub fn d(self) -> RegisterIndex {
        let Instruction(op) = self;

        RegisterIndex(((op >> 11) & 0x1f) as u8)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Instruction(0x{:08x})", self.0)
    }
}

#[test]
fn field_extraction() {
    // daddiu sp, sp, -0x20
    let i = Instruction::new(0x67bd_ffe0);

    assert_eq!(i.opcode(), 0x19);
    assert_eq!(i.s(), RegisterIndex(29));
    assert_eq!(i.t(), RegisterIndex(29));
    assert_eq!(i.imm(), 0xffe0);
    assert_eq!(i.imm_se(), 0xffff_ffe0);
    assert_eq!(i.imm_se64(), 0xffff_ffff_ffff_ffe0);

    // dsll32 v0, v1, 3
    let i = Instruction::new(0x0003_10fc);

    assert_eq!(i.opcode(), 0);
    assert_eq!(i.function(), 0x3c);
    assert_eq!(i.t(), RegisterIndex(3));
    assert_eq!(i.d(), RegisterIndex(2));
    assert_eq!(i.shift(), 3);

    // j 0x00100008
    let i = Instruction::new(0x0804_0002);

    assert_eq!(i.imm_jump(), 0x0010_0008);
}
