//! Coprocessor 0: system control registers and exception entry

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::cpu::Cpu;
use crate::bitwise::Bitwise;

pub const COUNT: usize = 9;
pub const COMPARE: usize = 11;
pub const STATUS: usize = 12;
pub const CAUSE: usize = 13;
pub const EPC: usize = 14;
pub const PRID: usize = 15;
pub const ERROR_EPC: usize = 30;

/// Status register bits
pub mod status {
    pub const IE: u8 = 0;
    pub const EXL: u8 = 1;
    pub const ERL: u8 = 2;
    /// Kernel/supervisor/user mode, bits [4:3]
    pub const KSU_SHIFT: u8 = 3;
    pub const EIE: u8 = 16;
    pub const EDI: u8 = 17;
    pub const BEV: u8 = 22;
}

/// Processor revision reported by the R5900
const R5900_PRID: u32 = 0x2e20;

/// Exception codes, as stored in the ExcCode field of the Cause register
#[derive(serde::Serialize, serde::Deserialize, FromPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExceptionCode {
    Interrupt = 0,
    TlbModified = 1,
    TlbLoad = 2,
    TlbStore = 3,
    LoadAddressError = 4,
    StoreAddressError = 5,
    InstructionBusError = 6,
    DataBusError = 7,
    Syscall = 8,
    Break = 9,
    ReservedInstruction = 10,
    CoprocessorUnusable = 11,
    Overflow = 12,
    Trap = 13,
}

impl ExceptionCode {
    /// Value of the code as it appears in bits [6:2] of the Cause register
    pub fn cause_bits(self) -> u32 {
        (self as u32) << 2
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Cop0 {
    regs: [u32; 32],
}

impl Cop0 {
    pub fn new() -> Cop0 {
        let mut regs = [0; 32];

        // The CPU comes out of reset in the error level, running from the bootstrap vectors
        regs[STATUS].set_bit(status::ERL, true);
        regs[STATUS].set_bit(status::BEV, true);
        regs[PRID] = R5900_PRID;

        Cop0 { regs }
    }

    pub fn reg(&self, index: usize) -> u32 {
        self.regs[index & 0x1f]
    }

    pub fn set_reg(&mut self, index: usize, val: u32) {
        match index & 0x1f {
            // Read-only
            PRID => (),
            COMPARE => {
                self.regs[COMPARE] = val;
                // Writing Compare acknowledges the timer interrupt (IP7)
                self.regs[CAUSE] &= !(1 << 15);
            }
            i => self.regs[i] = val,
        }
    }

    pub fn status(&self) -> u32 {
        self.regs[STATUS]
    }

    pub fn cause(&self) -> u32 {
        self.regs[CAUSE]
    }

    /// Decode the ExcCode field of the Cause register
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        ExceptionCode::from_u32((self.regs[CAUSE] >> 2) & 0x1f)
    }

    pub fn epc(&self) -> u32 {
        self.regs[EPC]
    }

    /// Advance the Count register by one instruction
    pub fn tick(&mut self) {
        self.regs[COUNT] = self.regs[COUNT].wrapping_add(1);
    }

    /// True when EI/DI are allowed to touch the EIE bit: kernel mode or one of the exception levels
    pub fn interrupt_control_allowed(&self) -> bool {
        let s = self.regs[STATUS];
        let kernel = (s >> status::KSU_SHIFT) & 3 == 0;

        kernel || s.bit(status::EDI) || s.bit(status::EXL) || s.bit(status::ERL)
    }

    pub fn set_eie(&mut self, enabled: bool) {
        self.regs[STATUS].set_bit(status::EIE, enabled);
    }

    /// Leave the current exception level and return the address to resume at
    pub fn return_from_exception(&mut self) -> u32 {
        let s = &mut self.regs[STATUS];

        if s.bit(status::ERL) {
            s.set_bit(status::ERL, false);
            self.regs[ERROR_EPC]
        } else {
            s.set_bit(status::EXL, false);
            self.regs[EPC]
        }
    }
}

/// Update COP0 for exception `code` and move PC to the matching vector. `cpu.pc` must hold the
/// address to report in EPC (adjusted by 4 when `delay_slot` is set).
pub fn enter_exception(cpu: &mut Cpu, code: ExceptionCode, delay_slot: bool) {
    let pc = cpu.pc();
    let cop0 = &mut cpu.cop0;

    cop0.regs[CAUSE] = (cop0.regs[CAUSE] & !0x7c) | code.cause_bits();

    let mut offset = match code {
        ExceptionCode::TlbLoad | ExceptionCode::TlbStore => 0x000,
        ExceptionCode::Interrupt => 0x200,
        _ => 0x180,
    };

    let sr = cop0.regs[STATUS];

    if sr.bit(status::EXL) {
        // Nested exception: EPC is left alone and the refill vector isn't used
        offset = 0x180;
    } else {
        cop0.regs[STATUS].set_bit(status::EXL, true);

        if delay_slot {
            cop0.regs[EPC] = pc.wrapping_sub(4);
            cop0.regs[CAUSE].set_bit(31, true);
        } else {
            cop0.regs[EPC] = pc;
            cop0.regs[CAUSE].set_bit(31, false);
        }
    }

    let base = if sr.bit(status::BEV) {
        0xbfc0_0200
    } else {
        0x8000_0000
    };

    cpu.set_pc(base + offset);
}
