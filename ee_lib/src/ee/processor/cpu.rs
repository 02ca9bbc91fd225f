//! R5900 register file and execution loop

use std::fmt;

use super::bios::BiosHle;
use super::cop0::{Cop0, ExceptionCode};
use super::instruction::Instruction;
use super::opcodes;
use super::{RegisterIndex, REGISTER_NAMES};
use crate::ee::addressable::Addressable;
use crate::ee::bus::Bus;

/// 128bit general purpose register. All the narrower views (8, 16, 32 and 64bit, signed or not)
/// are computed from the two little-endian doublewords.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gpr {
    ud: [u64; 2],
}

impl Gpr {
    pub const ZERO: Gpr = Gpr { ud: [0; 2] };

    pub fn new(lo: u64, hi: u64) -> Gpr {
        Gpr { ud: [lo, hi] }
    }

    pub fn from_u128(v: u128) -> Gpr {
        Gpr::new(v as u64, (v >> 64) as u64)
    }

    pub fn as_u128(self) -> u128 {
        (self.ud[0] as u128) | ((self.ud[1] as u128) << 64)
    }

    pub fn ud(self, n: usize) -> u64 {
        self.ud[n]
    }

    pub fn sd(self, n: usize) -> i64 {
        self.ud[n] as i64
    }

    pub fn ul(self, n: usize) -> u32 {
        (self.ud[n >> 1] >> ((n & 1) * 32)) as u32
    }

    pub fn sl(self, n: usize) -> i32 {
        self.ul(n) as i32
    }

    pub fn us(self, n: usize) -> u16 {
        (self.ud[n >> 2] >> ((n & 3) * 16)) as u16
    }

    pub fn ss(self, n: usize) -> i16 {
        self.us(n) as i16
    }

    pub fn uc(self, n: usize) -> u8 {
        (self.ud[n >> 3] >> ((n & 7) * 8)) as u8
    }

    pub fn sc(self, n: usize) -> i8 {
        self.uc(n) as i8
    }

    pub fn set_ud(&mut self, n: usize, v: u64) {
        self.ud[n] = v;
    }

    pub fn set_ul(&mut self, n: usize, v: u32) {
        self.set_bits(n >> 1, (n & 1) * 32, 0xffff_ffff, v as u64);
    }

    pub fn set_us(&mut self, n: usize, v: u16) {
        self.set_bits(n >> 2, (n & 3) * 16, 0xffff, v as u64);
    }

    pub fn set_uc(&mut self, n: usize, v: u8) {
        self.set_bits(n >> 3, (n & 7) * 8, 0xff, v as u64);
    }

    fn set_bits(&mut self, d: usize, shift: usize, mask: u64, v: u64) {
        let dw = &mut self.ud[d];

        *dw = (*dw & !(mask << shift)) | (v << shift);
    }
}

impl fmt::Debug for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016x}_{:016x}", self.ud[1], self.ud[0])
    }
}

/// Sign-extend a 32bit result into a 64bit register slot
pub fn sext32(v: u32) -> u64 {
    v as i32 as u64
}

/// Reset value for the PC: beginning of BIOS ROM
pub const RESET_PC: u32 = 0xbfc0_0000;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Cpu {
    /// The Program Counter register: points to the next instruction
    pc: u32,
    /// General Purpose Registers. R0 is never written
    regs: [Gpr; 32],
    /// HI register. The upper doubleword is HI1, used by the second multiplier pipeline
    pub(crate) hi: Gpr,
    /// LO register. The upper doubleword is LO1
    pub(crate) lo: Gpr,
    /// Shift amount register used by QFSRV
    pub(crate) sa: u32,
    /// Set while the instruction in a branch delay slot executes
    delay_slot: bool,
    /// Set whenever a branch is committed, used by `run_to_branch`
    branch_taken: bool,
    /// Set when an exception is raised. A pending branch is dropped if its delay slot raised one
    exception_raised: bool,
    /// Number of instructions executed since reset
    cycle: u64,
    pub(crate) cop0: Cop0,
    /// BIOS high level helpers, not part of the architectural state
    #[serde(skip)]
    pub(crate) bios: BiosHle,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            pc: RESET_PC,
            regs: [Gpr::ZERO; 32],
            hi: Gpr::ZERO,
            lo: Gpr::ZERO,
            sa: 0,
            delay_slot: false,
            branch_taken: false,
            exception_raised: false,
            cycle: 0,
            cop0: Cop0::new(),
            bios: BiosHle::new(),
        }
    }

    pub fn reset(&mut self) {
        let log_calls = self.bios.log_calls;

        *self = Cpu::new();
        self.bios.log_calls = log_calls;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Force PC address, used when loading an executable and when entering an exception vector
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Returns true if the instruction currently being executed is in a delay slot
    pub fn in_delay_slot(&self) -> bool {
        self.delay_slot
    }

    /// Number of instructions executed since reset
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn reg(&self, index: RegisterIndex) -> Gpr {
        self.regs[index.0 as usize]
    }

    /// Replace the full 128bit contents of a register. Writes to R0 are ignored.
    pub fn set_reg(&mut self, index: RegisterIndex, v: Gpr) {
        if !index.is_zero() {
            self.regs[index.0 as usize] = v;
        }
    }

    pub fn hi(&self) -> Gpr {
        self.hi
    }

    pub fn lo(&self) -> Gpr {
        self.lo
    }

    pub fn sa(&self) -> u32 {
        self.sa
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn cop0_mut(&mut self) -> &mut Cop0 {
        &mut self.cop0
    }

    /// Enable or disable the BIOS call trace
    pub fn set_bios_logging(&mut self, enabled: bool) {
        self.bios.log_calls = enabled;
    }

    /// Mutable access for the handlers. They must have already filtered out R0.
    pub(crate) fn reg_mut(&mut self, index: RegisterIndex) -> &mut Gpr {
        debug_assert!(!index.is_zero(), "Attempted to write to R0");

        &mut self.regs[index.0 as usize]
    }

    /// Write the lower doubleword of `index`, leaving the upper half untouched
    pub(crate) fn set_ud0(&mut self, index: RegisterIndex, v: u64) {
        self.reg_mut(index).set_ud(0, v);
    }

    /// Return the lower doubleword of `index`
    pub(crate) fn ud0(&self, index: RegisterIndex) -> u64 {
        self.regs[index.0 as usize].ud(0)
    }

    /// Return the lower word of `index`, the usual source of memory addresses
    pub(crate) fn ul0(&self, index: RegisterIndex) -> u32 {
        self.regs[index.0 as usize].ul(0)
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PC: 0x{:08x}  cycle: {}", self.pc, self.cycle)?;

        for (i, r) in self.regs.iter().enumerate() {
            writeln!(f, "{:>4}: {:?}", REGISTER_NAMES[i], r)?;
        }

        writeln!(f, "  hi: {:?}", self.hi)?;
        writeln!(f, "  lo: {:?}", self.lo)?;
        writeln!(f, "  sa: 0x{:x}", self.sa)
    }
}

/// Fetch, decode and execute the instruction at PC. PC is advanced before the handler runs so
/// branch targets and return addresses are computed relative to the delay slot.
pub fn step(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let instruction = Instruction::new(bus.read32(cpu.pc));

    cpu.pc = cpu.pc.wrapping_add(4);

    let op = opcodes::decode(instruction);

    (op.handler)(cpu, bus, instruction);

    cpu.cycle = cpu.cycle.wrapping_add(1);
    cpu.cop0.tick();
}

/// Commit a branch to `target`: the delay slot instruction runs first, then PC is moved and the
/// branch test runs.
pub fn branch(cpu: &mut Cpu, bus: &mut dyn Bus, target: u32) {
    cpu.branch_taken = true;
    cpu.exception_raised = false;

    cpu.delay_slot = true;
    step(cpu, bus);
    cpu.delay_slot = false;

    if !cpu.exception_raised {
        cpu.pc = target;
    }

    bus.branch_test(cpu);
}

/// Mark a branch as committed without running a delay slot (ERET)
pub fn set_branch(cpu: &mut Cpu) {
    cpu.branch_taken = true;
}

/// Run instructions until a branch has been committed. Returns the number of instructions
/// executed, delay slot included.
pub fn run_to_branch(cpu: &mut Cpu, bus: &mut dyn Bus) -> u64 {
    let start = cpu.cycle;

    cpu.branch_taken = false;

    while !cpu.branch_taken {
        step(cpu, bus);
    }

    cpu.cycle.wrapping_sub(start)
}

/// Raise an exception through the bus, flagging it for any pending branch
pub fn exception(cpu: &mut Cpu, bus: &mut dyn Bus, code: ExceptionCode) {
    cpu.exception_raised = true;

    let delay_slot = cpu.delay_slot;

    bus.raise_exception(cpu, code, delay_slot);
}

/// Execute a memory read
pub fn load<T: Addressable>(bus: &mut dyn Bus, addr: u32) -> T {
    if addr as usize % T::size() != 0 {
        debug!("Unaligned {:?} load at 0x{:08x}", T::width(), addr);
    }

    T::load_from(bus, addr)
}

/// Execute a memory write
pub fn store<T: Addressable>(bus: &mut dyn Bus, addr: u32, v: T) {
    if addr as usize % T::size() != 0 {
        debug!("Unaligned {:?} store at 0x{:08x}", T::width(), addr);
    }

    v.store_to(bus, addr)
}
