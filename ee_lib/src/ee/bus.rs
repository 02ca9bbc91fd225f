//! Collaborators the interpreter calls out to, and a self-contained implementation wiring them
//! to the default memory map

use super::memory::Memory;
use super::memory::map::MemoryMap;
use super::memory::ram::Ram;
use super::processor::cop0::{self, ExceptionCode};
use super::processor::cpu::Cpu;
use super::processor::instruction::Instruction;
use super::sif::{Side, SifChannel, SifHost};

/// Everything an instruction handler can reach outside of the register file
pub trait Bus: Memory {
    /// Raise an architectural exception. The default implementation updates COP0 and jumps to the
    /// exception vector.
    fn raise_exception(&mut self, cpu: &mut Cpu, code: ExceptionCode, delay_slot: bool) {
        cop0::enter_exception(cpu, code, delay_slot);
    }

    /// Called after every committed branch, used to check for pending interrupts
    fn branch_test(&mut self, cpu: &mut Cpu);

    /// State of the CPCOND0 input sampled by the BC0x branches
    fn cop0_condition(&mut self) -> bool {
        false
    }

    /// COP1 and COP2 instructions (including their loads and stores) are not handled by the
    /// integer core
    fn coprocessor(&mut self, cpu: &mut Cpu, instruction: Instruction) {
        debug!(
            "Ignoring coprocessor instruction {} at PC 0x{:08x}",
            instruction,
            cpu.pc().wrapping_sub(4)
        );
    }
}

/// Interrupt queued by the SIF engine and not yet delivered
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScheduledIrq {
    pub side: Side,
    pub channel: SifChannel,
    pub cycles: u32,
}

/// IOP RAM: 2MB
pub const IOP_RAM_SIZE: usize = 2 * 1024 * 1024;

/// Self-contained bus: EE memory map, flat IOP RAM and a log of the events the core raised. Used
/// by the command line front-end and by the tests.
pub struct SimpleBus {
    pub map: MemoryMap,
    pub iop_ram: Ram,
    /// Interrupts requested by the SIF engine, oldest first
    pub pending_irqs: Vec<ScheduledIrq>,
    /// Last exception raised, with its delay slot flag
    pub last_exception: Option<(ExceptionCode, bool)>,
    /// Number of branch tests run so far
    pub branch_tests: u64,
    /// Value returned for the CPCOND0 input
    pub cpcond0: bool,
}

impl SimpleBus {
    pub fn new(ee_ram: Ram, iop_ram: Ram) -> SimpleBus {
        SimpleBus {
            map: MemoryMap::new(ee_ram),
            iop_ram,
            pending_irqs: Vec::new(),
            last_exception: None,
            branch_tests: 0,
            cpcond0: false,
        }
    }

    /// Retrieve and clear the queued SIF interrupts
    pub fn take_irqs(&mut self) -> Vec<ScheduledIrq> {
        std::mem::take(&mut self.pending_irqs)
    }
}

impl Memory for SimpleBus {
    fn read8(&mut self, addr: u32) -> u8 {
        self.map.read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.map.read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.map.read32(addr)
    }

    fn read64(&mut self, addr: u32) -> u64 {
        self.map.read64(addr)
    }

    fn read128(&mut self, addr: u32) -> u128 {
        self.map.read128(addr)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        self.map.write8(addr, val)
    }

    fn write16(&mut self, addr: u32, val: u16) {
        self.map.write16(addr, val)
    }

    fn write32(&mut self, addr: u32, val: u32) {
        self.map.write32(addr, val)
    }

    fn write64(&mut self, addr: u32, val: u64) {
        self.map.write64(addr, val)
    }

    fn write128(&mut self, addr: u32, val: u128) {
        self.map.write128(addr, val)
    }
}

impl Bus for SimpleBus {
    fn raise_exception(&mut self, cpu: &mut Cpu, code: ExceptionCode, delay_slot: bool) {
        self.last_exception = Some((code, delay_slot));
        cop0::enter_exception(cpu, code, delay_slot);
    }

    fn branch_test(&mut self, _cpu: &mut Cpu) {
        self.branch_tests += 1;
    }

    fn cop0_condition(&mut self) -> bool {
        self.cpcond0
    }
}

impl SifHost for SimpleBus {
    fn ee_load(&mut self, addr: u32) -> u32 {
        self.map.read32(addr)
    }

    fn ee_store(&mut self, addr: u32, val: u32) {
        self.map.write32(addr, val)
    }

    fn iop_load(&mut self, addr: u32) -> u32 {
        self.iop_ram.read32(addr)
    }

    fn iop_store(&mut self, addr: u32, val: u32) {
        self.iop_ram.write32(addr, val)
    }

    fn schedule_interrupt(&mut self, side: Side, channel: SifChannel, cycles: u32) {
        self.pending_irqs.push(ScheduledIrq {
            side,
            channel,
            cycles,
        });
    }
}
