//! Coprocessor 0 instructions and forwarding of the other coprocessors to the bus

use super::branch::{branch_if, branch_likely_if};
use super::write_ud0;
use crate::ee::bus::Bus;
use crate::ee::processor::cpu::{self, sext32, Cpu};
use crate::ee::processor::instruction::Instruction;

/// COP1, COP2 and their load/store opcodes
pub(crate) fn op_forward(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    bus.coprocessor(cpu, instruction);
}

/// Move From Coprocessor 0
pub(crate) fn op_mfc0(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.cop0.reg(instruction.d().0 as usize);

    write_ud0(cpu, instruction.t(), sext32(v));
}

/// Move To Coprocessor 0
pub(crate) fn op_mtc0(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.ul0(instruction.t());

    cpu.cop0.set_reg(instruction.d().0 as usize, v);
}

pub(crate) fn op_bc0f(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = !bus.cop0_condition();

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bc0t(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = bus.cop0_condition();

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bc0fl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = !bus.cop0_condition();

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bc0tl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = bus.cop0_condition();

    branch_likely_if(cpu, bus, instruction, taken);
}

/// Exception Return. No delay slot.
pub(crate) fn op_eret(cpu: &mut Cpu, bus: &mut dyn Bus, _: Instruction) {
    let pc = cpu.cop0.return_from_exception();

    cpu.set_pc(pc);
    cpu::set_branch(cpu);

    bus.branch_test(cpu);
}

/// Enable Interrupts
pub(crate) fn op_ei(cpu: &mut Cpu, _: &mut dyn Bus, _: Instruction) {
    if cpu.cop0.interrupt_control_allowed() {
        cpu.cop0.set_eie(true);
    }
}

/// Disable Interrupts
pub(crate) fn op_di(cpu: &mut Cpu, _: &mut dyn Bus, _: Instruction) {
    if cpu.cop0.interrupt_control_allowed() {
        cpu.cop0.set_eie(false);
    }
}
