//! Jumps, conditional branches and traps

use crate::ee::bus::Bus;
use crate::ee::processor::cop0::ExceptionCode;
use crate::ee::processor::cpu::{self, Cpu};
use crate::ee::processor::instruction::Instruction;
use crate::ee::processor::reg;
use crate::ee::processor::RegisterIndex;

/// PC-relative branch target. PC already points at the delay slot.
fn target(cpu: &Cpu, instruction: Instruction) -> u32 {
    cpu.pc().wrapping_add(instruction.imm_se() << 2)
}

/// Ordinary conditional branch: the delay slot always runs, either through `cpu::branch` or as
/// the next sequential instruction.
pub(super) fn branch_if(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction, taken: bool) {
    if taken {
        let target = target(cpu, instruction);

        cpu::branch(cpu, bus, target);
    } else {
        bus.branch_test(cpu);
    }
}

/// "Likely" branch: when not taken the delay slot is skipped entirely
pub(super) fn branch_likely_if(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction, taken: bool) {
    if taken {
        let target = target(cpu, instruction);

        cpu::branch(cpu, bus, target);
    } else {
        let pc = cpu.pc();

        cpu.set_pc(pc.wrapping_add(4));
        bus.branch_test(cpu);
    }
}

/// Store the return address (the instruction after the delay slot) in `index`
fn link(cpu: &mut Cpu, index: RegisterIndex) {
    let ra = cpu.pc().wrapping_add(4);

    if !index.is_zero() {
        cpu.set_ud0(index, u64::from(ra));
    }
}

fn sd0(cpu: &Cpu, index: RegisterIndex) -> i64 {
    cpu.ud0(index) as i64
}

/// Jump
pub(crate) fn op_j(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    // Only 26 bits of target fit in the instruction, the 4 MSBs come from the PC
    let target = (cpu.pc() & 0xf000_0000) | instruction.imm_jump();

    cpu::branch(cpu, bus, target);
}

/// Jump And Link
pub(crate) fn op_jal(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    link(cpu, reg::RA);
    op_j(cpu, bus, instruction);
}

/// Jump Register
pub(crate) fn op_jr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let target = cpu.ul0(instruction.s());

    cpu::branch(cpu, bus, target);
}

/// Jump And Link Register. The target is read before the link so `jalr $ra, $ra` works.
pub(crate) fn op_jalr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let target = cpu.ul0(instruction.s());

    link(cpu, instruction.d());
    cpu::branch(cpu, bus, target);
}

pub(crate) fn op_beq(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) == sd0(cpu, instruction.t());

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bne(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) != sd0(cpu, instruction.t());

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_blez(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) <= 0;

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgtz(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) > 0;

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bltz(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) < 0;

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgez(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) >= 0;

    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_beql(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) == sd0(cpu, instruction.t());

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bnel(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) != sd0(cpu, instruction.t());

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_blezl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) <= 0;

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgtzl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) > 0;

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bltzl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) < 0;

    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgezl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) >= 0;

    branch_likely_if(cpu, bus, instruction, taken);
}

// The "and link" forms write RA before evaluating the condition, taken or not. The comparison
// is done first so that `bltzal $ra` tests the old value.

pub(crate) fn op_bltzal(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) < 0;

    link(cpu, reg::RA);
    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgezal(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) >= 0;

    link(cpu, reg::RA);
    branch_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bltzall(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) < 0;

    link(cpu, reg::RA);
    branch_likely_if(cpu, bus, instruction, taken);
}

pub(crate) fn op_bgezall(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let taken = sd0(cpu, instruction.s()) >= 0;

    link(cpu, reg::RA);
    branch_likely_if(cpu, bus, instruction, taken);
}

/// Raise a Trap exception if `cond` holds. PC is not rolled back.
fn trap_if(cpu: &mut Cpu, bus: &mut dyn Bus, cond: bool) {
    if cond {
        cpu::exception(cpu, bus, ExceptionCode::Trap);
    }
}

pub(crate) fn op_tge(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = sd0(cpu, instruction.s()) >= sd0(cpu, instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tgeu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) >= cpu.ud0(instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tlt(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = sd0(cpu, instruction.s()) < sd0(cpu, instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tltu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) < cpu.ud0(instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_teq(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) == cpu.ud0(instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tne(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) != cpu.ud0(instruction.t());

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tgei(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = sd0(cpu, instruction.s()) >= instruction.imm_se64() as i64;

    trap_if(cpu, bus, cond);
}

/// Immediate is sign extended then compared unsigned
pub(crate) fn op_tgeiu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) >= instruction.imm_se64();

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tlti(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = sd0(cpu, instruction.s()) < instruction.imm_se64() as i64;

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tltiu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) < instruction.imm_se64();

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_teqi(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) == instruction.imm_se64();

    trap_if(cpu, bus, cond);
}

pub(crate) fn op_tnei(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let cond = cpu.ud0(instruction.s()) != instruction.imm_se64();

    trap_if(cpu, bus, cond);
}

#[cfg(test)]
mod tests {
    use crate::ee::processor::asm::{self, r_type, regimm, Harness, BASE};
    use crate::ee::processor::cop0::ExceptionCode;

    #[test]
    fn jump_and_link() {
        let mut h = Harness::new(&[asm::jal(BASE + 0x100), asm::addiu(8, 0, 1)]);

        h.step();
        assert_eq!(h.cpu.pc(), BASE + 0x100);
        assert_eq!(h.gpr(31), u64::from(BASE + 8));
        assert_eq!(h.gpr(8), 1);
    }

    #[test]
    fn jump_keeps_upper_pc_bits() {
        let mut h = Harness::new(&[]);

        h.cpu.set_pc(0x8000_1000);
        h.exec(asm::j(0x0000_2000));
        assert_eq!(h.cpu.pc(), 0x8000_2000);
    }

    #[test]
    fn jalr_reads_target_before_linking() {
        let mut h = Harness::new(&[r_type(0x09, 31, 0, 31, 0)]);

        h.set_gpr(31, u64::from(BASE + 0x40));
        h.step();
        assert_eq!(h.cpu.pc(), BASE + 0x40);
        assert_eq!(h.gpr(31), u64::from(BASE + 8));

        // JR uses the low word only
        let mut h = Harness::new(&[r_type(0x08, 9, 0, 0, 0)]);

        h.set_gpr(9, 0xdead_beef_0010_0080);
        h.step();
        assert_eq!(h.cpu.pc(), 0x0010_0080);
    }

    #[test]
    fn link_happens_when_not_taken() {
        // BLTZAL $t0 with $t0 = 1
        let mut h = Harness::new(&[regimm(0x10, 8, 0x10), asm::nop()]);

        h.set_gpr(8, 1);
        h.step();
        assert_eq!(h.cpu.pc(), BASE + 4);
        assert_eq!(h.gpr(31), u64::from(BASE + 8));
        assert_eq!(h.bus.branch_tests, 1);

        // BGEZALL not taken skips the delay slot
        let mut h = Harness::new(&[regimm(0x13, 8, 0x10), asm::addiu(9, 0, 1)]);

        h.set_gpr(8, (-1i64) as u64);
        h.step();
        assert_eq!(h.cpu.pc(), BASE + 8);
        assert_eq!(h.gpr(9), 0);
        assert_eq!(h.gpr(31), u64::from(BASE + 8));
    }

    #[test]
    fn comparisons_use_64_bits() {
        // Only the upper halves differ
        let mut h = Harness::new(&[asm::beq(8, 9, 0x10), asm::nop()]);

        h.set_gpr(8, 1 << 32);
        h.set_gpr(9, 0);
        h.step();
        assert_eq!(h.cpu.pc(), BASE + 4);

        // BGTZ on a value that is only positive as a 32 bit word
        let mut h = Harness::new(&[asm::i_type(0x07, 8, 0, 0x10), asm::nop()]);

        h.set_gpr(8, 0xffff_ffff_0000_0001);
        h.step();
        assert_eq!(h.cpu.pc(), BASE + 4);

        // BLEZ on zero
        let mut h = Harness::new(&[asm::i_type(0x06, 0, 0, 0x10), asm::nop()]);

        h.step();
        assert_eq!(h.cpu.pc(), BASE + 0x44);
    }

    #[test]
    fn traps() {
        // TEQ $t0, $t1 with equal registers
        let mut h = Harness::new(&[r_type(0x34, 8, 9, 0, 0)]);

        h.step();
        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Trap, false)));

        // TNE doesn't fire
        let mut h = Harness::new(&[r_type(0x36, 8, 9, 0, 0)]);

        h.step();
        assert_eq!(h.bus.last_exception, None);
        assert_eq!(h.cpu.pc(), BASE + 4);

        // TLTU: 1 < 0xffff... unsigned
        let mut h = Harness::new(&[r_type(0x33, 8, 9, 0, 0)]);

        h.set_gpr(8, 1);
        h.set_gpr(9, u64::MAX);
        h.step();
        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Trap, false)));

        // TGEIU $t0, -1: compared against 0xffff_ffff_ffff_ffff
        let mut h = Harness::new(&[regimm(0x09, 8, -1)]);

        h.set_gpr(8, 0xffff_ffff);
        h.step();
        assert_eq!(h.bus.last_exception, None);

        // TLTI $t0, -1 with $t0 = -2
        let mut h = Harness::new(&[regimm(0x0a, 8, -1)]);

        h.set_gpr(8, (-2i64) as u64);
        h.step();
        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Trap, false)));
    }

    #[test]
    fn trap_in_delay_slot_reports_the_flag() {
        let mut h = Harness::new(&[asm::beq(0, 0, 0x10), r_type(0x34, 0, 0, 0, 0)]);

        h.step();
        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Trap, true)));
    }
}
