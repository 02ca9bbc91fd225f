//! Exceptions raised on purpose, no-ops and the unknown opcode policy

use crate::ee::bus::Bus;
use crate::ee::processor::bios;
use crate::ee::processor::cop0::ExceptionCode;
use crate::ee::processor::cpu::{self, Cpu};
use crate::ee::processor::instruction::Instruction;

/// Reserved or unimplemented encodings do nothing. Real hardware would raise a Reserved
/// Instruction exception.
pub(crate) fn op_unknown(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    debug!(
        "Unknown instruction {} at PC 0x{:08x}",
        instruction,
        cpu.pc().wrapping_sub(4)
    );
}

/// SYNC, PREF and CACHE
pub(crate) fn op_nop(_: &mut Cpu, _: &mut dyn Bus, _: Instruction) {}

/// System Call. PC is moved back to the SYSCALL itself so that EPC points at it.
pub(crate) fn op_syscall(cpu: &mut Cpu, bus: &mut dyn Bus, _: Instruction) {
    bios::syscall(cpu, bus);

    let pc = cpu.pc().wrapping_sub(4);

    cpu.set_pc(pc);
    cpu::exception(cpu, bus, ExceptionCode::Syscall);
}

/// Breakpoint
pub(crate) fn op_break(cpu: &mut Cpu, bus: &mut dyn Bus, _: Instruction) {
    let pc = cpu.pc().wrapping_sub(4);

    cpu.set_pc(pc);
    cpu::exception(cpu, bus, ExceptionCode::Break);
}

#[cfg(test)]
mod tests {
    use crate::ee::processor::asm::{self, r_type, Harness, BASE};
    use crate::ee::processor::cop0::{self, ExceptionCode};

    #[test]
    fn syscall_reports_its_own_address() {
        let mut h = Harness::new(&[asm::nop(), asm::syscall()]);

        h.cpu.cop0_mut().set_reg(cop0::STATUS, 0);
        h.set_gpr(3, 0x3c);
        h.step();
        h.step();

        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Syscall, false)));
        assert_eq!(h.cpu.cop0().epc(), BASE + 4);
        assert_eq!(h.cpu.pc(), 0x8000_0180);
        assert_eq!(h.cpu.cop0().exception_code(), Some(ExceptionCode::Syscall));
    }

    #[test]
    fn break_in_delay_slot() {
        let mut h = Harness::new(&[asm::beq(0, 0, 0x10), r_type(0x0d, 0, 0, 0, 0)]);

        h.cpu.cop0_mut().set_reg(cop0::STATUS, 0);
        h.step();

        assert_eq!(h.bus.last_exception, Some((ExceptionCode::Break, true)));
        // EPC points at the branch
        assert_eq!(h.cpu.cop0().epc(), BASE);
        assert_eq!(h.cpu.pc(), 0x8000_0180);
    }

    #[test]
    fn unknown_and_nops_have_no_effect() {
        for word in [0x13 << 26, 0x01, 0x4200_0002, r_type(0x0f, 0, 0, 0, 0), 0xbc00_0000, 0xcc00_0000] {
            let mut h = Harness::new(&[word]);

            h.set_gpr(8, 0x1234);
            h.step();

            assert_eq!(h.cpu.pc(), BASE + 4);
            assert_eq!(h.gpr(8), 0x1234);
            assert_eq!(h.bus.last_exception, None);
            assert_eq!(h.bus.branch_tests, 0);
        }
    }
}
