//! Loads and stores. Every load performs its memory access even when the destination is R0 since
//! the access itself may have side effects on MMIO registers.

use super::write_ud0;
use crate::ee::bus::Bus;
use crate::ee::processor::cpu::{self, sext32, Cpu, Gpr};
use crate::ee::processor::instruction::Instruction;

// Merge tables for the unaligned accesses, indexed by the low address bits

const LWL_MASK: [u32; 4] = [0x00ff_ffff, 0x0000_ffff, 0x0000_00ff, 0x0000_0000];
const LWL_SHIFT: [u32; 4] = [24, 16, 8, 0];

const LWR_MASK: [u32; 4] = [0x0000_0000, 0xff00_0000, 0xffff_0000, 0xffff_ff00];
const LWR_SHIFT: [u32; 4] = [0, 8, 16, 24];

const LDL_MASK: [u64; 8] = [
    0x00ff_ffff_ffff_ffff,
    0x0000_ffff_ffff_ffff,
    0x0000_00ff_ffff_ffff,
    0x0000_0000_ffff_ffff,
    0x0000_0000_00ff_ffff,
    0x0000_0000_0000_ffff,
    0x0000_0000_0000_00ff,
    0x0000_0000_0000_0000,
];
const LDL_SHIFT: [u32; 8] = [56, 48, 40, 32, 24, 16, 8, 0];

const LDR_MASK: [u64; 8] = [
    0x0000_0000_0000_0000,
    0xff00_0000_0000_0000,
    0xffff_0000_0000_0000,
    0xffff_ff00_0000_0000,
    0xffff_ffff_0000_0000,
    0xffff_ffff_ff00_0000,
    0xffff_ffff_ffff_0000,
    0xffff_ffff_ffff_ff00,
];
const LDR_SHIFT: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];

const SWL_MASK: [u32; 4] = [0xffff_ff00, 0xffff_0000, 0xff00_0000, 0x0000_0000];
const SWL_SHIFT: [u32; 4] = [24, 16, 8, 0];

const SWR_MASK: [u32; 4] = [0x0000_0000, 0x0000_00ff, 0x0000_ffff, 0x00ff_ffff];
const SWR_SHIFT: [u32; 4] = [0, 8, 16, 24];

const SDL_MASK: [u64; 8] = [
    0xffff_ffff_ffff_ff00,
    0xffff_ffff_ffff_0000,
    0xffff_ffff_ff00_0000,
    0xffff_ffff_0000_0000,
    0xffff_ff00_0000_0000,
    0xffff_0000_0000_0000,
    0xff00_0000_0000_0000,
    0x0000_0000_0000_0000,
];
const SDL_SHIFT: [u32; 8] = [56, 48, 40, 32, 24, 16, 8, 0];

const SDR_MASK: [u64; 8] = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_00ff,
    0x0000_0000_0000_ffff,
    0x0000_0000_00ff_ffff,
    0x0000_0000_ffff_ffff,
    0x0000_00ff_ffff_ffff,
    0x0000_ffff_ffff_ffff,
    0x00ff_ffff_ffff_ffff,
];
const SDR_SHIFT: [u32; 8] = [0, 8, 16, 24, 32, 40, 48, 56];

/// Effective address: rs plus the sign-extended offset
fn address(cpu: &Cpu, instruction: Instruction) -> u32 {
    cpu.ul0(instruction.s()).wrapping_add(instruction.imm_se())
}

/// Load Byte
pub(crate) fn op_lb(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u8>(bus, addr);

    write_ud0(cpu, instruction.t(), v as i8 as u64);
}

/// Load Byte Unsigned
pub(crate) fn op_lbu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u8>(bus, addr);

    write_ud0(cpu, instruction.t(), u64::from(v));
}

/// Load Halfword
pub(crate) fn op_lh(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u16>(bus, addr);

    write_ud0(cpu, instruction.t(), v as i16 as u64);
}

pub(crate) fn op_lhu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u16>(bus, addr);

    write_ud0(cpu, instruction.t(), u64::from(v));
}

/// Load Word
pub(crate) fn op_lw(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u32>(bus, addr);

    write_ud0(cpu, instruction.t(), sext32(v));
}

/// Load Word Unsigned
pub(crate) fn op_lwu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u32>(bus, addr);

    write_ud0(cpu, instruction.t(), u64::from(v));
}

pub(crate) fn op_ld(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu::load::<u64>(bus, addr);

    write_ud0(cpu, instruction.t(), v);
}

/// Load Quadword. The address is forced to 16 byte alignment.
pub(crate) fn op_lq(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction) & !0xf;
    let v = cpu::load::<u128>(bus, addr);

    cpu.set_reg(instruction.t(), Gpr::from_u128(v));
}

/// Load Word Left: merge the most significant bytes of the register with the aligned word
pub(crate) fn op_lwl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 3) as usize;
    let mem = cpu::load::<u32>(bus, addr & !3);

    let t = instruction.t();

    if t.is_zero() {
        return;
    }

    let v = (cpu.ul0(t) & LWL_MASK[shift]) | (mem << LWL_SHIFT[shift]);

    cpu.set_ud0(t, sext32(v));
}

/// Load Word Right. Only a full word load (aligned address) sign-extends, partial merges leave
/// the upper half of the doubleword untouched.
pub(crate) fn op_lwr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 3) as usize;
    let mem = cpu::load::<u32>(bus, addr & !3);

    let t = instruction.t();

    if t.is_zero() {
        return;
    }

    let v = (cpu.ul0(t) & LWR_MASK[shift]) | (mem >> LWR_SHIFT[shift]);

    if shift == 0 {
        cpu.set_ud0(t, sext32(v));
    } else {
        cpu.reg_mut(t).set_ul(0, v);
    }
}

pub(crate) fn op_ldl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 7) as usize;
    let mem = cpu::load::<u64>(bus, addr & !7);

    let t = instruction.t();
    let v = (cpu.ud0(t) & LDL_MASK[shift]) | (mem << LDL_SHIFT[shift]);

    write_ud0(cpu, t, v);
}

pub(crate) fn op_ldr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 7) as usize;
    let mem = cpu::load::<u64>(bus, addr & !7);

    let t = instruction.t();
    let v = (cpu.ud0(t) & LDR_MASK[shift]) | (mem >> LDR_SHIFT[shift]);

    write_ud0(cpu, t, v);
}

/// Store Byte
pub(crate) fn op_sb(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu.reg(instruction.t()).uc(0);

    cpu::store(bus, addr, v);
}

/// Store Halfword
pub(crate) fn op_sh(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu.reg(instruction.t()).us(0);

    cpu::store(bus, addr, v);
}

/// Store Word
pub(crate) fn op_sw(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu.ul0(instruction.t());

    cpu::store(bus, addr, v);
}

pub(crate) fn op_sd(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let v = cpu.ud0(instruction.t());

    cpu::store(bus, addr, v);
}

/// Store Quadword, force-aligned like LQ
pub(crate) fn op_sq(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction) & !0xf;
    let v = cpu.reg(instruction.t()).as_u128();

    cpu::store(bus, addr, v);
}

/// Store Word Left: the most significant bytes of rt replace the low end of the aligned word
pub(crate) fn op_swl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 3) as usize;
    let aligned = addr & !3;

    let mem = cpu::load::<u32>(bus, aligned);
    let v = (cpu.ul0(instruction.t()) >> SWL_SHIFT[shift]) | (mem & SWL_MASK[shift]);

    cpu::store(bus, aligned, v);
}

pub(crate) fn op_swr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 3) as usize;
    let aligned = addr & !3;

    let mem = cpu::load::<u32>(bus, aligned);
    let v = (cpu.ul0(instruction.t()) << SWR_SHIFT[shift]) | (mem & SWR_MASK[shift]);

    cpu::store(bus, aligned, v);
}

pub(crate) fn op_sdl(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 7) as usize;
    let aligned = addr & !7;

    let mem = cpu::load::<u64>(bus, aligned);
    let v = (cpu.ud0(instruction.t()) >> SDL_SHIFT[shift]) | (mem & SDL_MASK[shift]);

    cpu::store(bus, aligned, v);
}

pub(crate) fn op_sdr(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    let addr = address(cpu, instruction);
    let shift = (addr & 7) as usize;
    let aligned = addr & !7;

    let mem = cpu::load::<u64>(bus, aligned);
    let v = (cpu.ud0(instruction.t()) << SDR_SHIFT[shift]) | (mem & SDR_MASK[shift]);

    cpu::store(bus, aligned, v);
}

#[cfg(test)]
mod tests {
    use crate::ee::bus::Bus;
    use crate::ee::memory::Memory;
    use crate::ee::processor::asm::{i_type, Harness};
    use crate::ee::processor::cpu::{Cpu, Gpr};
    use crate::ee::processor::instruction::Instruction;
    use crate::ee::processor::opcodes;
    use crate::ee::processor::RegisterIndex;

    const DATA: u32 = 0x0000_2000;

    fn machine() -> Harness {
        let mut h = Harness::new(&[]);

        h.bus.write32(DATA, 0x4433_2211);
        h.bus.write32(DATA + 4, 0x8877_6655);
        h.bus.write32(DATA + 8, 0xccbb_aa99);
        h.set_gpr(8, u64::from(DATA));
        h
    }

    #[test]
    fn sign_and_zero_extension() {
        let mut h = machine();

        // LB / LBU of 0x88
        h.exec(i_type(0x20, 8, 9, 7));
        h.exec(i_type(0x24, 8, 10, 7));
        assert_eq!(h.gpr(9), 0xffff_ffff_ffff_ff88);
        assert_eq!(h.gpr(10), 0x88);

        // LH / LHU of 0x8877
        h.exec(i_type(0x21, 8, 9, 6));
        h.exec(i_type(0x25, 8, 10, 6));
        assert_eq!(h.gpr(9), 0xffff_ffff_ffff_8877);
        assert_eq!(h.gpr(10), 0x8877);

        // LW / LWU
        h.exec(i_type(0x23, 8, 9, 4));
        h.exec(i_type(0x27, 8, 10, 4));
        assert_eq!(h.gpr(9), 0xffff_ffff_8877_6655);
        assert_eq!(h.gpr(10), 0x8877_6655);

        // LD
        h.exec(i_type(0x37, 8, 9, 0));
        assert_eq!(h.gpr(9), 0x8877_6655_4433_2211);

        // Negative offsets
        h.set_gpr(11, u64::from(DATA + 8));
        h.exec(i_type(0x23, 11, 12, -8));
        assert_eq!(h.gpr(12), 0x4433_2211);
    }

    #[test]
    fn load_to_r0_is_discarded() {
        let mut h = machine();

        for op in [0x20, 0x21, 0x22, 0x23, 0x26, 0x37, 0x1a, 0x1b, 0x1e] {
            h.exec(i_type(op, 8, 0, 4));
            assert_eq!(h.cpu.reg(RegisterIndex(0)).as_u128(), 0);
        }
    }

    /// Memory-mapped device counting every read, whatever its width
    #[derive(Default)]
    struct ReadCounter {
        reads: u32,
    }

    impl Memory for ReadCounter {
        fn read32(&mut self, _: u32) -> u32 {
            self.reads += 1;
            0xffff_ffff
        }

        fn write32(&mut self, _: u32, _: u32) {}

        fn read8(&mut self, _: u32) -> u8 {
            self.reads += 1;
            0xff
        }

        fn read16(&mut self, _: u32) -> u16 {
            self.reads += 1;
            0xffff
        }

        fn read64(&mut self, _: u32) -> u64 {
            self.reads += 1;
            !0
        }

        fn read128(&mut self, _: u32) -> u128 {
            self.reads += 1;
            !0
        }
    }

    impl Bus for ReadCounter {
        fn branch_test(&mut self, _: &mut Cpu) {}
    }

    #[test]
    fn load_to_r0_still_reads_memory() {
        // LB LH LWL LW LBU LHU LWR LWU LD LDL LDR LQ
        let loads = [
            0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x37, 0x1a, 0x1b, 0x1e,
        ];

        for op in loads {
            let mut cpu = Cpu::new();
            let mut bus = ReadCounter::default();
            let instruction = Instruction::new(i_type(op, 0, 0, 0x10));

            (opcodes::decode(instruction).handler)(&mut cpu, &mut bus, instruction);

            assert_eq!(bus.reads, 1, "opcode 0x{:02x}", op);
            assert_eq!(cpu.reg(RegisterIndex(0)), Gpr::ZERO);
        }
    }

    #[test]
    fn word_left_right_pair_reconstructs_the_word() {
        for k in 0..4u32 {
            let mut h = machine();

            h.set_gpr(9, 0xdead_beef_dead_beef);
            // LWL $t1, k+3($t0) ; LWR $t1, k($t0)
            h.exec(i_type(0x22, 8, 9, (k + 3) as i32));
            h.exec(i_type(0x26, 8, 9, k as i32));

            let mut expected = 0u32;
            for b in 0..4 {
                expected |= u32::from(h.bus.read8(DATA + k + b)) << (b * 8);
            }

            assert_eq!(h.cpu.reg(RegisterIndex(9)).ul(0), expected);

            if k == 0 {
                assert_eq!(h.gpr(9), 0x4433_2211);
            }
        }
    }

    #[test]
    fn lwr_partial_merge_keeps_upper_bits() {
        let mut h = machine();

        h.set_gpr(9, 0x1234_5678_aabb_ccdd);
        h.exec(i_type(0x26, 8, 9, 1));
        assert_eq!(h.gpr(9), 0x1234_5678_aa44_3322);

        // LWL sign extends its merge
        h.set_gpr(9, 0);
        h.exec(i_type(0x22, 8, 9, 0));
        assert_eq!(h.gpr(9), 0x1100_0000);
        h.exec(i_type(0x22, 8, 9, 4 + 3));
        assert_eq!(h.gpr(9), 0xffff_ffff_8877_6655);
    }

    #[test]
    fn doubleword_left_right_pair() {
        let mut h = machine();

        // LDL $t1, 10($t0) ; LDR $t1, 3($t0): doubleword at DATA + 3
        h.exec(i_type(0x1a, 8, 9, 10));
        h.exec(i_type(0x1b, 8, 9, 3));
        assert_eq!(h.gpr(9), 0xbbaa_9988_7766_5544);
    }

    #[test]
    fn unaligned_stores() {
        let mut h = machine();

        h.set_gpr(9, 0xa1b2_c3d4);

        // SWL/SWR pair writes the word at DATA + 1
        h.exec(i_type(0x2a, 8, 9, 4));
        h.exec(i_type(0x2e, 8, 9, 1));
        assert_eq!(h.bus.read32(DATA), 0xb2c3_d411);
        assert_eq!(h.bus.read32(DATA + 4), 0x8877_66a1);

        let mut h = machine();

        h.set_gpr(9, 0x0102_0304_0506_0708);

        // SDL/SDR pair writes the doubleword at DATA + 2
        h.exec(i_type(0x2c, 8, 9, 9));
        h.exec(i_type(0x2d, 8, 9, 2));
        assert_eq!(h.bus.read64(DATA), 0x0304_0506_0708_2211);
        assert_eq!(h.bus.read32(DATA + 8), 0xccbb_0102);
    }

    #[test]
    fn aligned_stores() {
        let mut h = machine();

        h.set_gpr(9, 0xffff_ffff_ffff_ffab);
        h.exec(i_type(0x28, 8, 9, 1));
        assert_eq!(h.bus.read32(DATA), 0x4433_ab11);

        h.exec(i_type(0x29, 8, 9, 2));
        assert_eq!(h.bus.read32(DATA), 0xffab_ab11);

        h.exec(i_type(0x3f, 8, 9, 8));
        assert_eq!(h.bus.read64(DATA + 8), 0xffff_ffff_ffff_ffab);
    }

    #[test]
    fn quadword_accesses_are_force_aligned() {
        let mut h = machine();
        let v = 0x0011_2233_4455_6677_8899_aabb_ccdd_eeffu128;

        h.cpu.set_reg(RegisterIndex(9), Gpr::from_u128(v));

        // SQ $t1, 0x1f($t0) lands on DATA + 0x10
        h.exec(i_type(0x1f, 8, 9, 0x1f));
        assert_eq!(h.bus.read128(DATA + 0x10), v);

        // LQ $t2, 0x1c($t0)
        h.exec(i_type(0x1e, 8, 10, 0x1c));
        assert_eq!(h.cpu.reg(RegisterIndex(10)).as_u128(), v);
    }
}
