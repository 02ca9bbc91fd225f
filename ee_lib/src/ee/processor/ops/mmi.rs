//! Multimedia instructions: the second multiply/divide pipeline and the 128bit integer lane ops

use super::alu::{div_signed, div_unsigned, mult_signed, mult_unsigned, set_product};
use super::write_ud0;
use crate::ee::bus::Bus;
use crate::ee::processor::cpu::{Cpu, Gpr};
use crate::ee::processor::instruction::Instruction;

/// Multiply-accumulate into pipeline `pipe`. The accumulator is rebuilt from the low words of
/// HI and LO.
fn madd(cpu: &mut Cpu, instruction: Instruction, pipe: usize, product: u64) {
    let lo = u64::from(cpu.lo.ul(pipe * 2));
    let hi = u64::from(cpu.hi.ul(pipe * 2));

    let acc = (lo | (hi << 32)).wrapping_add(product);

    set_product(cpu, instruction, pipe, acc);
}

pub(crate) fn op_madd(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_signed(cpu, instruction);

    madd(cpu, instruction, 0, p);
}

pub(crate) fn op_maddu(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_unsigned(cpu, instruction);

    madd(cpu, instruction, 0, p);
}

pub(crate) fn op_madd1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_signed(cpu, instruction);

    madd(cpu, instruction, 1, p);
}

pub(crate) fn op_maddu1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_unsigned(cpu, instruction);

    madd(cpu, instruction, 1, p);
}

pub(crate) fn op_mult1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_signed(cpu, instruction);

    set_product(cpu, instruction, 1, p);
}

pub(crate) fn op_multu1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let p = mult_unsigned(cpu, instruction);

    set_product(cpu, instruction, 1, p);
}

pub(crate) fn op_div1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    div_signed(cpu, instruction, 1);
}

pub(crate) fn op_divu1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    div_unsigned(cpu, instruction, 1);
}

pub(crate) fn op_mfhi1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.hi.ud(1);

    write_ud0(cpu, instruction.d(), v);
}

pub(crate) fn op_mflo1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.lo.ud(1);

    write_ud0(cpu, instruction.d(), v);
}

pub(crate) fn op_mthi1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.ud0(instruction.s());

    cpu.hi.set_ud(1, v);
}

pub(crate) fn op_mtlo1(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.ud0(instruction.s());

    cpu.lo.set_ud(1, v);
}

/// Parallel Leading Zero or one Count Word: number of leading bits equal to the sign bit, minus
/// one, for both words of the lower doubleword
pub(crate) fn op_plzcw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();

    if d.is_zero() {
        return;
    }

    let s = cpu.reg(instruction.s());

    for i in 0..2 {
        let v = s.ul(i);
        let v = if (v as i32) < 0 { !v } else { v };

        cpu.reg_mut(d).set_ul(i, v.leading_zeros() - 1);
    }
}

/// Apply `f` to every word lane of rs and rt
fn words(cpu: &mut Cpu, instruction: Instruction, f: fn(u32, u32) -> u32) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());
    let mut d = Gpr::ZERO;

    for i in 0..4 {
        d.set_ul(i, f(s.ul(i), t.ul(i)));
    }

    cpu.set_reg(instruction.d(), d);
}

fn halfwords(cpu: &mut Cpu, instruction: Instruction, f: fn(u16, u16) -> u16) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());
    let mut d = Gpr::ZERO;

    for i in 0..8 {
        d.set_us(i, f(s.us(i), t.us(i)));
    }

    cpu.set_reg(instruction.d(), d);
}

fn bytes(cpu: &mut Cpu, instruction: Instruction, f: fn(u8, u8) -> u8) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());
    let mut d = Gpr::ZERO;

    for i in 0..16 {
        d.set_uc(i, f(s.uc(i), t.uc(i)));
    }

    cpu.set_reg(instruction.d(), d);
}

/// Whole-register operation
fn quad(cpu: &mut Cpu, instruction: Instruction, f: fn(u128, u128) -> u128) {
    let s = cpu.reg(instruction.s()).as_u128();
    let t = cpu.reg(instruction.t()).as_u128();

    cpu.set_reg(instruction.d(), Gpr::from_u128(f(s, t)));
}

/// All ones when `b` is true. Used by the compare lane ops.
fn mask<T: From<bool> + std::ops::Neg<Output = T>>(b: bool) -> T {
    -T::from(b)
}

pub(crate) fn op_paddw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, u32::wrapping_add);
}

pub(crate) fn op_psubw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, u32::wrapping_sub);
}

pub(crate) fn op_pcgtw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, |a, b| mask::<i32>(a as i32 > b as i32) as u32);
}

pub(crate) fn op_pmaxw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, |a, b| (a as i32).max(b as i32) as u32);
}

pub(crate) fn op_paddh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, u16::wrapping_add);
}

pub(crate) fn op_psubh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, u16::wrapping_sub);
}

pub(crate) fn op_pcgth(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, |a, b| mask::<i16>(a as i16 > b as i16) as u16);
}

pub(crate) fn op_pmaxh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, |a, b| (a as i16).max(b as i16) as u16);
}

pub(crate) fn op_paddb(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    bytes(cpu, instruction, u8::wrapping_add);
}

pub(crate) fn op_psubb(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    bytes(cpu, instruction, u8::wrapping_sub);
}

pub(crate) fn op_pcgtb(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    bytes(cpu, instruction, |a, b| mask::<i8>(a as i8 > b as i8) as u8);
}

pub(crate) fn op_pceqw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, |a, b| mask::<i32>(a == b) as u32);
}

pub(crate) fn op_pminw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, |a, b| (a as i32).min(b as i32) as u32);
}

pub(crate) fn op_pceqh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, |a, b| mask::<i16>(a == b) as u16);
}

pub(crate) fn op_pminh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    halfwords(cpu, instruction, |a, b| (a as i16).min(b as i16) as u16);
}

pub(crate) fn op_pceqb(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    bytes(cpu, instruction, |a, b| mask::<i8>(a == b) as u8);
}

/// Parallel Add with Unsigned saturation Word
pub(crate) fn op_padduw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, u32::saturating_add);
}

pub(crate) fn op_psubuw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    words(cpu, instruction, u32::saturating_sub);
}

/// Parallel Extend Lower from Word: interleave the two lower words of rt and rs
pub(crate) fn op_pextlw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    interleave_words(cpu, instruction, 0);
}

/// Parallel Extend Upper from Word
pub(crate) fn op_pextuw(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    interleave_words(cpu, instruction, 2);
}

fn interleave_words(cpu: &mut Cpu, instruction: Instruction, first: usize) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());
    let mut d = Gpr::ZERO;

    d.set_ul(0, t.ul(first));
    d.set_ul(1, s.ul(first));
    d.set_ul(2, t.ul(first + 1));
    d.set_ul(3, s.ul(first + 1));

    cpu.set_reg(instruction.d(), d);
}

pub(crate) fn op_pmfhi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let hi = cpu.hi;

    cpu.set_reg(instruction.d(), hi);
}

pub(crate) fn op_pmflo(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let lo = cpu.lo;

    cpu.set_reg(instruction.d(), lo);
}

pub(crate) fn op_pmthi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    cpu.hi = cpu.reg(instruction.s());
}

pub(crate) fn op_pmtlo(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    cpu.lo = cpu.reg(instruction.s());
}

/// Parallel Copy Lower Doubleword
pub(crate) fn op_pcpyld(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());

    cpu.set_reg(instruction.d(), Gpr::new(t.ud(0), s.ud(0)));
}

/// Parallel Copy Upper Doubleword
pub(crate) fn op_pcpyud(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let s = cpu.reg(instruction.s());
    let t = cpu.reg(instruction.t());

    cpu.set_reg(instruction.d(), Gpr::new(s.ud(1), t.ud(1)));
}

/// Parallel Copy Halfword: broadcast the lowest halfword of each doubleword of rt
pub(crate) fn op_pcpyh(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = cpu.reg(instruction.t());
    let mut d = Gpr::ZERO;

    for i in 0..4 {
        d.set_us(i, t.us(0));
        d.set_us(i + 4, t.us(4));
    }

    cpu.set_reg(instruction.d(), d);
}

pub(crate) fn op_pand(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    quad(cpu, instruction, |a, b| a & b);
}

pub(crate) fn op_por(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    quad(cpu, instruction, |a, b| a | b);
}

pub(crate) fn op_pxor(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    quad(cpu, instruction, |a, b| a ^ b);
}

pub(crate) fn op_pnor(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    quad(cpu, instruction, |a, b| !(a | b));
}

#[cfg(test)]
mod tests {
    use crate::ee::processor::asm::{mmi, Harness};
    use crate::ee::processor::cpu::Gpr;
    use crate::ee::processor::RegisterIndex;

    fn set(h: &mut Harness, r: u8, words: [u32; 4]) {
        let mut g = Gpr::ZERO;

        for (i, &w) in words.iter().enumerate() {
            g.set_ul(i, w);
        }

        h.cpu.set_reg(RegisterIndex(r), g);
    }

    fn words(h: &Harness, r: u8) -> [u32; 4] {
        let g = h.cpu.reg(RegisterIndex(r));

        [g.ul(0), g.ul(1), g.ul(2), g.ul(3)]
    }

    /// Run `funct`/`sub` with $t0 = a and $t1 = b, result in $t2
    fn lane_op(funct: u32, sub: u32, a: [u32; 4], b: [u32; 4]) -> [u32; 4] {
        let mut h = Harness::new(&[]);

        set(&mut h, 8, a);
        set(&mut h, 9, b);
        h.exec(mmi(funct, sub, 8, 9, 10));

        words(&h, 10)
    }

    #[test]
    fn multiply_accumulate() {
        let mut h = Harness::new(&[]);

        // MULT1 then MADD1 on the second pipeline
        h.set_gpr(8, 3);
        h.set_gpr(9, (-4i64) as u64);
        h.exec(mmi(0x18, 0, 8, 9, 0));
        assert_eq!(h.cpu.lo().ud(1), (-12i64) as u64);
        assert_eq!(h.cpu.hi().ud(1), u64::MAX);
        assert_eq!(h.cpu.lo().ud(0), 0);

        h.exec(mmi(0x20, 0, 8, 8, 11));
        assert_eq!(h.cpu.lo().ud(1), (-3i64) as u64);
        assert_eq!(h.cpu.hi().ud(1), u64::MAX);
        assert_eq!(h.gpr(11), (-3i64) as u64);

        // MADDU carrying into HI
        h.cpu.lo.set_ud(0, 0xffff_ffff);
        h.cpu.hi.set_ud(0, 0);
        h.set_gpr(8, 1);
        h.exec(mmi(0x01, 0, 8, 8, 0));
        assert_eq!(h.cpu.lo().ud(0), 0);
        assert_eq!(h.cpu.hi().ud(0), 1);
    }

    #[test]
    fn second_pipeline_moves_and_divide() {
        let mut h = Harness::new(&[]);

        h.set_gpr(8, 0x1234);
        h.exec(mmi(0x11, 0, 8, 0, 0));
        h.exec(mmi(0x13, 0, 8, 0, 0));
        h.exec(mmi(0x10, 0, 0, 0, 9));
        h.exec(mmi(0x12, 0, 0, 0, 10));
        assert_eq!(h.gpr(9), 0x1234);
        assert_eq!(h.gpr(10), 0x1234);
        assert_eq!(h.cpu.hi().ud(0), 0);

        h.set_gpr(8, 17);
        h.set_gpr(9, 5);
        h.exec(mmi(0x1b, 0, 8, 9, 0));
        assert_eq!(h.cpu.lo().ud(1), 3);
        assert_eq!(h.cpu.hi().ud(1), 2);
    }

    #[test]
    fn leading_sign_bits() {
        let mut h = Harness::new(&[]);

        set(&mut h, 8, [0x0000_0001, 0xffff_fff0, 0xdead, 0xbeef]);
        h.exec(mmi(0x04, 0, 8, 0, 10));

        assert_eq!(words(&h, 10), [30, 27, 0, 0]);

        set(&mut h, 8, [0, 0xffff_ffff, 0, 0]);
        h.exec(mmi(0x04, 0, 8, 0, 10));
        assert_eq!(&words(&h, 10)[..2], &[31, 31]);
    }

    #[test]
    fn word_lanes() {
        let a = [1, 0xffff_ffff, 0x8000_0000, 7];
        let b = [2, 1, 1, 7];

        assert_eq!(lane_op(0x08, 0x00, a, b), [3, 0, 0x8000_0001, 14]);
        assert_eq!(lane_op(0x08, 0x01, a, b), [0xffff_ffff, 0xffff_fffe, 0x7fff_ffff, 0]);
        assert_eq!(lane_op(0x08, 0x02, a, b), [0, 0, 0, 0]);
        assert_eq!(lane_op(0x08, 0x03, a, b), [2, 1, 1, 7]);
        assert_eq!(lane_op(0x28, 0x02, a, b), [0, 0, 0, 0xffff_ffff]);
        assert_eq!(lane_op(0x28, 0x03, a, b), [1, 0xffff_ffff, 0x8000_0000, 7]);
        assert_eq!(lane_op(0x28, 0x10, a, b), [3, 0xffff_ffff, 0x8000_0001, 14]);
        assert_eq!(lane_op(0x28, 0x11, a, b), [0, 0xffff_fffe, 0x7fff_ffff, 0]);
    }

    #[test]
    fn halfword_and_byte_lanes() {
        let a = [0x7fff_0001, 0x8000_ffff, 0, 0];
        let b = [0x0001_0001, 0x0001_0001, 0, 0];

        assert_eq!(lane_op(0x08, 0x04, a, b), [0x8000_0002, 0x8001_0000, 0, 0]);
        assert_eq!(lane_op(0x08, 0x06, a, b), [0xffff_0000, 0, 0, 0]);
        assert_eq!(lane_op(0x28, 0x06, a, b), [0x0000_ffff, 0, 0xffff_ffff, 0xffff_ffff]);
        assert_eq!(lane_op(0x28, 0x07, a, b), [0x0001_0001, 0x8000_ffff, 0, 0]);

        let a = [0x7f01_80ff, 0, 0, 0];
        let b = [0x0101_0101, 0, 0, 0];

        assert_eq!(lane_op(0x08, 0x08, a, b), [0x8002_8100, 0, 0, 0]);
        assert_eq!(lane_op(0x08, 0x09, a, b), [0x7e00_7ffe, 0, 0, 0]);
        assert_eq!(lane_op(0x08, 0x0a, a, b), [0xff00_0000, 0, 0, 0]);
        assert_eq!(
            lane_op(0x28, 0x0a, a, b),
            [0x00ff_0000, 0xffff_ffff, 0xffff_ffff, 0xffff_ffff]
        );
    }

    #[test]
    fn shuffles() {
        let s = [0x10, 0x11, 0x12, 0x13];
        let t = [0x20, 0x21, 0x22, 0x23];

        assert_eq!(lane_op(0x08, 0x12, s, t), [0x20, 0x10, 0x21, 0x11]);
        assert_eq!(lane_op(0x28, 0x12, s, t), [0x22, 0x12, 0x23, 0x13]);
        assert_eq!(lane_op(0x09, 0x0e, s, t), [0x20, 0x21, 0x10, 0x11]);
        assert_eq!(lane_op(0x29, 0x0e, s, t), [0x12, 0x13, 0x22, 0x23]);

        let t = [0x2222_1111, 0x4444_3333, 0x6666_5555, 0x8888_7777];
        assert_eq!(
            lane_op(0x29, 0x1b, s, t),
            [0x1111_1111, 0x1111_1111, 0x5555_5555, 0x5555_5555]
        );
    }

    #[test]
    fn logic_and_hi_lo_quads() {
        let a = [0xff00_ff00, 0, 0xffff_ffff, 0x1234_5678];
        let b = [0x0ff0_0ff0, 0, 0, 0x1234_5678];

        assert_eq!(lane_op(0x09, 0x12, a, b), [0x0f00_0f00, 0, 0, 0x1234_5678]);
        assert_eq!(lane_op(0x29, 0x12, a, b), [0xfff0_fff0, 0, 0xffff_ffff, 0x1234_5678]);
        assert_eq!(lane_op(0x09, 0x13, a, b), [0xf0f0_f0f0, 0, 0xffff_ffff, 0]);
        assert_eq!(lane_op(0x29, 0x13, a, b), [0x000f_000f, 0xffff_ffff, 0, 0xedcb_a987]);

        let mut h = Harness::new(&[]);

        set(&mut h, 8, [1, 2, 3, 4]);
        set(&mut h, 9, [5, 6, 7, 8]);
        // PMTHI $t0, PMTLO $t1, PMFHI $t2, PMFLO $t3
        h.exec(mmi(0x29, 0x08, 8, 0, 0));
        h.exec(mmi(0x29, 0x09, 9, 0, 0));
        h.exec(mmi(0x09, 0x08, 0, 0, 10));
        h.exec(mmi(0x09, 0x09, 0, 0, 11));
        assert_eq!(words(&h, 10), [1, 2, 3, 4]);
        assert_eq!(words(&h, 11), [5, 6, 7, 8]);
    }
}
