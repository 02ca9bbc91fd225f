//! Integer arithmetic, logic, shifts and the HI/LO/SA moves

use super::write_ud0;
use crate::ee::bus::Bus;
use crate::ee::processor::cpu::{sext32, Cpu};
use crate::ee::processor::instruction::Instruction;

/// Add Word. Overflow is not trapped.
pub(crate) fn op_add(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.s()).wrapping_add(cpu.ul0(instruction.t()));

    write_ud0(cpu, d, sext32(v));
}

/// Add Word Unsigned
pub(crate) fn op_addu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    // Without the overflow trap ADD and ADDU are the same operation
    op_add(cpu, bus, instruction)
}

pub(crate) fn op_sub(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.s()).wrapping_sub(cpu.ul0(instruction.t()));

    write_ud0(cpu, d, sext32(v));
}

pub(crate) fn op_subu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    op_sub(cpu, bus, instruction)
}

/// Add Immediate Word
pub(crate) fn op_addi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ul0(instruction.s()).wrapping_add(instruction.imm_se());

    write_ud0(cpu, t, sext32(v));
}

pub(crate) fn op_addiu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    op_addi(cpu, bus, instruction)
}

/// Doubleword Add
pub(crate) fn op_dadd(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()).wrapping_add(cpu.ud0(instruction.t()));

    write_ud0(cpu, d, v);
}

pub(crate) fn op_daddu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    op_dadd(cpu, bus, instruction)
}

pub(crate) fn op_dsub(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()).wrapping_sub(cpu.ud0(instruction.t()));

    write_ud0(cpu, d, v);
}

pub(crate) fn op_dsubu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    op_dsub(cpu, bus, instruction)
}

pub(crate) fn op_daddi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ud0(instruction.s()).wrapping_add(instruction.imm_se64());

    write_ud0(cpu, t, v);
}

pub(crate) fn op_daddiu(cpu: &mut Cpu, bus: &mut dyn Bus, instruction: Instruction) {
    op_daddi(cpu, bus, instruction)
}

/// Set on Less Than (signed)
pub(crate) fn op_slt(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let s = cpu.ud0(instruction.s()) as i64;
    let t = cpu.ud0(instruction.t()) as i64;

    write_ud0(cpu, d, (s < t) as u64);
}

/// Set on Less Than Unsigned
pub(crate) fn op_sltu(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()) < cpu.ud0(instruction.t());

    write_ud0(cpu, d, v as u64);
}

pub(crate) fn op_slti(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = (cpu.ud0(instruction.s()) as i64) < (instruction.imm_se64() as i64);

    write_ud0(cpu, t, v as u64);
}

/// Set on Less Than Immediate Unsigned. The immediate is sign extended, then compared unsigned.
pub(crate) fn op_sltiu(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ud0(instruction.s()) < instruction.imm_se64();

    write_ud0(cpu, t, v as u64);
}

pub(crate) fn op_and(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()) & cpu.ud0(instruction.t());

    write_ud0(cpu, d, v);
}

pub(crate) fn op_or(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()) | cpu.ud0(instruction.t());

    write_ud0(cpu, d, v);
}

pub(crate) fn op_xor(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ud0(instruction.s()) ^ cpu.ud0(instruction.t());

    write_ud0(cpu, d, v);
}

pub(crate) fn op_nor(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = !(cpu.ud0(instruction.s()) | cpu.ud0(instruction.t()));

    write_ud0(cpu, d, v);
}

/// Bitwise And Immediate. The immediate is zero-extended.
pub(crate) fn op_andi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ud0(instruction.s()) & u64::from(instruction.imm());

    write_ud0(cpu, t, v);
}

pub(crate) fn op_ori(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ud0(instruction.s()) | u64::from(instruction.imm());

    write_ud0(cpu, t, v);
}

pub(crate) fn op_xori(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();
    let v = cpu.ud0(instruction.s()) ^ u64::from(instruction.imm());

    write_ud0(cpu, t, v);
}

/// Load Upper Immediate
pub(crate) fn op_lui(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let t = instruction.t();

    write_ud0(cpu, t, sext32(instruction.imm() << 16));
}

pub(crate) fn op_sll(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.t()) << instruction.shift();

    write_ud0(cpu, d, sext32(v));
}

pub(crate) fn op_srl(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.t()) >> instruction.shift();

    write_ud0(cpu, d, sext32(v));
}

pub(crate) fn op_sra(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = (cpu.ul0(instruction.t()) as i32) >> instruction.shift();

    write_ud0(cpu, d, sext32(v as u32));
}

/// Shift Left Logical Variable. Only the low 5 bits of rs are used.
pub(crate) fn op_sllv(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.t()) << (cpu.ul0(instruction.s()) & 0x1f);

    write_ud0(cpu, d, sext32(v));
}

pub(crate) fn op_srlv(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = cpu.ul0(instruction.t()) >> (cpu.ul0(instruction.s()) & 0x1f);

    write_ud0(cpu, d, sext32(v));
}

pub(crate) fn op_srav(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let d = instruction.d();
    let v = (cpu.ul0(instruction.t()) as i32) >> (cpu.ul0(instruction.s()) & 0x1f);

    write_ud0(cpu, d, sext32(v as u32));
}

/// Doubleword shift of rt by a 6 bit amount. The "32" forms encode the amount minus 32.
fn dshift(cpu: &mut Cpu, instruction: Instruction, amount: u32, f: fn(u64, u32) -> u64) {
    let d = instruction.d();
    let v = f(cpu.ud0(instruction.t()), amount & 0x3f);

    write_ud0(cpu, d, v);
}

fn dsll(v: u64, sa: u32) -> u64 {
    v << sa
}

fn dsrl(v: u64, sa: u32) -> u64 {
    v >> sa
}

fn dsra(v: u64, sa: u32) -> u64 {
    ((v as i64) >> sa) as u64
}

pub(crate) fn op_dsll(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift(), dsll)
}

pub(crate) fn op_dsrl(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift(), dsrl)
}

pub(crate) fn op_dsra(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift(), dsra)
}

pub(crate) fn op_dsll32(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift() + 32, dsll)
}

pub(crate) fn op_dsrl32(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift() + 32, dsrl)
}

pub(crate) fn op_dsra32(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    dshift(cpu, instruction, instruction.shift() + 32, dsra)
}

pub(crate) fn op_dsllv(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let amount = cpu.ul0(instruction.s());

    dshift(cpu, instruction, amount, dsll)
}

pub(crate) fn op_dsrlv(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let amount = cpu.ul0(instruction.s());

    dshift(cpu, instruction, amount, dsrl)
}

pub(crate) fn op_dsrav(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let amount = cpu.ul0(instruction.s());

    dshift(cpu, instruction, amount, dsra)
}

/// Store a 64bit product in HI/LO of pipeline `pipe`. Only the low word of each half is kept,
/// sign extended: the upper 32 bits of a "true" 64 bit product are discarded. The R5900 also
/// copies LO into rd.
pub(super) fn set_product(cpu: &mut Cpu, instruction: Instruction, pipe: usize, res: u64) {
    let lo = sext32(res as u32);
    let hi = sext32((res >> 32) as u32);

    cpu.lo.set_ud(pipe, lo);
    cpu.hi.set_ud(pipe, hi);

    write_ud0(cpu, instruction.d(), lo);
}

/// Signed 32x32 multiplication of the low words of rs and rt
pub(super) fn mult_signed(cpu: &Cpu, instruction: Instruction) -> u64 {
    let a = i64::from(cpu.ul0(instruction.s()) as i32);
    let b = i64::from(cpu.ul0(instruction.t()) as i32);

    a.wrapping_mul(b) as u64
}

pub(super) fn mult_unsigned(cpu: &Cpu, instruction: Instruction) -> u64 {
    let a = u64::from(cpu.ul0(instruction.s()));
    let b = u64::from(cpu.ul0(instruction.t()));

    a.wrapping_mul(b)
}

/// Signed division into HI/LO of pipeline `pipe`. A zero divisor leaves HI/LO untouched.
pub(super) fn div_signed(cpu: &mut Cpu, instruction: Instruction, pipe: usize) {
    let n = cpu.ul0(instruction.s()) as i32;
    let d = cpu.ul0(instruction.t()) as i32;

    if d != 0 {
        // 0x8000_0000 / -1 wraps to 0x8000_0000 with a remainder of 0
        cpu.lo.set_ud(pipe, sext32(n.wrapping_div(d) as u32));
        cpu.hi.set_ud(pipe, sext32(n.wrapping_rem(d) as u32));
    }
}

pub(super) fn div_unsigned(cpu: &mut Cpu, instruction: Instruction, pipe: usize) {
    let n = cpu.ul0(instruction.s());
    let d = cpu.ul0(instruction.t());

    if d != 0 {
        cpu.lo.set_ud(pipe, sext32(n / d));
        cpu.hi.set_ud(pipe, sext32(n % d));
    }
}

/// Multiply (signed)
pub(crate) fn op_mult(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let res = mult_signed(cpu, instruction);

    set_product(cpu, instruction, 0, res);
}

pub(crate) fn op_multu(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let res = mult_unsigned(cpu, instruction);

    set_product(cpu, instruction, 0, res);
}

pub(crate) fn op_div(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    div_signed(cpu, instruction, 0);
}

pub(crate) fn op_divu(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    div_unsigned(cpu, instruction, 0);
}

pub(crate) fn op_mfhi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.hi.ud(0);

    write_ud0(cpu, instruction.d(), v);
}

pub(crate) fn op_mflo(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.lo.ud(0);

    write_ud0(cpu, instruction.d(), v);
}

pub(crate) fn op_mthi(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.ud0(instruction.s());

    cpu.hi.set_ud(0, v);
}

pub(crate) fn op_mtlo(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = cpu.ud0(instruction.s());

    cpu.lo.set_ud(0, v);
}

/// Move Conditional on Zero
pub(crate) fn op_movz(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    if cpu.ud0(instruction.t()) == 0 {
        let v = cpu.ud0(instruction.s());

        write_ud0(cpu, instruction.d(), v);
    }
}

/// Move Conditional on Not Zero
pub(crate) fn op_movn(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    if cpu.ud0(instruction.t()) != 0 {
        let v = cpu.ud0(instruction.s());

        write_ud0(cpu, instruction.d(), v);
    }
}

/// Move From Shift Amount register
pub(crate) fn op_mfsa(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = u64::from(cpu.sa);

    write_ud0(cpu, instruction.d(), v);
}

pub(crate) fn op_mtsa(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    cpu.sa = cpu.ul0(instruction.s());
}

/// Move To SA Byte: SA holds a bit count, so the byte offset is multiplied by 8
pub(crate) fn op_mtsab(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = (cpu.ul0(instruction.s()) & 0xf) ^ (instruction.imm() & 0xf);

    cpu.sa = v << 3;
}

/// Move To SA Halfword
pub(crate) fn op_mtsah(cpu: &mut Cpu, _: &mut dyn Bus, instruction: Instruction) {
    let v = (cpu.ul0(instruction.s()) & 7) ^ (instruction.imm() & 7);

    cpu.sa = v << 4;
}
