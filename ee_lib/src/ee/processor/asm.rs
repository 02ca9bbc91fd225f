//! Tiny instruction encoder and execution harness for the interpreter tests

use super::cpu::{self, Cpu};
use super::RegisterIndex;
use crate::ee::bus::SimpleBus;
use crate::ee::memory::Memory;
use crate::ee::memory::ram::Ram;

/// Address test programs are loaded at
pub const BASE: u32 = 0x0010_0000;

pub fn r_type(funct: u32, rs: u32, rt: u32, rd: u32, sa: u32) -> u32 {
    (rs << 21) | (rt << 16) | (rd << 11) | (sa << 6) | funct
}

pub fn i_type(op: u32, rs: u32, rt: u32, imm: i32) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xffff)
}

pub fn regimm(rt_op: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x01, rs, rt_op, imm)
}

/// MMI group instruction. `funct` selects the MMI0-3 group when `sub` matters.
pub fn mmi(funct: u32, sub: u32, rs: u32, rt: u32, rd: u32) -> u32 {
    (0x1c << 26) | r_type(funct, rs, rt, rd, sub)
}

pub fn nop() -> u32 {
    0
}

pub fn addiu(rt: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x09, rs, rt, imm)
}

pub fn lui(rt: u32, imm: i32) -> u32 {
    i_type(0x0f, 0, rt, imm)
}

pub fn ori(rt: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x0d, rs, rt, imm)
}

pub fn beq(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x04, rs, rt, offset)
}

pub fn bne(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x05, rs, rt, offset)
}

pub fn beql(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x14, rs, rt, offset)
}

pub fn bnel(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x15, rs, rt, offset)
}

pub fn j(target: u32) -> u32 {
    (0x02 << 26) | ((target >> 2) & 0x3ff_ffff)
}

pub fn jal(target: u32) -> u32 {
    (0x03 << 26) | ((target >> 2) & 0x3ff_ffff)
}

pub fn syscall() -> u32 {
    0x0c
}

/// Interpreter plus a small machine to run encoded programs on
pub struct Harness {
    pub cpu: Cpu,
    pub bus: SimpleBus,
}

impl Harness {
    pub fn new(program: &[u32]) -> Harness {
        let ee_ram = Ram::with_size(2 * 1024 * 1024).unwrap();
        let iop_ram = Ram::with_size(64 * 1024).unwrap();
        let mut bus = SimpleBus::new(ee_ram, iop_ram);

        for (i, &w) in program.iter().enumerate() {
            bus.write32(BASE + (i as u32) * 4, w);
        }

        let mut cpu = Cpu::new();
        cpu.set_pc(BASE);

        Harness { cpu, bus }
    }

    pub fn step(&mut self) {
        cpu::step(&mut self.cpu, &mut self.bus);
    }

    /// Lower doubleword of GPR `r`
    pub fn gpr(&self, r: u8) -> u64 {
        self.cpu.reg(RegisterIndex(r)).ud(0)
    }

    pub fn set_gpr(&mut self, r: u8, v: u64) {
        let mut g = self.cpu.reg(RegisterIndex(r));

        g.set_ud(0, v);
        self.cpu.set_reg(RegisterIndex(r), g);
    }

    /// Run a single instruction word placed at PC
    pub fn exec(&mut self, word: u32) {
        let pc = self.cpu.pc();

        self.bus.write32(pc, word);
        self.step();
    }
}
