//! Instruction decoding. Every opcode group is a table of entries that either name a handler or
//! point at the next table to index, so decoding is a plain loop from the primary table down.

use super::cpu::Cpu;
use super::instruction::Instruction;
use super::ops::{alu, branch, cop, loadstore, mmi, system};
use crate::ee::bus::Bus;

pub type Handler = fn(&mut Cpu, &mut dyn Bus, Instruction);

/// Decoded operation
#[derive(Clone, Copy)]
pub struct Op {
    pub name: &'static str,
    pub handler: Handler,
}

#[derive(Clone, Copy)]
pub enum Entry {
    Leaf(Op),
    Subtable(Table),
}

/// Opcode tables, named after the group they decode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Table {
    Primary,
    Special,
    RegImm,
    Cop0,
    Bc0,
    C0,
    Mmi,
    Mmi0,
    Mmi1,
    Mmi2,
    Mmi3,
}

impl Table {
    /// Instruction field used to index this table
    fn index(self, instruction: Instruction) -> usize {
        match self {
            Table::Primary => instruction.opcode(),
            Table::Special | Table::C0 | Table::Mmi => instruction.function(),
            Table::RegImm | Table::Bc0 => instruction.t().0 as usize,
            Table::Cop0 => instruction.s().0 as usize,
            Table::Mmi0 | Table::Mmi1 | Table::Mmi2 | Table::Mmi3 => instruction.shift() as usize,
        }
    }

    fn entries(self) -> &'static [Entry] {
        match self {
            Table::Primary => &PRIMARY,
            Table::Special => &SPECIAL,
            Table::RegImm => &REGIMM,
            Table::Cop0 => &COP0,
            Table::Bc0 => &BC0,
            Table::C0 => &C0,
            Table::Mmi => &MMI,
            Table::Mmi0 => &MMI0,
            Table::Mmi1 => &MMI1,
            Table::Mmi2 => &MMI2,
            Table::Mmi3 => &MMI3,
        }
    }
}

/// Resolve `instruction` to its handler. Never fails: reserved encodings decode to the unknown
/// operation.
pub fn decode(instruction: Instruction) -> Op {
    let mut table = Table::Primary;

    loop {
        match table.entries()[table.index(instruction)] {
            Entry::Leaf(op) => return op,
            Entry::Subtable(next) => table = next,
        }
    }
}

macro_rules! op {
    ($name:literal, $handler:path) => {
        Entry::Leaf(Op {
            name: $name,
            handler: $handler,
        })
    };
}

macro_rules! sub {
    ($table:ident) => {
        Entry::Subtable(Table::$table)
    };
}

/// Reserved or unimplemented encoding
const U: Entry = op!("unknown", system::op_unknown);

/// Main opcodes (instruction bits [31:26])
#[rustfmt::skip]
static PRIMARY: [Entry; 64] = [
    // 0x00
    sub!(Special),                 sub!(RegImm),                  op!("j", branch::op_j),            op!("jal", branch::op_jal),
    op!("beq", branch::op_beq),    op!("bne", branch::op_bne),    op!("blez", branch::op_blez),      op!("bgtz", branch::op_bgtz),
    op!("addi", alu::op_addi),     op!("addiu", alu::op_addiu),   op!("slti", alu::op_slti),         op!("sltiu", alu::op_sltiu),
    op!("andi", alu::op_andi),     op!("ori", alu::op_ori),       op!("xori", alu::op_xori),         op!("lui", alu::op_lui),
    // 0x10
    sub!(Cop0),                    op!("cop1", cop::op_forward),  op!("cop2", cop::op_forward),      U,
    op!("beql", branch::op_beql),  op!("bnel", branch::op_bnel),  op!("blezl", branch::op_blezl),    op!("bgtzl", branch::op_bgtzl),
    op!("daddi", alu::op_daddi),   op!("daddiu", alu::op_daddiu), op!("ldl", loadstore::op_ldl),     op!("ldr", loadstore::op_ldr),
    sub!(Mmi),                     U,                             op!("lq", loadstore::op_lq),       op!("sq", loadstore::op_sq),
    // 0x20
    op!("lb", loadstore::op_lb),   op!("lh", loadstore::op_lh),   op!("lwl", loadstore::op_lwl),     op!("lw", loadstore::op_lw),
    op!("lbu", loadstore::op_lbu), op!("lhu", loadstore::op_lhu), op!("lwr", loadstore::op_lwr),     op!("lwu", loadstore::op_lwu),
    op!("sb", loadstore::op_sb),   op!("sh", loadstore::op_sh),   op!("swl", loadstore::op_swl),     op!("sw", loadstore::op_sw),
    op!("sdl", loadstore::op_sdl), op!("sdr", loadstore::op_sdr), op!("swr", loadstore::op_swr),     op!("cache", system::op_nop),
    // 0x30
    U,                             op!("lwc1", cop::op_forward),  U,                                 op!("pref", system::op_nop),
    U,                             U,                             op!("lqc2", cop::op_forward),      op!("ld", loadstore::op_ld),
    U,                             op!("swc1", cop::op_forward),  U,                                 U,
    U,                             U,                             op!("sqc2", cop::op_forward),      op!("sd", loadstore::op_sd),
];

/// SPECIAL group, indexed by the function field
#[rustfmt::skip]
static SPECIAL: [Entry; 64] = [
    // 0x00
    op!("sll", alu::op_sll),           U,                               op!("srl", alu::op_srl),         op!("sra", alu::op_sra),
    op!("sllv", alu::op_sllv),         U,                               op!("srlv", alu::op_srlv),       op!("srav", alu::op_srav),
    op!("jr", branch::op_jr),          op!("jalr", branch::op_jalr),    op!("movz", alu::op_movz),       op!("movn", alu::op_movn),
    op!("syscall", system::op_syscall), op!("break", system::op_break), U,                               op!("sync", system::op_nop),
    // 0x10
    op!("mfhi", alu::op_mfhi),         op!("mthi", alu::op_mthi),       op!("mflo", alu::op_mflo),       op!("mtlo", alu::op_mtlo),
    op!("dsllv", alu::op_dsllv),       U,                               op!("dsrlv", alu::op_dsrlv),     op!("dsrav", alu::op_dsrav),
    op!("mult", alu::op_mult),         op!("multu", alu::op_multu),     op!("div", alu::op_div),         op!("divu", alu::op_divu),
    U,                                 U,                               U,                               U,
    // 0x20
    op!("add", alu::op_add),           op!("addu", alu::op_addu),       op!("sub", alu::op_sub),         op!("subu", alu::op_subu),
    op!("and", alu::op_and),           op!("or", alu::op_or),           op!("xor", alu::op_xor),         op!("nor", alu::op_nor),
    op!("mfsa", alu::op_mfsa),         op!("mtsa", alu::op_mtsa),       op!("slt", alu::op_slt),         op!("sltu", alu::op_sltu),
    op!("dadd", alu::op_dadd),         op!("daddu", alu::op_daddu),     op!("dsub", alu::op_dsub),       op!("dsubu", alu::op_dsubu),
    // 0x30
    op!("tge", branch::op_tge),        op!("tgeu", branch::op_tgeu),    op!("tlt", branch::op_tlt),      op!("tltu", branch::op_tltu),
    op!("teq", branch::op_teq),        U,                               op!("tne", branch::op_tne),      U,
    op!("dsll", alu::op_dsll),         U,                               op!("dsrl", alu::op_dsrl),       op!("dsra", alu::op_dsra),
    op!("dsll32", alu::op_dsll32),     U,                               op!("dsrl32", alu::op_dsrl32),   op!("dsra32", alu::op_dsra32),
];

/// REGIMM group, indexed by the rt field
#[rustfmt::skip]
static REGIMM: [Entry; 32] = [
    // 0x00
    op!("bltz", branch::op_bltz),      op!("bgez", branch::op_bgez),      op!("bltzl", branch::op_bltzl),     op!("bgezl", branch::op_bgezl),
    U,                                 U,                                 U,                                  U,
    op!("tgei", branch::op_tgei),      op!("tgeiu", branch::op_tgeiu),    op!("tlti", branch::op_tlti),       op!("tltiu", branch::op_tltiu),
    op!("teqi", branch::op_teqi),      U,                                 op!("tnei", branch::op_tnei),       U,
    // 0x10
    op!("bltzal", branch::op_bltzal),  op!("bgezal", branch::op_bgezal),  op!("bltzall", branch::op_bltzall), op!("bgezall", branch::op_bgezall),
    U,                                 U,                                 U,                                  U,
    op!("mtsab", alu::op_mtsab),       op!("mtsah", alu::op_mtsah),       U,                                  U,
    U,                                 U,                                 U,                                  U,
];

/// COP0 group, indexed by the rs field
#[rustfmt::skip]
static COP0: [Entry; 32] = [
    // 0x00
    op!("mfc0", cop::op_mfc0), U, U, U,
    op!("mtc0", cop::op_mtc0), U, U, U,
    sub!(Bc0),                 U, U, U,
    U,                         U, U, U,
    // 0x10
    sub!(C0),                  U, U, U,
    U,                         U, U, U,
    U,                         U, U, U,
    U,                         U, U, U,
];

/// BC0 branches, indexed by the rt field
#[rustfmt::skip]
static BC0: [Entry; 32] = [
    op!("bc0f", cop::op_bc0f), op!("bc0t", cop::op_bc0t), op!("bc0fl", cop::op_bc0fl), op!("bc0tl", cop::op_bc0tl),
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
];

/// COP0 "C0" operations, indexed by the function field. The TLB operations are not emulated.
#[rustfmt::skip]
static C0: [Entry; 64] = [
    // 0x00
    U, U, U, U, U, U, U, U,
    U, U, U, U, U, U, U, U,
    // 0x10
    U, U, U, U, U, U, U, U,
    op!("eret", cop::op_eret), U, U, U, U, U, U, U,
    // 0x20
    U, U, U, U, U, U, U, U,
    U, U, U, U, U, U, U, U,
    // 0x30
    U, U, U, U, U, U, U, U,
    op!("ei", cop::op_ei), op!("di", cop::op_di), U, U, U, U, U, U,
];

/// MMI group, indexed by the function field
#[rustfmt::skip]
static MMI: [Entry; 64] = [
    // 0x00
    op!("madd", mmi::op_madd),     op!("maddu", mmi::op_maddu),   U,                             U,
    op!("plzcw", mmi::op_plzcw),   U,                             U,                             U,
    sub!(Mmi0),                    sub!(Mmi2),                    U,                             U,
    U,                             U,                             U,                             U,
    // 0x10
    op!("mfhi1", mmi::op_mfhi1),   op!("mthi1", mmi::op_mthi1),   op!("mflo1", mmi::op_mflo1),   op!("mtlo1", mmi::op_mtlo1),
    U,                             U,                             U,                             U,
    op!("mult1", mmi::op_mult1),   op!("multu1", mmi::op_multu1), op!("div1", mmi::op_div1),     op!("divu1", mmi::op_divu1),
    U,                             U,                             U,                             U,
    // 0x20
    op!("madd1", mmi::op_madd1),   op!("maddu1", mmi::op_maddu1), U,                             U,
    U,                             U,                             U,                             U,
    sub!(Mmi1),                    sub!(Mmi3),                    U,                             U,
    U,                             U,                             U,                             U,
    // 0x30
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
    U, U, U, U,
];

/// MMI0 group, indexed by the sa field
#[rustfmt::skip]
static MMI0: [Entry; 32] = [
    // 0x00
    op!("paddw", mmi::op_paddw),   op!("psubw", mmi::op_psubw),   op!("pcgtw", mmi::op_pcgtw),   op!("pmaxw", mmi::op_pmaxw),
    op!("paddh", mmi::op_paddh),   op!("psubh", mmi::op_psubh),   op!("pcgth", mmi::op_pcgth),   op!("pmaxh", mmi::op_pmaxh),
    op!("paddb", mmi::op_paddb),   op!("psubb", mmi::op_psubb),   op!("pcgtb", mmi::op_pcgtb),   U,
    U,                             U,                             U,                             U,
    // 0x10
    U,                             U,                             op!("pextlw", mmi::op_pextlw), U,
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
];

/// MMI1 group, indexed by the sa field
#[rustfmt::skip]
static MMI1: [Entry; 32] = [
    // 0x00
    U,                             U,                             op!("pceqw", mmi::op_pceqw),   op!("pminw", mmi::op_pminw),
    U,                             U,                             op!("pceqh", mmi::op_pceqh),   op!("pminh", mmi::op_pminh),
    U,                             U,                             op!("pceqb", mmi::op_pceqb),   U,
    U,                             U,                             U,                             U,
    // 0x10
    op!("padduw", mmi::op_padduw), op!("psubuw", mmi::op_psubuw), op!("pextuw", mmi::op_pextuw), U,
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
];

/// MMI2 group, indexed by the sa field
#[rustfmt::skip]
static MMI2: [Entry; 32] = [
    // 0x00
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
    op!("pmfhi", mmi::op_pmfhi),   op!("pmflo", mmi::op_pmflo),   U,                             U,
    U,                             U,                             op!("pcpyld", mmi::op_pcpyld), U,
    // 0x10
    U,                             U,                             op!("pand", mmi::op_pand),     op!("pxor", mmi::op_pxor),
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
];

/// MMI3 group, indexed by the sa field
#[rustfmt::skip]
static MMI3: [Entry; 32] = [
    // 0x00
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             U,
    op!("pmthi", mmi::op_pmthi),   op!("pmtlo", mmi::op_pmtlo),   U,                             U,
    U,                             U,                             op!("pcpyud", mmi::op_pcpyud), U,
    // 0x10
    U,                             U,                             op!("por", mmi::op_por),       op!("pnor", mmi::op_pnor),
    U,                             U,                             U,                             U,
    U,                             U,                             U,                             op!("pcpyh", mmi::op_pcpyh),
    U,                             U,                             U,                             U,
];
