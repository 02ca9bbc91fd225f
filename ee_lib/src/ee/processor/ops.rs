//! Instruction handlers. Every handler has the `opcodes::Handler` signature and is only reached
//! through the decode tables.

pub(crate) mod alu;
pub(crate) mod branch;
pub(crate) mod cop;
pub(crate) mod loadstore;
pub(crate) mod mmi;
pub(crate) mod system;

use super::cpu::Cpu;
use super::RegisterIndex;

/// Write the lower doubleword of a destination register. Writes to R0 are dropped here so the
/// handlers don't have to repeat the check.
fn write_ud0(cpu: &mut Cpu, index: RegisterIndex, v: u64) {
    if !index.is_zero() {
        cpu.set_ud0(index, v);
    }
}
