//! Emotion Engine: R5900 interpreter, memory interfaces and the SIF link to the IOP

pub mod addressable;
pub mod bus;
pub mod memory;
pub mod processor;
pub mod sif;
pub mod tty;
