//! SIF mailbox and flag registers, mapped at 0x1000_f200 on the EE side

use crate::ee::memory::Memory;

/// Bits always reported as set when the EE reads the control register
const CTRL_READ_MASK: u32 = 0xf000_0102;

#[derive(serde::Serialize, serde::Deserialize, Clone, Default, Debug, PartialEq, Eq)]
pub struct SifRegisters {
    /// EE -> IOP command word
    mscom: u32,
    /// IOP -> EE command word
    smcom: u32,
    /// EE -> IOP status flags
    msflg: u32,
    /// IOP -> EE status flags
    smflg: u32,
    ctrl: u32,
    bd6: u32,
}

impl SifRegisters {
    pub fn new() -> SifRegisters {
        SifRegisters::default()
    }

    /// Register write coming from the IOP side of the mailbox
    pub fn set_smcom(&mut self, val: u32) {
        self.smcom = val;
    }

    /// IOP sets bits in the IOP -> EE flag register
    pub fn raise_smflg(&mut self, bits: u32) {
        self.smflg |= bits;
    }

    /// Current EE -> IOP flags, as seen by the IOP
    pub fn msflg(&self) -> u32 {
        self.msflg
    }
}

impl Memory for SifRegisters {
    fn read32(&mut self, offset: u32) -> u32 {
        match offset & 0xf0 {
            0x00 => self.mscom,
            0x10 => self.smcom,
            0x20 => self.msflg,
            0x30 => self.smflg,
            0x40 => self.ctrl | CTRL_READ_MASK,
            0x50 => self.bd6,
            // Games poll this one to detect the SIF, it must read as 0
            0x60 => 0,
            _ => {
                warn!("Unhandled SIF register read at offset 0x{:02x}", offset);
                0
            }
        }
    }

    fn write32(&mut self, offset: u32, val: u32) {
        match offset & 0xf0 {
            0x00 => self.mscom = val,
            // Only the IOP writes the IOP -> EE command
            0x10 => (),
            0x20 => self.msflg |= val,
            0x30 => self.smflg &= !val,
            0x40 => {
                if val & 0x100 != 0 {
                    self.ctrl |= 0x100;
                } else {
                    self.ctrl &= !0x100;
                }
            }
            0x50 => self.bd6 = val,
            0x60 => self.bd6 = 0,
            _ => warn!(
                "Unhandled SIF register write at offset 0x{:02x}: 0x{:08x}",
                offset, val
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_semantics() {
        let mut regs = SifRegisters::new();

        regs.write32(0x20, 0x1);
        regs.write32(0x20, 0x4);
        assert_eq!(regs.read32(0x20), 0x5);
        assert_eq!(regs.msflg(), 0x5);

        regs.raise_smflg(0x30);
        regs.write32(0x30, 0x10);
        assert_eq!(regs.read32(0x30), 0x20);
    }

    #[test]
    fn control_and_detect() {
        let mut regs = SifRegisters::new();

        assert_eq!(regs.read32(0x40), CTRL_READ_MASK);
        regs.write32(0x40, 0x1_0100);
        assert_eq!(regs.ctrl, 0x100);
        regs.write32(0x40, 0);
        assert_eq!(regs.ctrl, 0);

        assert_eq!(regs.read32(0x60), 0);
    }

    #[test]
    fn command_words() {
        let mut regs = SifRegisters::new();

        regs.write32(0x00, 0x1234);
        regs.write32(0x10, 0xffff);
        regs.set_smcom(0x42);

        assert_eq!(regs.read32(0x00), 0x1234);
        assert_eq!(regs.read32(0x10), 0x42);
    }
}
