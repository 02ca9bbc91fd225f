//! DMA channel registers driving the SIF engine

use bitfield::bitfield;

bitfield! {
    /// Channel control register (Dn_CHCR)
    #[derive(Copy, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct Chcr(u32);
    impl Debug;

    /// 0: to memory, 1: from memory
    pub bool, dir, set_dir: 0;
    /// 0: normal, 1: chain, 2: interleave
    pub u8, mode, set_mode: 3, 2;
    /// Address stack pointer
    pub u8, asp, set_asp: 5, 4;
    /// Transfer the tag along with the data
    pub bool, tte, set_tte: 6;
    /// Stop and interrupt on tags with the IRQ bit
    pub bool, tie, set_tie: 7;
    /// Start / busy
    pub bool, start, set_start: 8;
    /// Upper half of the last tag read
    pub u16, tag, set_tag: 31, 16;
}

impl Chcr {
    pub fn new(raw: u32) -> Chcr {
        Chcr(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn chain_mode(self) -> bool {
        self.mode() == 1
    }

    /// IRQ bit of the last tag read
    pub fn tag_irq(self) -> bool {
        self.tag() & 0x8000 != 0
    }

    /// Replace the TAG field with the upper half of a tag
    pub fn set_tag_upper(&mut self, upper: u32) {
        self.0 = (self.0 & 0xffff) | (upper & 0xffff_0000);
    }
}

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct DmaChannel {
    pub chcr: Chcr,
    /// Memory address of the current transfer
    pub madr: u32,
    /// Quadwords left in the current transfer
    pub qwc: u32,
    /// Address of the next tag in chain mode
    pub tadr: u32,
}

impl DmaChannel {
    pub fn new() -> DmaChannel {
        DmaChannel::default()
    }
}

/// The four DMA channels involved in the SIF transfers, indexed by SIF channel
#[derive(Clone, Default, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct SifDmaRegisters {
    /// EE DMAC channels 5 (SIF0) and 6 (SIF1)
    pub ee: [DmaChannel; 2],
    /// IOP DMA channels 9 (SIF0) and 10 (SIF1)
    pub iop: [DmaChannel; 2],
}

impl SifDmaRegisters {
    pub fn new() -> SifDmaRegisters {
        SifDmaRegisters::default()
    }
}

#[test]
fn test_chcr_fields() {
    let mut chcr = Chcr(0x8000_0185);

    assert!(chcr.dir());
    assert!(chcr.chain_mode());
    assert!(chcr.tie());
    assert!(chcr.start());
    assert!(!chcr.tte());
    assert!(chcr.tag_irq());

    chcr.set_tag_upper(0x3000_1234);
    assert_eq!(chcr.0, 0x3000_0185);
    assert!(!chcr.tag_irq());
}
