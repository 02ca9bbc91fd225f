//! Chain mode DMA tags

use bitfield::bitfield;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

bitfield! {
    /// First word of a source chain tag. The second word holds the address.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct DmaTag(u32);
    impl Debug;

    /// Number of quadwords following or pointed to by the tag
    pub u16, qwc, set_qwc: 15, 0;
    /// Priority control
    pub u8, pce, set_pce: 27, 26;
    pub u8, raw_id, set_raw_id: 30, 28;
    /// Raise an interrupt once the tag's data has been sent (when the channel has TIE set)
    pub bool, irq, set_irq: 31;
}

impl DmaTag {
    pub fn new(raw: u32) -> DmaTag {
        DmaTag(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn id(self) -> Option<TagId> {
        TagId::from_u8(self.raw_id())
    }

    /// Upper half of the tag, copied into the TAG field of CHCR
    pub fn upper(self) -> u32 {
        self.0 & 0xffff_0000
    }
}

/// Source chain tag identifiers
#[derive(FromPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TagId {
    /// Transfer the data at ADDR and end the chain
    Refe = 0,
    /// Transfer the data following the tag, next tag after the data
    Cnt = 1,
    /// Transfer the data following the tag, next tag at ADDR
    Next = 2,
    /// Transfer the data at ADDR, next tag follows this one
    Ref = 3,
    /// Same as `Ref`, with stall control on real hardware
    Refs = 4,
    /// Transfer the data following the tag and end the chain
    End = 7,
}

/// Where the data of a tag lives and where the next tag will be fetched from
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChainStep {
    pub madr: u32,
    pub tadr: u32,
    /// The chain ends after this tag's data
    pub end: bool,
}

/// Address computation for a tag fetched at `tadr`. `None` for an unrecognized ID.
pub fn chain_step(tag: DmaTag, addr: u32, tadr: u32) -> Option<ChainStep> {
    let data_len = u32::from(tag.qwc()) << 4;
    let after_tag = tadr.wrapping_add(16);

    let step = match tag.id()? {
        TagId::Refe => ChainStep {
            madr: addr,
            tadr: after_tag,
            end: true,
        },
        TagId::Cnt => ChainStep {
            madr: after_tag,
            tadr: after_tag.wrapping_add(data_len),
            end: false,
        },
        TagId::Next => ChainStep {
            madr: after_tag,
            tadr: addr,
            end: false,
        },
        TagId::Ref | TagId::Refs => ChainStep {
            madr: addr,
            tadr: after_tag,
            end: false,
        },
        TagId::End => ChainStep {
            madr: after_tag,
            tadr: after_tag.wrapping_add(data_len),
            end: true,
        },
    };

    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: u32, qwc: u32) -> DmaTag {
        DmaTag((id << 28) | qwc)
    }

    #[test]
    fn fields() {
        let t = DmaTag(0x8c00_0004 | (3 << 28));

        assert_eq!(t.qwc(), 4);
        assert_eq!(t.pce(), 3);
        assert!(t.irq());
        assert_eq!(t.id(), Some(TagId::Ref));
        assert_eq!(t.upper(), 0xbc00_0000);

        assert_eq!(DmaTag(5 << 28).id(), None);
        assert_eq!(DmaTag(6 << 28).id(), None);
    }

    #[test]
    fn addresses() {
        let tadr = 0x1000;

        assert_eq!(
            chain_step(tag(0, 4), 0x8000, tadr),
            Some(ChainStep { madr: 0x8000, tadr: 0x1010, end: true })
        );
        assert_eq!(
            chain_step(tag(1, 4), 0x8000, tadr),
            Some(ChainStep { madr: 0x1010, tadr: 0x1050, end: false })
        );
        assert_eq!(
            chain_step(tag(2, 4), 0x8000, tadr),
            Some(ChainStep { madr: 0x1010, tadr: 0x8000, end: false })
        );
        assert_eq!(
            chain_step(tag(3, 4), 0x8000, tadr),
            Some(ChainStep { madr: 0x8000, tadr: 0x1010, end: false })
        );
        assert_eq!(chain_step(tag(4, 4), 0x8000, tadr), chain_step(tag(3, 4), 0x8000, tadr));
        assert_eq!(
            chain_step(tag(7, 4), 0x8000, tadr),
            Some(ChainStep { madr: 0x1010, tadr: 0x1050, end: true })
        );
        assert_eq!(chain_step(tag(5, 4), 0x8000, tadr), None);
    }
}
