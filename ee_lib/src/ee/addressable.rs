use super::memory::Memory;

/// Access sizes supported by the EE memory interface
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AccessWidth {
    Byte = 1,
    HalfWord = 2,
    Word = 4,
    DoubleWord = 8,
    QuadWord = 16,
}

/// Types that can be moved across the memory interface. Lets the load/store handlers be written
/// once for every access width.
pub trait Addressable: Copy {
    fn width() -> AccessWidth;

    fn size() -> usize {
        Self::width() as usize
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> Self;

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32);
}

impl Addressable for u8 {
    fn width() -> AccessWidth {
        AccessWidth::Byte
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> u8 {
        mem.read8(addr)
    }

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32) {
        mem.write8(addr, self)
    }
}

impl Addressable for u16 {
    fn width() -> AccessWidth {
        AccessWidth::HalfWord
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> u16 {
        mem.read16(addr)
    }

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32) {
        mem.write16(addr, self)
    }
}

impl Addressable for u32 {
    fn width() -> AccessWidth {
        AccessWidth::Word
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> u32 {
        mem.read32(addr)
    }

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32) {
        mem.write32(addr, self)
    }
}

impl Addressable for u64 {
    fn width() -> AccessWidth {
        AccessWidth::DoubleWord
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> u64 {
        mem.read64(addr)
    }

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32) {
        mem.write64(addr, self)
    }
}

impl Addressable for u128 {
    fn width() -> AccessWidth {
        AccessWidth::QuadWord
    }

    fn load_from<M: Memory + ?Sized>(mem: &mut M, addr: u32) -> u128 {
        mem.read128(addr)
    }

    fn store_to<M: Memory + ?Sized>(self, mem: &mut M, addr: u32) {
        mem.write128(addr, self)
    }
}

#[test]
fn access_sizes() {
    assert_eq!(u8::size(), 1);
    assert_eq!(u16::size(), 2);
    assert_eq!(u32::size(), 4);
    assert_eq!(u64::size(), 8);
    assert_eq!(u128::size(), 16);
}
