/// Single bit accessors for the 32bit COP0 registers
pub trait Bitwise {
    /// Returns true if the given bit is set in `self`
    fn bit(self, bitpos: u8) -> bool;

    /// Sets the given bit in self to 1 if `v` is true, 0 if `v` is false
    fn set_bit(&mut self, bitpos: u8, v: bool);
}

impl Bitwise for u32 {
    fn bit(self, bitpos: u8) -> bool {
        self & (1u32 << bitpos) != 0
    }

    fn set_bit(&mut self, bitpos: u8, v: bool) {
        *self &= !(1u32 << bitpos);
        *self |= (v as u32) << bitpos;
    }
}

#[test]
fn status_bits() {
    // BEV | ERL
    let mut sr = 0x0040_0004u32;

    assert!(sr.bit(22));
    assert!(sr.bit(2));
    assert!(!sr.bit(1));

    sr.set_bit(1, true);
    sr.set_bit(2, false);
    assert_eq!(sr, 0x0040_0002);

    sr.set_bit(31, true);
    assert!(sr.bit(31));
    assert_eq!(sr, 0x8040_0002);
}
