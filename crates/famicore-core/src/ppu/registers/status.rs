use bitflags::bitflags;

bitflags! {
    /// `$2002` PPUSTATUS. Bits 0-4 are undriven and come from the I/O latch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub(crate) struct Status: u8 {
        const SPRITE_OVERFLOW = 0x20;
        const SPRITE_ZERO_HIT = 0x40;
        const VERTICAL_BLANK = 0x80;
    }
}
