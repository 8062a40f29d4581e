use bitflags::bitflags;

bitflags! {
    /// `$2001` PPUMASK, `BGRs bMmG`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub(crate) struct Mask: u8 {
        const GREYSCALE = 0x01;
        const BG_LEFT_COLUMN = 0x02;
        const SPRITES_LEFT_COLUMN = 0x04;
        const BG = 0x08;
        const SPRITES = 0x10;
        const EMPHASIS = 0xE0;
    }
}

impl Mask {
    pub(crate) fn rendering_enabled(self) -> bool {
        self.intersects(Mask::BG | Mask::SPRITES)
    }

    /// Emphasis bits as they sit in a frame-buffer entry (bits 6-8).
    pub(crate) fn emphasis(self) -> u16 {
        u16::from((self & Mask::EMPHASIS).bits()) << 1
    }

    pub(crate) fn palette_mask(self) -> u8 {
        if self.contains(Mask::GREYSCALE) { 0x30 } else { 0x3F }
    }

    pub(crate) fn background_visible_at(self, x: u16) -> bool {
        self.layer_visible(Mask::BG, Mask::BG_LEFT_COLUMN, x)
    }

    pub(crate) fn sprites_visible_at(self, x: u16) -> bool {
        self.layer_visible(Mask::SPRITES, Mask::SPRITES_LEFT_COLUMN, x)
    }

    fn layer_visible(self, layer: Mask, left: Mask, x: u16) -> bool {
        self.contains(layer) && (x >= 8 || self.contains(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_column_clipping() {
        let mask = Mask::BG | Mask::SPRITES | Mask::SPRITES_LEFT_COLUMN;
        assert!(!mask.background_visible_at(7));
        assert!(mask.background_visible_at(8));
        assert!(mask.sprites_visible_at(0));
        assert_eq!(Mask::from_bits_retain(0xA0).emphasis(), 0x140);
    }
}
