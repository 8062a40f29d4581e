use bitflags::bitflags;

use crate::memory::ppu as ppu_mem;

bitflags! {
    /// `$2000` PPUCTRL, `VPHB SINN`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub(crate) struct Control: u8 {
        const NAMETABLE_SELECT = 0x03;
        const VRAM_STRIDE_32 = 0x04;
        const SPRITE_PATTERNS_HI = 0x08;
        const BG_PATTERNS_HI = 0x10;
        const TALL_SPRITES = 0x20;
        /// EXT pin direction; the pins are not connected on a stock console.
        const EXT_OUTPUT = 0x40;
        const NMI_ENABLE = 0x80;
    }
}

fn pattern_base(high: bool) -> u16 {
    if high {
        ppu_mem::PATTERN_TABLE_1
    } else {
        ppu_mem::PATTERN_TABLE_0
    }
}

impl Control {
    pub(crate) fn nametable_index(self) -> u8 {
        (self & Control::NAMETABLE_SELECT).bits()
    }

    /// `$2007` address step: across (1) or down (32).
    pub(crate) fn vram_increment(self) -> u16 {
        match self.contains(Control::VRAM_STRIDE_32) {
            true => 32,
            false => 1,
        }
    }

    /// Ignored for 8x16 sprites, which pick the table from tile bit 0.
    pub(crate) fn sprite_pattern_table(self) -> u16 {
        pattern_base(self.contains(Control::SPRITE_PATTERNS_HI))
    }

    pub(crate) fn background_pattern_table(self) -> u16 {
        pattern_base(self.contains(Control::BG_PATTERNS_HI))
    }

    pub(crate) fn sprite_height(self) -> u8 {
        8 << u8::from(self.contains(Control::TALL_SPRITES))
    }

    pub(crate) fn nmi_enabled(self) -> bool {
        self.contains(Control::NMI_ENABLE)
    }
}
