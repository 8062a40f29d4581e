//! Palette index to RGB conversion.

/// 64-entry colour table, one `0x00RRGGBB` value per hardware palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette([u32; 64]);

#[rustfmt::skip]
const NTSC_2C02: [u32; 64] = [
    0x626262, 0x001FB2, 0x2404C8, 0x5200B2, 0x730076, 0x800024, 0x730B00, 0x522800,
    0x244400, 0x005700, 0x005C00, 0x005324, 0x003C76, 0x000000, 0x000000, 0x000000,
    0xABABAB, 0x0D57FF, 0x4B30FF, 0x8A13FF, 0xBC08D6, 0xD21269, 0xC72E00, 0x9D5400,
    0x607B00, 0x209800, 0x00A300, 0x009942, 0x007DB4, 0x000000, 0x000000, 0x000000,
    0xFFFFFF, 0x53AEFF, 0x9085FF, 0xD365FF, 0xFF57FF, 0xFF5DCF, 0xFF7757, 0xFA9E00,
    0xBDC700, 0x7AE700, 0x43F611, 0x26EF7E, 0x2CD5F6, 0x4E4E4E, 0x000000, 0x000000,
    0xFFFFFF, 0xB6E1FF, 0xCED1FF, 0xE9C3FF, 0xFFBCFF, 0xFFBDF4, 0xFFC6C3, 0xFFD59A,
    0xE9E681, 0xCEF481, 0xB6FB9A, 0xA9FAC3, 0xA9F0F4, 0xB8B8B8, 0x000000, 0x000000,
];

impl Palette {
    pub const fn new(colors: [u32; 64]) -> Self {
        Self(colors)
    }

    /// Converts a 9-bit pixel (6-bit colour plus 3 emphasis bits) to RGB.
    ///
    /// Emphasis attenuates the two channels that are not emphasised to
    /// roughly 75%, the common approximation of the analog behaviour.
    pub fn rgb(&self, pixel: u16) -> [u8; 3] {
        let color = self.0[(pixel & 0x3F) as usize];
        let mut rgb = [(color >> 16) as u8, (color >> 8) as u8, color as u8];
        let emphasis = (pixel >> 6) & 0x07;
        if emphasis != 0 {
            // Bit 0 emphasises red, bit 1 green, bit 2 blue.
            for (channel, value) in rgb.iter_mut().enumerate() {
                if emphasis & (1 << channel) == 0 {
                    *value = ((*value as u16 * 3) / 4) as u8;
                }
            }
        }
        rgb
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(NTSC_2C02)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_dims_other_channels() {
        let palette = Palette::default();
        assert_eq!(palette.rgb(0x30), [0xFF, 0xFF, 0xFF]);
        // Red emphasis keeps red and dims green/blue.
        assert_eq!(palette.rgb(0x30 | (1 << 6)), [0xFF, 0xBF, 0xBF]);
    }
}
