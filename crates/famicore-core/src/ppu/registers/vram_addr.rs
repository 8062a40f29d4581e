use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Fields of the 15-bit `v`/`t` address, `yyy NN YYYYY XXXXX`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Field: u16 {
        const COARSE_X = 0x001F;
        const COARSE_Y = 0x03E0;
        const NAMETABLE = 0x0C00;
        const FINE_Y = 0x7000;
    }
}

const ADDR_BITS: u16 = 0x7FFF;

/// Scroll/VRAM address held in the PPU's `v` and `t` latches.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct VramAddr(u16);

impl VramAddr {
    fn get(self, field: Field) -> u8 {
        ((self.0 & field.bits()) >> field.bits().trailing_zeros()) as u8
    }

    fn set(&mut self, field: Field, value: u8) {
        let shifted = u16::from(value) << field.bits().trailing_zeros();
        self.0 = (self.0 & !field.bits()) | (shifted & field.bits());
    }

    pub fn coarse_x(self) -> u8 {
        self.get(Field::COARSE_X)
    }

    pub fn set_coarse_x(&mut self, value: u8) {
        self.set(Field::COARSE_X, value);
    }

    pub fn coarse_y(self) -> u8 {
        self.get(Field::COARSE_Y)
    }

    pub fn set_coarse_y(&mut self, value: u8) {
        self.set(Field::COARSE_Y, value);
    }

    pub fn nametable(self) -> u8 {
        self.get(Field::NAMETABLE)
    }

    pub fn set_nametable(&mut self, value: u8) {
        self.set(Field::NAMETABLE, value);
    }

    pub fn fine_y(self) -> u8 {
        self.get(Field::FINE_Y)
    }

    pub fn set_fine_y(&mut self, value: u8) {
        self.set(Field::FINE_Y, value);
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn set_raw(&mut self, value: u16) {
        self.0 = value & ADDR_BITS;
    }

    /// `$2007` step outside rendering. The latch keeps all 15 bits; only the
    /// bus address is folded into `$0000-$3FFF`.
    pub fn increment(&mut self, step: u16) {
        self.0 = self.0.wrapping_add(step) & ADDR_BITS;
    }

    /// Coarse X increment; wrapping past 31 switches horizontal nametable.
    pub fn increment_coarse_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.0 ^= 0x0400;
        } else {
            self.0 += 1;
        }
    }

    /// Fine Y increment with carry into coarse Y. Row 29 wraps and switches
    /// vertical nametable; rows 30/31 (attribute memory) wrap without switching.
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.set_fine_y(self.fine_y() + 1);
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= 0x0800;
            }
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    /// Nametable byte address for the current tile.
    pub fn tile_addr(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    /// Attribute byte address covering the current tile.
    pub fn attribute_addr(self) -> u16 {
        0x23C0 | (self.0 & 0x0C00) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }
}

impl fmt::Debug for VramAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VramAddr({:#06X} fy={} nt={} cy={} cx={})",
            self.0,
            self.fine_y(),
            self.nametable(),
            self.coarse_y(),
            self.coarse_x()
        )
    }
}

impl From<u16> for VramAddr {
    fn from(v: u16) -> Self {
        VramAddr(v & ADDR_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_x_wraps_into_next_nametable() {
        let mut v = VramAddr::from(0x001F);
        v.increment_coarse_x();
        assert_eq!(v.raw(), 0x0400);
        v.increment_coarse_x();
        assert_eq!(v.raw(), 0x0401);
    }

    #[test]
    fn y_increment_skips_attribute_rows() {
        let mut v = VramAddr::default();
        v.set_fine_y(7);
        v.set_coarse_y(29);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y(), v.nametable()), (0, 0, 2));

        v.set_fine_y(7);
        v.set_coarse_y(31);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y(), v.nametable()), (0, 0, 2));
    }

    #[test]
    fn attribute_address_follows_tile() {
        let mut v = VramAddr::default();
        v.set_coarse_x(5);
        v.set_coarse_y(9);
        v.set_nametable(3);
        assert_eq!(v.tile_addr(), 0x2C00 + 9 * 32 + 5);
        assert_eq!(v.attribute_addr(), 0x2FC0 + (9 / 4) * 8 + 5 / 4);
    }
}
