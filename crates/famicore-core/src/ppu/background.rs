//! Background tile fetch pipeline.
//!
//! Every 8 dots the PPU fetches a nametable byte, an attribute byte and the
//! two pattern planes of the next tile. The 16-bit shifters hold the current
//! and the next tile; fine X selects the bit that leaves the shifter at each
//! dot.

use crate::{
    cartridge::Mapper,
    ppu::{PRE_RENDER_LINE, Ppu},
};

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Background {
    pub(crate) tile: u8,
    /// Two palette bits for the tile being fetched.
    pub(crate) attribute: u8,
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
    pub(crate) shift_lo: u16,
    pub(crate) shift_hi: u16,
    pub(crate) attr_shift_lo: u16,
    pub(crate) attr_shift_hi: u16,
}

impl Background {
    /// Moves the fetched tile into the low byte of every shifter.
    fn reload(&mut self) {
        let expand = |bit: u8| if bit != 0 { 0xFF } else { 0x00 };
        self.shift_lo = (self.shift_lo & 0xFF00) | u16::from(self.pattern_lo);
        self.shift_hi = (self.shift_hi & 0xFF00) | u16::from(self.pattern_hi);
        self.attr_shift_lo = (self.attr_shift_lo & 0xFF00) | expand(self.attribute & 0x01);
        self.attr_shift_hi = (self.attr_shift_hi & 0xFF00) | expand(self.attribute & 0x02);
    }

    fn shift(&mut self) {
        self.shift_lo <<= 1;
        self.shift_hi <<= 1;
        self.attr_shift_lo <<= 1;
        self.attr_shift_hi <<= 1;
    }

    /// Palette-relative colour `0bPPCC` of the pixel under fine X. A zero
    /// `CC` is transparent.
    pub(crate) fn pixel(&self, fine_x: u8) -> u8 {
        let bit = 15 - u16::from(fine_x);
        let plane = |shifter: u16| ((shifter >> bit) & 1) as u8;
        plane(self.attr_shift_hi) << 3
            | plane(self.attr_shift_lo) << 2
            | plane(self.shift_hi) << 1
            | plane(self.shift_lo)
    }
}

impl Ppu {
    /// Background fetches, shifts and scroll updates for one rendering dot.
    pub(super) fn background_dot(&mut self, mapper: &mut Mapper) {
        let dot = self.dot;
        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.bg.shift();
            if (dot - 1) & 7 == 0 {
                self.bg.reload();
            }
        }

        match dot {
            1..=256 | 321..=336 => self.fetch_tile_step(mapper, (dot - 1) & 7),
            // Two unused nametable fetches end the line.
            337 | 339 => self.set_bus_address(self.vram.v.tile_addr(), mapper),
            338 | 340 => self.bg.tile = mapper.ppu_read(self.bus_addr),
            _ => {}
        }

        match dot {
            256 => self.vram.v.increment_y(),
            257 => self.vram.copy_horizontal(),
            280..=304 if self.scanline == PRE_RENDER_LINE => self.vram.copy_vertical(),
            _ => {}
        }
    }

    fn fetch_tile_step(&mut self, mapper: &mut Mapper, phase: u16) {
        let v = self.vram.v;
        match phase {
            0 => self.set_bus_address(v.tile_addr(), mapper),
            1 => self.bg.tile = mapper.ppu_read(self.bus_addr),
            2 => self.set_bus_address(v.attribute_addr(), mapper),
            3 => {
                let byte = mapper.ppu_read(self.bus_addr);
                let shift = ((v.coarse_y() & 0x02) << 1) | (v.coarse_x() & 0x02);
                self.bg.attribute = (byte >> shift) & 0x03;
            }
            4 => self.set_bus_address(self.background_pattern_addr(), mapper),
            5 => self.bg.pattern_lo = mapper.ppu_read(self.bus_addr),
            6 => self.set_bus_address(self.background_pattern_addr() + 8, mapper),
            _ => {
                self.bg.pattern_hi = mapper.ppu_read(self.bus_addr);
                self.vram.v.increment_coarse_x();
            }
        }
    }

    fn background_pattern_addr(&self) -> u16 {
        self.control.background_pattern_table()
            | (u16::from(self.bg.tile) << 4)
            | u16::from(self.vram.v.fine_y())
    }
}
