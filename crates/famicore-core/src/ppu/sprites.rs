//! Sprite evaluation, pattern fetches and per-pixel sprite lookup.
//!
//! On every visible line the PPU clears secondary OAM (dots 1-64), copies up
//! to eight in-range sprites into it (dots 65-256) and fetches their patterns
//! for the next line (dots 257-320). Once eight sprites are found the overflow
//! search keeps stepping through OAM, but it also advances the byte index when
//! a sprite is out of range, so it compares tile, attribute or X bytes as if
//! they were Y coordinates.

use crate::{
    cartridge::Mapper,
    memory::ppu as ppu_mem,
    ppu::{PRE_RENDER_LINE, Ppu, registers::Status},
};

/// One sprite loaded for the line being drawn. Patterns are stored
/// already flipped horizontally, bit 7 is the leftmost pixel.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteSlot {
    pub(crate) x: u8,
    pub(crate) attr: u8,
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprites {
    pub(crate) secondary: [u8; ppu_mem::SECONDARY_OAM_SIZE],
    /// Byte moved between OAM and secondary OAM on each evaluation step.
    pub(crate) latch: u8,
    /// Sprite index (`n`) and byte index (`m`) of the evaluation walk.
    pub(crate) n: u8,
    pub(crate) m: u8,
    pub(crate) secondary_addr: u8,
    pub(crate) in_range: bool,
    pub(crate) done: bool,
    /// Sprite 0 was copied for the next line.
    pub(crate) sprite0_next: bool,
    /// Slot 0 of the current line holds sprite 0.
    pub(crate) sprite0_line: bool,
    /// Sprites loaded for the current line.
    pub(crate) count: u8,
    pub(crate) slots: [SpriteSlot; 8],
}

impl Default for Sprites {
    fn default() -> Self {
        Self {
            secondary: [0xFF; ppu_mem::SECONDARY_OAM_SIZE],
            latch: 0xFF,
            n: 0,
            m: 0,
            secondary_addr: 0,
            in_range: false,
            done: false,
            sprite0_next: false,
            sprite0_line: false,
            count: 0,
            slots: [SpriteSlot::default(); 8],
        }
    }
}

/// A sprite pixel that won the per-slot priority race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SpritePixel {
    /// Palette RAM offset (`$10-$1F`).
    pub(crate) color: u8,
    pub(crate) behind_background: bool,
    pub(crate) sprite0: bool,
}

impl Sprites {
    /// First opaque sprite pixel at screen column `x`.
    pub(crate) fn pixel(&self, x: u16) -> Option<SpritePixel> {
        self.slots[..self.count as usize]
            .iter()
            .enumerate()
            .find_map(|(index, slot)| {
                let dx = x.checked_sub(u16::from(slot.x))?;
                if dx >= 8 {
                    return None;
                }
                let bit = 7 - dx;
                let value = ((slot.pattern_hi >> bit) & 1) << 1 | ((slot.pattern_lo >> bit) & 1);
                (value != 0).then(|| SpritePixel {
                    color: 0x10 | ((slot.attr & 0x03) << 2) | value,
                    behind_background: slot.attr & 0x20 != 0,
                    sprite0: index == 0 && self.sprite0_line,
                })
            })
    }
}

impl Ppu {
    /// Secondary OAM clear and sprite evaluation for one visible-line dot.
    pub(super) fn evaluate_sprites_dot(&mut self) {
        let dot = self.dot;
        match dot {
            1..=64 => {
                // Reads during the clear return $FF.
                self.sprites.latch = 0xFF;
                if dot & 1 == 0 {
                    self.sprites.secondary[(dot / 2 - 1) as usize] = 0xFF;
                }
            }
            65..=256 => {
                if dot == 65 {
                    let s = &mut self.sprites;
                    s.n = self.oam_addr >> 2;
                    s.m = self.oam_addr & 0x03;
                    s.secondary_addr = 0;
                    s.in_range = false;
                    s.done = false;
                    s.sprite0_next = false;
                }
                if dot & 1 == 1 {
                    let index = (usize::from(self.sprites.n) << 2) | usize::from(self.sprites.m);
                    self.sprites.latch = self.oam[index];
                } else {
                    self.evaluation_step();
                }
            }
            _ => {}
        }
    }

    fn evaluation_step(&mut self) {
        let height = u16::from(self.control.sprite_height());
        let scanline = self.scanline;
        let s = &mut self.sprites;

        if s.done {
            s.n = (s.n + 1) & 0x3F;
            if usize::from(s.secondary_addr) >= ppu_mem::SECONDARY_OAM_SIZE {
                s.latch = s.secondary[usize::from(s.secondary_addr) & 0x1F];
            }
        } else {
            let top = u16::from(s.latch);
            if !s.in_range && scanline >= top && scanline < top + height {
                s.in_range = true;
            }

            if usize::from(s.secondary_addr) < ppu_mem::SECONDARY_OAM_SIZE {
                s.secondary[usize::from(s.secondary_addr)] = s.latch;
                if s.in_range {
                    if s.n == 0 {
                        s.sprite0_next = true;
                    }
                    s.secondary_addr += 1;
                    s.m += 1;
                    if s.m == 4 {
                        s.in_range = false;
                        s.m = 0;
                        s.n = (s.n + 1) & 0x3F;
                        s.done = s.n == 0;
                    }
                } else {
                    s.n = (s.n + 1) & 0x3F;
                    s.done = s.n == 0;
                }
            } else if s.in_range {
                self.status.insert(Status::SPRITE_OVERFLOW);
                s.done = true;
            } else {
                // Hardware bug: `m` advances together with `n`.
                s.n = (s.n + 1) & 0x3F;
                s.m = (s.m + 1) & 0x03;
                s.done = s.n == 0;
            }
        }
        self.oam_addr = (self.sprites.n << 2) | (self.sprites.m & 0x03);
    }

    /// Sprite pattern fetches for the next line (dots 257-320). Empty slots
    /// still fetch tile `$FF` so the cartridge sees the same bus pattern.
    pub(super) fn sprite_fetch_dot(&mut self, mapper: &mut Mapper) {
        let dot = self.dot;
        if !(257..=320).contains(&dot) {
            return;
        }
        self.oam_addr = 0;

        let slot = usize::from((dot - 257) / 8);
        if dot == 257 {
            let loaded = if self.scanline == PRE_RENDER_LINE {
                0
            } else {
                self.sprites.secondary_addr.min(ppu_mem::SECONDARY_OAM_SIZE as u8) / 4
            };
            self.sprites.count = loaded;
            self.sprites.sprite0_line = loaded > 0 && self.sprites.sprite0_next;
        }

        match (dot - 257) & 7 {
            // Garbage nametable fetches.
            0 | 2 => self.set_bus_address(self.vram.v.tile_addr(), mapper),
            4 => self.set_bus_address(self.sprite_pattern_addr(slot), mapper),
            5 => {
                let value = mapper.ppu_read(self.bus_addr);
                self.store_sprite_plane(slot, value, false);
            }
            6 => self.set_bus_address(self.sprite_pattern_addr(slot) + 8, mapper),
            7 => {
                let value = mapper.ppu_read(self.bus_addr);
                self.store_sprite_plane(slot, value, true);
            }
            _ => {}
        }
    }

    fn sprite_pattern_addr(&self, slot: usize) -> u16 {
        let height = self.control.sprite_height();
        let (y, tile, attr) = if slot < usize::from(self.sprites.count) {
            let entry = &self.sprites.secondary[slot * 4..slot * 4 + 3];
            (entry[0], entry[1], entry[2])
        } else {
            (self.scanline as u8, 0xFF, 0x00)
        };

        let mut row = (self.scanline as u8).wrapping_sub(y) & (height - 1);
        if attr & 0x80 != 0 {
            row = height - 1 - row;
        }

        if height == 16 {
            let table = if tile & 0x01 != 0 {
                ppu_mem::PATTERN_TABLE_1
            } else {
                ppu_mem::PATTERN_TABLE_0
            };
            let tile = (tile & 0xFE) + u8::from(row >= 8);
            table | (u16::from(tile) << 4) | u16::from(row & 0x07)
        } else {
            self.control.sprite_pattern_table() | (u16::from(tile) << 4) | u16::from(row)
        }
    }

    fn store_sprite_plane(&mut self, slot: usize, value: u8, high: bool) {
        let loaded = slot < usize::from(self.sprites.count);
        let entry = &self.sprites.secondary[slot * 4..slot * 4 + 4];
        let (attr, x) = (entry[2], entry[3]);
        let value = match (loaded, attr & 0x40 != 0) {
            (false, _) => 0,
            (true, true) => value.reverse_bits(),
            (true, false) => value,
        };

        let target = &mut self.sprites.slots[slot];
        if high {
            target.pattern_hi = value;
        } else {
            target.pattern_lo = value;
            target.attr = attr;
            target.x = x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_opaque_slot_wins() {
        let mut sprites = Sprites {
            count: 2,
            sprite0_line: true,
            ..Default::default()
        };
        sprites.slots[0] = SpriteSlot {
            x: 10,
            attr: 0x01,
            pattern_lo: 0b0111_1111,
            pattern_hi: 0,
        };
        sprites.slots[1] = SpriteSlot {
            x: 10,
            attr: 0x22,
            pattern_lo: 0xFF,
            pattern_hi: 0xFF,
        };

        let left = sprites.pixel(10).expect("slot 1 is opaque");
        assert_eq!(left.color, 0x10 | (2 << 2) | 3);
        assert!(left.behind_background);
        assert!(!left.sprite0);

        let next = sprites.pixel(11).expect("slot 0 is opaque");
        assert_eq!(next.color, 0x10 | (1 << 2) | 1);
        assert!(next.sprite0);

        assert_eq!(sprites.pixel(18), None);
        assert_eq!(sprites.pixel(9), None);
    }
}
