//! iNES header decoding.
//!
//! The first 16 bytes of a `.nes` image describe how much PRG/CHR data
//! follows, which board (mapper) the game was built for, and how the
//! nametables are wired. Only the classic iNES fields are decoded; NES 2.0
//! extensions are read as their iNES equivalents.

use bitflags::bitflags;

use crate::error::Error;

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const HEADER_LEN: usize = 16;
/// PRG ROM size unit.
pub const PRG_BANK_SIZE: usize = 0x4000;
/// CHR ROM size unit.
pub const CHR_BANK_SIZE: usize = 0x2000;
/// Work RAM assumed when the header leaves byte 8 at zero.
pub const DEFAULT_PRG_RAM_SIZE: usize = 0x2000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const VERTICAL_MIRRORING = 0b0000_0001;
        const BATTERY            = 0b0000_0010;
        const TRAINER            = 0b0000_0100;
        const FOUR_SCREEN        = 0b0000_1000;
        const MAPPER_LOW_MASK    = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const VS_UNISYSTEM     = 0b0000_0001;
        const PLAYCHOICE_10    = 0b0000_0010;
        const NES2_DETECTION   = 0b0000_1100;
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// Nametable arrangement seen by the PPU.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mirroring {
    /// `$2000=$2400`, `$2800=$2C00` (vertical scrolling games).
    #[default]
    Horizontal,
    /// `$2000=$2800`, `$2400=$2C00` (horizontal scrolling games).
    Vertical,
    /// Every nametable shows the first 1 KiB page.
    SingleScreenA,
    /// Every nametable shows the second 1 KiB page.
    SingleScreenB,
    /// Four distinct nametables backed by extra cartridge RAM.
    FourScreen,
}

impl Mirroring {
    /// 1 KiB VRAM page used by each of the four logical nametables.
    pub const fn nametable_pages(self) -> [usize; 4] {
        match self {
            Self::Horizontal => [0, 0, 1, 1],
            Self::Vertical => [0, 1, 0, 1],
            Self::SingleScreenA => [0, 0, 0, 0],
            Self::SingleScreenB => [1, 1, 1, 1],
            Self::FourScreen => [0, 1, 2, 3],
        }
    }
}

/// Decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub mapper: u16,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
    pub prg_rom_size: usize,
    pub chr_rom_size: usize,
    pub prg_ram_size: usize,
}

impl Header {
    /// Parses the first [`HEADER_LEN`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let raw: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::TooShort {
                actual: bytes.len(),
            })?;
        if &raw[..4] != NES_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let flags6 = Flags6::from_bits_retain(raw[6]);
        let flags7 = Flags7::from_bits_retain(raw[7]);

        // Old dumping tools scribbled an ASCII tag over bytes 7-15; when that
        // happens the upper mapper nibble is garbage.
        let dirty_tail = (flags7 & Flags7::NES2_DETECTION).bits() != 0x08
            && raw[12..16].iter().any(|&b| b != 0);
        let high = if dirty_tail {
            0
        } else {
            (flags7 & Flags7::MAPPER_HIGH_MASK).bits()
        };
        let mapper = u16::from(high | ((flags6 & Flags6::MAPPER_LOW_MASK).bits() >> 4));

        let mirroring = if flags6.contains(Flags6::FOUR_SCREEN) {
            Mirroring::FourScreen
        } else if flags6.contains(Flags6::VERTICAL_MIRRORING) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_ram_size = match raw[8] {
            0 => DEFAULT_PRG_RAM_SIZE,
            units => units as usize * DEFAULT_PRG_RAM_SIZE,
        };

        Ok(Self {
            mapper,
            mirroring,
            battery: flags6.contains(Flags6::BATTERY),
            trainer: flags6.contains(Flags6::TRAINER),
            prg_rom_size: raw[4] as usize * PRG_BANK_SIZE,
            chr_rom_size: raw[5] as usize * CHR_BANK_SIZE,
            prg_ram_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(flags6: u8, flags7: u8) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(NES_MAGIC);
        bytes[4] = 2;
        bytes[5] = 1;
        bytes[6] = flags6;
        bytes[7] = flags7;
        bytes
    }

    #[test]
    fn decodes_sizes_and_mapper_nibbles() {
        let parsed = Header::parse(&header(0x41, 0x00)).expect("header");
        assert_eq!(parsed.mapper, 4);
        assert_eq!(parsed.mirroring, Mirroring::Vertical);
        assert_eq!(parsed.prg_rom_size, 2 * PRG_BANK_SIZE);
        assert_eq!(parsed.chr_rom_size, CHR_BANK_SIZE);
        assert_eq!(parsed.prg_ram_size, DEFAULT_PRG_RAM_SIZE);

        let parsed = Header::parse(&header(0x10, 0x40)).expect("header");
        assert_eq!(parsed.mapper, 0x41);
        assert_eq!(parsed.mirroring, Mirroring::Horizontal);
    }

    #[test]
    fn four_screen_overrides_mirroring_bit() {
        let parsed = Header::parse(&header(0b0000_1001, 0)).expect("header");
        assert_eq!(parsed.mirroring, Mirroring::FourScreen);
    }

    #[test]
    fn dirty_tail_masks_upper_mapper_nibble() {
        let mut bytes = header(0x10, 0x40);
        bytes[12..16].copy_from_slice(b"Dude");
        let parsed = Header::parse(&bytes).expect("header");
        assert_eq!(parsed.mapper, 1);
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        let mut bytes = header(0, 0);
        bytes[3] = 0;
        assert!(matches!(Header::parse(&bytes), Err(Error::InvalidMagic)));
        assert!(matches!(
            Header::parse(&bytes[..10]),
            Err(Error::TooShort { actual: 10 })
        ));
    }
}
