use std::{fs, path::Path};

use tracing::debug;

use crate::{
    cartridge::header::{HEADER_LEN, Header},
    error::Error,
};

pub const TRAINER_SIZE: usize = 512;

pub mod a12_watcher;
pub mod header;
pub mod mapper;

pub use header::Mirroring;
pub use mapper::{Mapper, MapperState};

/// An iNES image split into its sections. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct Rom {
    pub(crate) header: Header,
    pub(crate) prg_rom: Box<[u8]>,
    pub(crate) chr_rom: Box<[u8]>,
    pub(crate) trainer: Option<Box<[u8]>>,
}

impl Rom {
    /// Parses an in-memory `.nes` image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let header = Header::parse(bytes)?;
        let mut cursor = HEADER_LEN;
        let trainer = if header.trainer {
            Some(section(bytes, &mut cursor, TRAINER_SIZE, "trainer")?)
        } else {
            None
        };
        let prg_rom = section(bytes, &mut cursor, header.prg_rom_size, "PRG ROM")?;
        let chr_rom = section(bytes, &mut cursor, header.chr_rom_size, "CHR ROM")?;

        debug!(
            mapper = header.mapper,
            prg = prg_rom.len(),
            chr = chr_rom.len(),
            mirroring = ?header.mirroring,
            battery = header.battery,
            "cartridge parsed"
        );

        Ok(Self {
            header,
            prg_rom,
            chr_rom,
            trainer,
        })
    }

    /// Reads and parses a `.nes` file from disk.
    pub fn from_file<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapper_id(&self) -> u16 {
        self.header.mapper
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    /// `true` when the board supplies CHR RAM instead of CHR ROM.
    pub fn has_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    /// CRC-32 of PRG followed by CHR, the usual game-database key.
    pub fn crc32(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.prg_rom);
        hasher.update(&self.chr_rom);
        hasher.finalize()
    }
}

fn section(
    bytes: &[u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<Box<[u8]>, Error> {
    if len == 0 {
        return Ok(Box::default());
    }

    let too_short = || Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    };
    let end = cursor.checked_add(len).ok_or_else(too_short)?;
    let slice = bytes.get(*cursor..end).ok_or_else(too_short)?;

    *cursor = end;
    Ok(slice.into())
}
