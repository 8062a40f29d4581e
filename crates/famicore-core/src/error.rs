use thiserror::Error;

use crate::cartridge::header::HEADER_LEN;

/// Errors raised while turning a ROM image into a running cartridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte header.
    #[error("header expected {HEADER_LEN} bytes, got {actual}")]
    TooShort { actual: usize },

    /// Magic number (`NES<EOF>`) is missing.
    #[error("missing NES magic bytes")]
    InvalidMagic,

    /// A ROM section (trainer/PRG/CHR) is shorter than the header advertises.
    #[error("{section} section expected {expected} bytes, got {actual}")]
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The header names a mapper board this core does not emulate.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),

    #[error("i/o error while reading cartridge: {0}")]
    Io(#[from] std::io::Error),
}
