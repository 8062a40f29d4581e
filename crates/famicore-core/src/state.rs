//! Whole-console snapshots.
//!
//! A [`SaveState`] bundles every component's state record. Records are plain
//! data; with the `savestate-serde` feature they derive serde traits and
//! `savestate-postcard` adds a compact binary encoding.

use thiserror::Error;

use crate::{
    apu::ApuState,
    cartridge::mapper::MapperState,
    clock::MasterClock,
    controller::Controller,
    cpu::CpuState,
    ppu::PpuState,
};

/// Bumped whenever a state record changes shape.
pub const FORMAT_VERSION: u32 = 1;

/// Reasons a snapshot cannot be taken or applied.
#[derive(Error, Debug)]
pub enum SaveStateError {
    #[error("no cartridge loaded")]
    NoCartridge,

    #[error("snapshot was taken with mapper {found}, cartridge uses mapper {expected}")]
    MapperMismatch { expected: u16, found: u16 },

    #[error("snapshot board {found} does not match cartridge board {expected}")]
    BoardMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("corrupt state: {0}")]
    Corrupt(&'static str),

    #[cfg(feature = "savestate-postcard")]
    #[error("failed to encode save state: {0}")]
    Encode(postcard::Error),

    #[cfg(feature = "savestate-postcard")]
    #[error("failed to decode save state: {0}")]
    Decode(postcard::Error),
}

/// Compatibility header checked before anything is applied.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub format_version: u32,
    pub mapper_id: u16,
    /// Frames completed when the snapshot was taken.
    pub frame: u64,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    pub meta: SnapshotMeta,
    pub clock: MasterClock,
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub apu: ApuState,
    pub mapper: MapperState,
    pub controllers: [Controller; 2],
    /// 2 KiB console work RAM.
    pub ram: Vec<u8>,
    pub open_bus: u8,
    pub oam_dma_request: Option<u8>,
}

#[cfg(feature = "savestate-postcard")]
impl SaveState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveStateError> {
        postcard::to_allocvec(self).map_err(SaveStateError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SaveStateError> {
        postcard::from_bytes(bytes).map_err(SaveStateError::Decode)
    }
}
