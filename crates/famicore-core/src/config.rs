use core::fmt;

use crate::ppu::palette::Palette;

/// NTSC CPU clock in Hz.
pub const CPU_CLOCK_NTSC: f64 = 1_789_773.0;
/// NTSC frame rate (CPU clock / 29780.5 cycles per frame).
pub const FRAME_RATE_NTSC: f64 = CPU_CLOCK_NTSC / 29_780.5;

/// MMC1 silicon revision.
///
/// The revisions differ in how the work RAM enable is wired: MMC1A always
/// enables `$6000-$7FFF`, MMC1B uses bit 4 of the PRG bank register as an
/// active-low enable.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mmc1Revision {
    A,
    #[default]
    B,
}

impl fmt::Display for Mmc1Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mmc1Revision::A => "mmc1a",
            Mmc1Revision::B => "mmc1b",
        };
        f.write_str(s)
    }
}

/// Host-facing settings for one console instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Output PCM rate; `post_frame` resamples to `sample_rate / 60.0988`.
    pub sample_rate: u32,
    /// Number of retired instructions kept in the trace ring (0 disables it).
    pub trace_capacity: usize,
    pub mmc1_revision: Mmc1Revision,
    pub palette: Palette,
}

impl Config {
    /// PCM samples produced per emulated frame at the configured rate.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as f64 / FRAME_RATE_NTSC).round() as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            trace_capacity: 0,
            mmc1_revision: Mmc1Revision::default(),
            palette: Palette::default(),
        }
    }
}
