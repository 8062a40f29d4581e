//! Debounced edge detector for PPU address line A12.
//!
//! Scanline counters (MMC3) clock on A12 rising edges. During sprite fetches
//! the PPU bounces A12 between pattern reads and garbage nametable reads a few
//! dots apart, and the cartridge's filter ignores those short lows. The
//! watcher only reports a rise when A12 stayed low for more than
//! `MIN_LOW_DOTS` dots beforehand.

/// Transition reported by [`A12Watcher::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A12Edge {
    None,
    /// Low to high after a long enough low period.
    Rise,
    /// High to low.
    Fall,
}

/// Minimum low time (in PPU dots, exclusive) before a rise counts.
pub const MIN_LOW_DOTS: u64 = 10;

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct A12Watcher {
    last_dot: u64,
    /// Dots spent low so far; 0 while A12 is high.
    low_dots: u64,
}

impl A12Watcher {
    pub const fn new() -> Self {
        Self {
            last_dot: 0,
            low_dots: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Observes the PPU address bus at `ppu_dot`, a dot count that only
    /// moves forward while the console runs.
    pub fn update(&mut self, addr: u16, ppu_dot: u64) -> A12Edge {
        if self.low_dots > 0 {
            let elapsed = ppu_dot.saturating_sub(self.last_dot);
            self.low_dots = self.low_dots.saturating_add(elapsed);
        }
        self.last_dot = ppu_dot;

        if addr & 0x1000 == 0 {
            if self.low_dots == 0 {
                self.low_dots = 1;
                return A12Edge::Fall;
            }
            A12Edge::None
        } else {
            let long_enough = self.low_dots > MIN_LOW_DOTS;
            let was_low = self.low_dots > 0;
            self.low_dots = 0;
            match (was_low, long_enough) {
                (true, true) => A12Edge::Rise,
                _ => A12Edge::None,
            }
        }
    }
}
