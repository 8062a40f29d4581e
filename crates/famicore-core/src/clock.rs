//! Master clock divider.
//!
//! The NTSC master clock runs at 21.477 MHz. The CPU sees one cycle every 12
//! master ticks, the PPU one dot every 4 and the APU one cycle every 24.
//! Instead of stepping single master ticks, [`MasterClock::advance`] jumps
//! straight to the next counter expiry; the components that fire together on
//! one tick are reported together and stepped in a fixed order by the
//! console.

pub const CPU_DIVIDER: u8 = 12;
pub const PPU_DIVIDER: u8 = 4;
pub const APU_DIVIDER: u8 = 24;

/// Components due on the current master tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockEvents {
    pub cpu: bool,
    pub ppu: bool,
    pub apu: bool,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MasterClock {
    cpu: u8,
    ppu: u8,
    apu: u8,
    /// Master ticks since power-on.
    ticks: u64,
}

impl Default for MasterClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterClock {
    pub const fn new() -> Self {
        Self {
            cpu: CPU_DIVIDER,
            ppu: PPU_DIVIDER,
            apu: APU_DIVIDER,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Moves to the next master tick on which at least one counter expires
    /// and reloads the expired counters.
    pub fn advance(&mut self) -> ClockEvents {
        let step = self.cpu.min(self.ppu).min(self.apu);
        self.ticks += u64::from(step);

        let fire = |counter: &mut u8, period: u8| {
            *counter -= step;
            if *counter == 0 {
                *counter = period;
                true
            } else {
                false
            }
        };
        ClockEvents {
            cpu: fire(&mut self.cpu, CPU_DIVIDER),
            ppu: fire(&mut self.ppu, PPU_DIVIDER),
            apu: fire(&mut self.apu, APU_DIVIDER),
        }
    }
}
