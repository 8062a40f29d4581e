use super::{envelope::Envelope, length_counter::LengthCounter, tables::NOISE_PERIOD_TABLE};

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Noise {
    envelope: Envelope,
    length: LengthCounter,
    /// Short mode taps bit 6 instead of bit 1.
    short_mode: bool,
    timer_period: u16,
    timer: u16,
    shift: u16,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            short_mode: false,
            timer_period: NOISE_PERIOD_TABLE[0] - 1,
            timer: 0,
            shift: 1,
        }
    }
}

impl Noise {
    pub(super) fn write_control(&mut self, value: u8) {
        self.envelope.configure(value);
    }

    pub(super) fn write_period(&mut self, value: u8) {
        self.short_mode = value & 0x80 != 0;
        self.timer_period = NOISE_PERIOD_TABLE[usize::from(value & 0x0F)] - 1;
    }

    pub(super) fn write_length(&mut self, value: u8) {
        self.length.load(value >> 3);
        self.envelope.restart();
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    /// Runs every CPU cycle.
    pub(super) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            let tap = if self.short_mode { 6 } else { 1 };
            let feedback = (self.shift ^ (self.shift >> tap)) & 0x01;
            self.shift = (self.shift >> 1) | (feedback << 14);
        } else {
            self.timer -= 1;
        }
    }

    pub(super) fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock(self.envelope.halt_length());
    }

    pub(super) fn output(&self) -> u8 {
        if !self.length.active() || self.shift & 0x01 != 0 {
            0
        } else {
            self.envelope.output()
        }
    }
}
