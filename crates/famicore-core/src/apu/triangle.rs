use super::{length_counter::LengthCounter, tables::TRIANGLE_SEQUENCE};

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    /// Control flag: halts the length counter and keeps the linear counter
    /// reloading.
    control: bool,
    linear_reload_value: u8,
    linear_counter: u8,
    linear_reload: bool,
    timer_period: u16,
    timer: u16,
    sequence_step: u8,
    length: LengthCounter,
}

impl Triangle {
    pub(super) fn write_linear(&mut self, value: u8) {
        self.control = value & 0x80 != 0;
        self.linear_reload_value = value & 0x7F;
    }

    pub(super) fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x0700) | u16::from(value);
    }

    pub(super) fn write_timer_high(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
        self.length.load(value >> 3);
        self.linear_reload = true;
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    /// Runs every CPU cycle. Periods below 2 would produce ultrasonic
    /// output and freeze the sequencer instead.
    pub(super) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            if self.length.active() && self.linear_counter > 0 && self.timer_period >= 2 {
                self.sequence_step = (self.sequence_step + 1) & 0x1F;
            }
        } else {
            self.timer -= 1;
        }
    }

    pub(super) fn clock_quarter_frame(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_reload_value;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock(self.control);
    }

    pub(super) fn output(&self) -> u8 {
        TRIANGLE_SEQUENCE[usize::from(self.sequence_step)]
    }
}
