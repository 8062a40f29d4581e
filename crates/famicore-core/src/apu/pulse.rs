use super::{envelope::Envelope, length_counter::LengthCounter, tables::PULSE_DUTY_TABLE};

/// Which pulse unit a channel is. Only the sweep negate differs: pulse 1
/// subtracts in ones' complement, pulse 2 in two's complement.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PulseChannel {
    Pulse1,
    Pulse2,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
struct Sweep {
    enabled: bool,
    period: u8,
    negate: bool,
    shift: u8,
    divider: u8,
    reload: bool,
}

impl Sweep {
    fn configure(&mut self, value: u8) {
        self.enabled = value & 0x80 != 0;
        self.period = (value >> 4) & 0x07;
        self.negate = value & 0x08 != 0;
        self.shift = value & 0x07;
        self.reload = true;
    }
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pulse {
    channel: PulseChannel,
    duty: u8,
    sequence_step: u8,
    timer_period: u16,
    timer: u16,
    envelope: Envelope,
    length: LengthCounter,
    sweep: Sweep,
}

impl Pulse {
    pub(super) fn new(channel: PulseChannel) -> Self {
        Self {
            channel,
            duty: 0,
            sequence_step: 0,
            timer_period: 0,
            timer: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep: Sweep::default(),
        }
    }

    pub(super) fn write_control(&mut self, value: u8) {
        self.duty = (value >> 6) & 0x03;
        self.envelope.configure(value);
    }

    pub(super) fn write_sweep(&mut self, value: u8) {
        self.sweep.configure(value);
    }

    pub(super) fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x0700) | u16::from(value);
    }

    /// `$4003/$4007`: high timer bits, length load, sequencer and envelope
    /// restart.
    pub(super) fn write_timer_high(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
        self.length.load(value >> 3);
        self.sequence_step = 0;
        self.envelope.restart();
    }

    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub(super) fn length_active(&self) -> bool {
        self.length.active()
    }

    /// One APU cycle (two CPU cycles).
    pub(super) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.sequence_step = (self.sequence_step + 1) & 0x07;
        } else {
            self.timer -= 1;
        }
    }

    pub(super) fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock(self.envelope.halt_length());

        let target = self.sweep_target();
        if self.sweep.divider == 0
            && self.sweep.enabled
            && self.sweep.shift > 0
            && !self.sweep_mutes(target)
        {
            self.timer_period = target;
        }
        if self.sweep.divider == 0 || self.sweep.reload {
            self.sweep.divider = self.sweep.period;
            self.sweep.reload = false;
        } else {
            self.sweep.divider -= 1;
        }
    }

    fn sweep_target(&self) -> u16 {
        let delta = self.timer_period >> self.sweep.shift;
        if !self.sweep.negate {
            return self.timer_period + delta;
        }
        match self.channel {
            PulseChannel::Pulse1 => self.timer_period.wrapping_sub(delta + 1),
            PulseChannel::Pulse2 => self.timer_period.wrapping_sub(delta),
        }
    }

    /// Muting is evaluated continuously, even with the sweep unit disabled.
    fn sweep_mutes(&self, target: u16) -> bool {
        self.timer_period < 8 || (!self.sweep.negate && target > 0x07FF)
    }

    pub(super) fn output(&self) -> u8 {
        if !self.length.active() || self.sweep_mutes(self.sweep_target()) {
            return 0;
        }
        let high = PULSE_DUTY_TABLE[usize::from(self.duty)][usize::from(self.sequence_step)];
        high * self.envelope.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audible(channel: PulseChannel, period: u16) -> Pulse {
        let mut pulse = Pulse::new(channel);
        pulse.set_enabled(true);
        pulse.write_control(0b1011_1111);
        pulse.write_timer_low(period as u8);
        pulse.write_timer_high(0x08 | (period >> 8) as u8);
        pulse
    }

    #[test]
    fn negate_differs_between_units() {
        let mut p1 = audible(PulseChannel::Pulse1, 0x100);
        let mut p2 = audible(PulseChannel::Pulse2, 0x100);
        p1.write_sweep(0b1000_1001);
        p2.write_sweep(0b1000_1001);
        assert_eq!(p1.sweep_target(), 0x100 - 0x80 - 1);
        assert_eq!(p2.sweep_target(), 0x100 - 0x80);
    }

    #[test]
    fn short_periods_are_muted() {
        let mut pulse = audible(PulseChannel::Pulse2, 7);
        for _ in 0..16 {
            pulse.clock_timer();
            assert_eq!(pulse.output(), 0);
        }
    }

    #[test]
    fn sweep_overflow_mutes_without_sweep_enabled() {
        let mut pulse = audible(PulseChannel::Pulse1, 0x7F0);
        pulse.write_sweep(0b0000_0001);
        assert!(pulse.sweep_mutes(pulse.sweep_target()));
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn timer_steps_the_duty_sequence() {
        let mut pulse = audible(PulseChannel::Pulse1, 8);
        // Duty 2 (50%): steps 1-4 are high.
        let mut levels = Vec::new();
        for _ in 0..8 {
            for _ in 0..9 {
                pulse.clock_timer();
            }
            levels.push(pulse.output());
        }
        assert_eq!(levels, vec![15, 15, 15, 15, 0, 0, 0, 0]);
    }
}
