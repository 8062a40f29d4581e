//! Non-linear analog mixer approximation.

/// Raw channel levels for one APU cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct ChannelLevels {
    pub(super) pulse1: u8,
    pub(super) pulse2: u8,
    pub(super) triangle: u8,
    pub(super) noise: u8,
    pub(super) dmc: u8,
}

impl ChannelLevels {
    /// Combined output in `0.0..=1.0`.
    pub(super) fn mix(self) -> f32 {
        let pulse_sum = f32::from(self.pulse1) + f32::from(self.pulse2);
        let pulse = if pulse_sum == 0.0 {
            0.0
        } else {
            95.88 / (8128.0 / pulse_sum + 100.0)
        };

        let tnd_sum = f32::from(self.triangle) / 8227.0
            + f32::from(self.noise) / 12241.0
            + f32::from(self.dmc) / 22638.0;
        let tnd = if tnd_sum == 0.0 {
            0.0
        } else {
            159.79 / (1.0 / tnd_sum + 100.0)
        };

        pulse + tnd
    }

    pub(super) fn sample(self) -> i16 {
        (self.mix() * f32::from(i16::MAX)).round() as i16
    }
}
