//! Envelope unit shared by pulse and noise channels.

// `--LC VVVV`; the loop bit also halts the length counter.
const LOOP: u8 = 0x20;
const CONSTANT: u8 = 0x10;

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Envelope {
    /// Last `$4000/$4004/$400C` value, low six bits.
    reg: u8,
    start: bool,
    divider: u8,
    level: u8,
}

impl Envelope {
    pub(super) fn configure(&mut self, value: u8) {
        self.reg = value & 0x3F;
    }

    pub(super) fn restart(&mut self) {
        self.start = true;
    }

    fn period(&self) -> u8 {
        self.reg & 0x0F
    }

    /// Quarter-frame clock.
    pub(super) fn clock(&mut self) {
        if std::mem::take(&mut self.start) {
            self.level = 15;
            self.divider = self.period();
        } else if let Some(next) = self.divider.checked_sub(1) {
            self.divider = next;
        } else {
            self.divider = self.period();
            self.level = match self.level {
                0 if self.halt_length() => 15,
                0 => 0,
                level => level - 1,
            };
        }
    }

    pub(super) fn output(&self) -> u8 {
        if self.reg & CONSTANT != 0 {
            self.period()
        } else {
            self.level
        }
    }

    /// The loop flag doubles as the length counter halt flag.
    pub(super) fn halt_length(&self) -> bool {
        self.reg & LOOP != 0
    }
}
