//! Shared length counter used by pulse, triangle, and noise channels.

use super::tables::LENGTH_TABLE;

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LengthCounter {
    value: u8,
    enabled: bool,
}

impl LengthCounter {
    /// `$4015` channel enable; disabling clears the counter at once.
    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }

    pub(super) fn active(&self) -> bool {
        self.value > 0
    }

    /// Loads from the table; ignored while the channel is disabled.
    pub(super) fn load(&mut self, index: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[usize::from(index & 0x1F)];
        }
    }

    /// Half-frame clock.
    pub(super) fn clock(&mut self, halt: bool) {
        if self.value > 0 && !halt {
            self.value -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_only_when_enabled() {
        let mut length = LengthCounter::default();
        length.load(1);
        assert!(!length.active());

        length.set_enabled(true);
        length.load(3);
        assert_eq!(length.value, 2);
        length.clock(true);
        assert_eq!(length.value, 2);
        length.clock(false);
        length.clock(false);
        length.clock(false);
        assert!(!length.active());
    }
}
