//! CPU data bus latch.
//!
//! The 2A03 data bus floats when nothing drives it. Reads from write-only or
//! unmapped addresses return whatever value was last on the bus.

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OpenBus {
    value: u8,
}

impl OpenBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.value = 0;
    }

    /// Current floating value.
    pub(crate) fn sample(&self) -> u8 {
        self.value
    }

    /// Records a value that was just driven onto the bus.
    pub(crate) fn latch(&mut self, value: u8) {
        self.value = value;
    }

    /// Combines driven bits (outside `mask`) with floating bits (inside it).
    pub(crate) fn apply_masked(&self, mask: u8, value: u8) -> u8 {
        (value & !mask) | (self.value & mask)
    }
}
