//! Standard NES controller (joypad) model.
//!
//! Implements the 8-button pad readable through `$4016/$4017`. The host
//! supplies an already-resolved bitmask per frame; how it was produced
//! (keyboard, gamepad, replay) is not the pad's concern.

/// Button ordering follows the NES shift register bit layout (A first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Bits of a `$4016/$4017` read that float (the rest are driven low).
pub const OPEN_BUS_MASK: u8 = 0xE0;

/// Serially-readable controller state with latch/strobe behavior.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controller {
    strobe: bool,
    shift: u8,
    buttons: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole button bitmask (bit 0 = A ... bit 7 = Right).
    pub fn set_buttons(&mut self, mask: u8) {
        self.buttons = mask;
        if self.strobe {
            self.shift = mask;
        }
    }

    /// Update a single button's pressed state.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let mask = if pressed {
            self.buttons | button.mask()
        } else {
            self.buttons & !button.mask()
        };
        self.set_buttons(mask);
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Writes to the `$4016` strobe bit (shared by both ports). The shift
    /// register reloads while strobe is high and keeps the last reload once
    /// it falls.
    pub fn write_strobe(&mut self, data: u8) {
        self.strobe = data & 0x01 != 0;
        if self.strobe {
            self.shift = self.buttons;
        }
    }

    /// Reads the next bit (in bit 0) and advances the shift register.
    ///
    /// While strobe is held high every read returns button A. After eight
    /// reads the register is empty and returns 1s.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 0x01;
        }
        let bit = self.shift & 0x01;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }

    /// The bit the next [`Controller::read`] would return.
    pub fn peek(&self) -> u8 {
        if self.strobe {
            self.buttons & 0x01
        } else {
            self.shift & 0x01
        }
    }
}
