use bitflags::bitflags;

bitflags! {
    /// The 6502 processor status register (P).
    ///
    /// Bit layout:
    /// 7 6 5 4 3 2 1 0
    /// N V _ B D I Z C
    ///
    /// Only six bits are real flip-flops. `B` and bit 5 exist only in the
    /// byte pushed to the stack; the register itself always reads bit 5 as
    /// set and never holds `B`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry out of bit 7, or no borrow on subtraction.
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        /// Masks IRQs while set.
        const INTERRUPT = 0b0000_0100;
        /// Stored but ignored by the 2A03's ALU.
        const DECIMAL   = 0b0000_1000;
        /// Pushed by `BRK`/`PHP`, clear when an interrupt pushes P.
        const BREAK     = 0b0001_0000;
        const UNUSED    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Power-on value: interrupts masked.
    pub const fn power_on() -> Self {
        Status::from_bits_retain(Status::INTERRUPT.bits() | Status::UNUSED.bits())
    }

    /// Loads a byte pulled from the stack (`PLP`/`RTI`).
    pub fn from_stack(byte: u8) -> Self {
        (Status::from_bits_retain(byte) - Status::BREAK) | Status::UNUSED
    }

    /// Byte pushed to the stack; `brk` selects the B bit.
    pub fn to_stack(self, brk: bool) -> u8 {
        let mut pushed = self | Status::UNUSED;
        pushed.set(Status::BREAK, brk);
        pushed.bits()
    }

    pub fn set_zn(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    #[inline]
    pub fn carry(self) -> u8 {
        (self.contains(Status::CARRY)) as u8
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::power_on()
    }
}
