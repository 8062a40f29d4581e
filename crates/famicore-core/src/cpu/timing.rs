//! Reference cycle counts for every opcode, used to check the stepper.

/// Published cycle count of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Timing {
    Fixed(u8),
    /// One extra cycle when the indexed address crosses a page.
    PageCross(u8),
    /// One extra cycle when taken, two when the target is on another page.
    Branch(u8),
}

const fn f(cycles: u8) -> Timing {
    Timing::Fixed(cycles)
}

const fn p(cycles: u8) -> Timing {
    Timing::PageCross(cycles)
}

const fn b(cycles: u8) -> Timing {
    Timing::Branch(cycles)
}

impl Timing {
    pub(crate) const fn base(self) -> usize {
        match self {
            Timing::Fixed(c) | Timing::PageCross(c) | Timing::Branch(c) => c as usize,
        }
    }

    pub(crate) const fn total_cycles(self, page_crossed: bool, branch_taken: bool) -> usize {
        match self {
            Timing::Fixed(_) => self.base(),
            Timing::PageCross(_) => self.base() + page_crossed as usize,
            Timing::Branch(_) if branch_taken => self.base() + 1 + page_crossed as usize,
            Timing::Branch(_) => self.base(),
        }
    }
}

/// JAM opcodes never finish and are listed as 0.
#[rustfmt::skip]
pub(crate) static CYCLE_TABLE: [Timing; 256] = [
    f(7), f(6), f(0), f(8), f(3), f(3), f(5), f(5), f(3), f(2), f(2), f(2), f(4), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
    f(6), f(6), f(0), f(8), f(3), f(3), f(5), f(5), f(4), f(2), f(2), f(2), f(4), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
    f(6), f(6), f(0), f(8), f(3), f(3), f(5), f(5), f(3), f(2), f(2), f(2), f(3), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
    f(6), f(6), f(0), f(8), f(3), f(3), f(5), f(5), f(4), f(2), f(2), f(2), f(5), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
    f(2), f(6), f(2), f(6), f(3), f(3), f(3), f(3), f(2), f(2), f(2), f(2), f(4), f(4), f(4), f(4),
    b(2), f(6), f(0), f(6), f(4), f(4), f(4), f(4), f(2), f(5), f(2), f(5), f(5), f(5), f(5), f(5),
    f(2), f(6), f(2), f(6), f(3), f(3), f(3), f(3), f(2), f(2), f(2), f(2), f(4), f(4), f(4), f(4),
    b(2), p(5), f(0), p(5), f(4), f(4), f(4), f(4), f(2), p(4), f(2), p(4), p(4), p(4), p(4), p(4),
    f(2), f(6), f(2), f(8), f(3), f(3), f(5), f(5), f(2), f(2), f(2), f(2), f(4), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
    f(2), f(6), f(2), f(8), f(3), f(3), f(5), f(5), f(2), f(2), f(2), f(2), f(4), f(4), f(6), f(6),
    b(2), p(5), f(0), f(8), f(4), f(4), f(6), f(6), f(2), p(4), f(2), f(7), p(4), p(4), f(7), f(7),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{Kind, OPCODES};

    #[test]
    fn zero_entries_are_exactly_the_jams() {
        for (opcode, timing) in CYCLE_TABLE.iter().enumerate() {
            assert_eq!(
                timing.base() == 0,
                OPCODES[opcode].kind() == Kind::Jam,
                "opcode {opcode:#04X}"
            );
        }
    }

    #[test]
    fn branch_penalties_stack() {
        let beq = CYCLE_TABLE[0xF0];
        assert_eq!(beq.total_cycles(false, false), 2);
        assert_eq!(beq.total_cycles(false, true), 3);
        assert_eq!(beq.total_cycles(true, true), 4);
    }
}
