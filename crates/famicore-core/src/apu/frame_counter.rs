//! Frame sequencer clocking envelopes, linear counters, length counters and
//! sweeps at quarter- and half-frame points.

/// Frame sequencer timing mode.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameCounterMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Units to clock on this CPU cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct FrameTick {
    pub(super) quarter: bool,
    pub(super) half: bool,
    pub(super) irq: bool,
}

const QUARTER: FrameTick = FrameTick {
    quarter: true,
    half: false,
    irq: false,
};
const HALF: FrameTick = FrameTick {
    quarter: true,
    half: true,
    irq: false,
};
const IRQ: FrameTick = FrameTick {
    quarter: false,
    half: false,
    irq: true,
};
const HALF_IRQ: FrameTick = FrameTick {
    quarter: true,
    half: true,
    irq: true,
};
const NONE: FrameTick = FrameTick {
    quarter: false,
    half: false,
    irq: false,
};

/// NTSC timeline in CPU cycles since the sequence start. The last entry
/// doubles as cycle 0 of the next sequence.
#[rustfmt::skip]
const FOUR_STEP: [(u32, FrameTick); 6] = [
    (7457, QUARTER), (14913, HALF), (22371, QUARTER),
    (29828, IRQ), (29829, HALF_IRQ), (29830, IRQ),
];

#[rustfmt::skip]
const FIVE_STEP: [(u32, FrameTick); 6] = [
    (7457, QUARTER), (14913, HALF), (22371, QUARTER),
    (29829, NONE), (37281, HALF), (37282, NONE),
];

/// Delay before the implicit `$4017` write after power or reset applies.
const RESET_WRITE_DELAY: u8 = 3;

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PendingWrite {
    value: u8,
    delay: u8,
    /// CPU writes selecting 5-step mode clock the units when applied; the
    /// implicit reset write does not.
    from_cpu: bool,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameCounter {
    mode: FrameCounterMode,
    irq_inhibit: bool,
    /// CPU cycles since the sequence started.
    cycle: u32,
    step: u8,
    /// Last value written to `$4017`.
    value: u8,
    pending: Option<PendingWrite>,
}

impl FrameCounter {
    pub(super) fn mode(&self) -> FrameCounterMode {
        self.mode
    }

    /// `$4017` write: the new mode lands 3 CPU cycles later on odd cycles
    /// and 4 on even ones.
    pub(super) fn write(&mut self, value: u8, odd_cycle: bool) {
        self.value = value;
        self.pending = Some(PendingWrite {
            value,
            delay: if odd_cycle { 3 } else { 4 },
            from_cpu: true,
        });
    }

    /// Re-applies the last written value as after a console reset.
    pub(super) fn reapply(&mut self) {
        self.pending = Some(PendingWrite {
            value: self.value,
            delay: RESET_WRITE_DELAY,
            from_cpu: false,
        });
    }

    /// Advances one CPU cycle.
    pub(super) fn clock(&mut self) -> FrameTick {
        if let Some(pending) = self.pending.as_mut() {
            pending.delay -= 1;
            if pending.delay == 0 {
                let pending = *pending;
                self.pending = None;
                return self.apply(pending);
            }
        }

        self.cycle += 1;
        let table = match self.mode {
            FrameCounterMode::FourStep => &FOUR_STEP,
            FrameCounterMode::FiveStep => &FIVE_STEP,
        };
        let (at, mut tick) = table[usize::from(self.step)];
        if self.cycle != at {
            return NONE;
        }

        self.step += 1;
        if usize::from(self.step) == table.len() {
            self.step = 0;
            self.cycle = 0;
        }
        tick.irq &= !self.irq_inhibit;
        tick
    }

    fn apply(&mut self, pending: PendingWrite) -> FrameTick {
        self.mode = if pending.value & 0x80 != 0 {
            FrameCounterMode::FiveStep
        } else {
            FrameCounterMode::FourStep
        };
        self.irq_inhibit = pending.value & 0x40 != 0;
        self.cycle = 0;
        self.step = 0;

        if pending.from_cpu && self.mode == FrameCounterMode::FiveStep {
            HALF
        } else {
            NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(counter: &mut FrameCounter, cycles: u32) -> Vec<(u32, FrameTick)> {
        (1..=cycles)
            .filter_map(|n| {
                let tick = counter.clock();
                (tick != NONE).then_some((n, tick))
            })
            .collect()
    }

    #[test]
    fn four_step_timeline() {
        let mut counter = FrameCounter::default();
        let ticks = run(&mut counter, 29830 + 7457);
        let at: Vec<u32> = ticks.iter().map(|(n, _)| *n).collect();
        assert_eq!(at, vec![7457, 14913, 22371, 29828, 29829, 29830, 29830 + 7457]);
        assert_eq!(ticks[4].1, HALF_IRQ);
    }

    #[test]
    fn five_step_write_clocks_when_applied() {
        let mut counter = FrameCounter::default();
        counter.write(0xC0, true);
        let ticks = run(&mut counter, 3 + 37282);
        assert_eq!(ticks[0], (3, HALF));
        let at: Vec<u32> = ticks.iter().map(|(n, _)| *n - 3).collect();
        assert_eq!(at, vec![0, 7457, 14913, 22371, 37281]);
        assert!(ticks.iter().all(|(_, tick)| !tick.irq));
    }

    #[test]
    fn write_delay_depends_on_parity() {
        let mut counter = FrameCounter::default();
        counter.write(0x80, false);
        assert_eq!(run(&mut counter, 4), vec![(4, HALF)]);

        counter.reapply();
        assert_eq!(run(&mut counter, 4), vec![]);
        assert_eq!(counter.mode(), FrameCounterMode::FiveStep);
    }
}
