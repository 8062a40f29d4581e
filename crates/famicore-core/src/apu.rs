//! Audio processing unit.
//!
//! Five sound generators (two pulses, triangle, noise, DMC) sit behind the
//! `$4000-$4017` registers. [`Apu::cpu_clock`] runs every CPU cycle and drives
//! the triangle, noise and DMC timers together with the frame sequencer;
//! [`Apu::run_cycle`] runs every other CPU cycle, steps the pulse timers and
//! mixes one sample into a fixed-size accumulator. At the end of a frame
//! [`Apu::post_frame`] resamples the accumulator to the host's per-frame
//! sample count.

mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod mixer;
mod noise;
mod pulse;
mod tables;
mod triangle;

use core::fmt;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::{config::Config, memory::apu::Register};

pub use frame_counter::FrameCounterMode;

use dmc::Dmc;
use frame_counter::{FrameCounter, FrameTick};
use mixer::ChannelLevels;
use noise::Noise;
use pulse::{Pulse, PulseChannel};
use triangle::Triangle;

/// Samples the accumulator can hold; one NTSC frame produces about 14900.
pub const ACCUMULATOR_SIZE: usize = 16_384;

bitflags! {
    /// `$4015` read layout. Bit 5 is open bus and filled in by the bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ApuStatus: u8 {
        const PULSE1 = 0x01;
        const PULSE2 = 0x02;
        const TRIANGLE = 0x04;
        const NOISE = 0x08;
        const DMC = 0x10;
        const FRAME_IRQ = 0x40;
        const DMC_IRQ = 0x80;
    }
}

/// Serializable APU registers and channel state. The sample accumulator is
/// output, not state, and is rebuilt every frame.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApuState {
    pub pulse: [Pulse; 2],
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    pub frame_counter: FrameCounter,
    pub frame_irq: bool,
    pub cycles: u64,
}

#[derive(Clone)]
pub struct Apu {
    pulse: [Pulse; 2],
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,
    frame_irq: bool,
    /// CPU cycles seen since power; its parity times `$4015`/`$4017` writes.
    cycles: u64,
    accumulator: Box<[i16]>,
    accumulated: usize,
    output: Vec<i16>,
}

impl fmt::Debug for Apu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apu")
            .field("frame_counter", &self.frame_counter)
            .field("frame_irq", &self.frame_irq)
            .field("dmc_irq", &self.dmc.irq_flag)
            .field("cycles", &self.cycles)
            .field("accumulated", &self.accumulated)
            .finish()
    }
}

impl Apu {
    pub fn new(config: &Config) -> Self {
        Self {
            pulse: [
                Pulse::new(PulseChannel::Pulse1),
                Pulse::new(PulseChannel::Pulse2),
            ],
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_counter: FrameCounter::default(),
            frame_irq: false,
            cycles: 0,
            accumulator: vec![0; ACCUMULATOR_SIZE].into_boxed_slice(),
            accumulated: 0,
            output: Vec::with_capacity(config.samples_per_frame()),
        }
    }

    /// Power-on state: every channel cleared and `$4017 = $00` applied
    /// shortly after.
    pub fn power(&mut self) {
        self.pulse = [
            Pulse::new(PulseChannel::Pulse1),
            Pulse::new(PulseChannel::Pulse2),
        ];
        self.triangle = Triangle::default();
        self.noise = Noise::default();
        self.dmc = Dmc::default();
        self.frame_counter = FrameCounter::default();
        self.frame_counter.reapply();
        self.frame_irq = false;
        self.cycles = 0;
        self.accumulated = 0;
        self.output.clear();
        debug!("apu power");
    }

    /// Warm reset: all channels silenced and the last `$4017` value
    /// re-applied.
    pub fn reset(&mut self) {
        for pulse in &mut self.pulse {
            pulse.set_enabled(false);
        }
        self.triangle.set_enabled(false);
        self.noise.set_enabled(false);
        self.dmc = Dmc::default();
        self.frame_irq = false;
        self.frame_counter.reapply();
        debug!("apu reset");
    }

    /// Register write for `$4000-$4013`, `$4015` and `$4017`.
    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        let Some(register) = Register::from_cpu_addr(addr) else {
            return;
        };
        match register {
            Register::Pulse1Control => self.pulse[0].write_control(value),
            Register::Pulse1Sweep => self.pulse[0].write_sweep(value),
            Register::Pulse1TimerLow => self.pulse[0].write_timer_low(value),
            Register::Pulse1TimerHigh => self.pulse[0].write_timer_high(value),
            Register::Pulse2Control => self.pulse[1].write_control(value),
            Register::Pulse2Sweep => self.pulse[1].write_sweep(value),
            Register::Pulse2TimerLow => self.pulse[1].write_timer_low(value),
            Register::Pulse2TimerHigh => self.pulse[1].write_timer_high(value),
            Register::TriangleControl => self.triangle.write_linear(value),
            Register::TriangleTimerLow => self.triangle.write_timer_low(value),
            Register::TriangleTimerHigh => self.triangle.write_timer_high(value),
            Register::NoiseControl => self.noise.write_control(value),
            Register::NoisePeriod => self.noise.write_period(value),
            Register::NoiseLength => self.noise.write_length(value),
            Register::DmcControl => self.dmc.write_control(value),
            Register::DmcDirectLoad => self.dmc.write_direct_load(value),
            Register::DmcSampleAddress => self.dmc.write_sample_address(value),
            Register::DmcSampleLength => self.dmc.write_sample_length(value),
            Register::TriangleUnused | Register::NoiseUnused => {}
            Register::Status => self.write_status(value),
            Register::FrameCounter => {
                if value & 0x40 != 0 {
                    self.frame_irq = false;
                }
                self.frame_counter.write(value, self.odd_cycle());
                trace!(
                    value = format_args!("{value:#04X}"),
                    mode = ?self.frame_counter.mode(),
                    "frame counter write"
                );
            }
        }
    }

    fn write_status(&mut self, value: u8) {
        let enable = ApuStatus::from_bits_truncate(value);
        self.pulse[0].set_enabled(enable.contains(ApuStatus::PULSE1));
        self.pulse[1].set_enabled(enable.contains(ApuStatus::PULSE2));
        self.triangle.set_enabled(enable.contains(ApuStatus::TRIANGLE));
        self.noise.set_enabled(enable.contains(ApuStatus::NOISE));
        self.dmc
            .set_enabled(enable.contains(ApuStatus::DMC), self.odd_cycle());
        self.dmc.irq_flag = false;
    }

    /// `$4015` read. Clears the frame interrupt flag.
    pub fn read_status(&mut self) -> u8 {
        let value = self.peek_status();
        self.frame_irq = false;
        value
    }

    /// `$4015` without side effects.
    pub fn peek_status(&self) -> u8 {
        let mut status = ApuStatus::empty();
        status.set(ApuStatus::PULSE1, self.pulse[0].length_active());
        status.set(ApuStatus::PULSE2, self.pulse[1].length_active());
        status.set(ApuStatus::TRIANGLE, self.triangle.length_active());
        status.set(ApuStatus::NOISE, self.noise.length_active());
        status.set(ApuStatus::DMC, self.dmc.active());
        status.set(ApuStatus::FRAME_IRQ, self.frame_irq);
        status.set(ApuStatus::DMC_IRQ, self.dmc.irq_flag);
        status.bits()
    }

    fn odd_cycle(&self) -> bool {
        self.cycles & 1 == 1
    }

    /// One CPU cycle.
    pub fn cpu_clock(&mut self) {
        self.triangle.clock_timer();
        self.noise.clock_timer();
        self.dmc.clock();

        let tick = self.frame_counter.clock();
        self.apply_frame_tick(tick);
        self.cycles += 1;
    }

    fn apply_frame_tick(&mut self, tick: FrameTick) {
        if tick.quarter {
            for pulse in &mut self.pulse {
                pulse.clock_quarter_frame();
            }
            self.triangle.clock_quarter_frame();
            self.noise.clock_quarter_frame();
        }
        if tick.half {
            for pulse in &mut self.pulse {
                pulse.clock_half_frame();
            }
            self.triangle.clock_half_frame();
            self.noise.clock_half_frame();
        }
        if tick.irq {
            self.frame_irq = true;
        }
    }

    /// One APU cycle (every other CPU cycle).
    pub fn run_cycle(&mut self) {
        for pulse in &mut self.pulse {
            pulse.clock_timer();
        }

        if self.accumulated < self.accumulator.len() {
            self.accumulator[self.accumulated] = self.levels().sample();
            self.accumulated += 1;
        }
    }

    fn levels(&self) -> ChannelLevels {
        ChannelLevels {
            pulse1: self.pulse[0].output(),
            pulse2: self.pulse[1].output(),
            triangle: self.triangle.output(),
            noise: self.noise.output(),
            dmc: self.dmc.output(),
        }
    }

    /// DMC fetch address the CPU should service, reported once per fetch.
    pub fn take_dmc_request(&mut self) -> Option<u16> {
        self.dmc.take_request()
    }

    /// Byte read by the CPU for the pending DMC fetch.
    pub fn dmc_fetched(&mut self, value: u8) {
        self.dmc.finish_fetch(value);
    }

    pub fn frame_irq(&self) -> bool {
        self.frame_irq
    }

    pub fn dmc_irq(&self) -> bool {
        self.dmc.irq_flag
    }

    /// Starts a new video frame: the accumulator is emptied.
    pub fn pre_frame(&mut self) {
        self.accumulated = 0;
    }

    /// Ends a video frame, resampling the accumulated samples down to
    /// `sample_count` by nearest source index.
    pub fn post_frame(&mut self, sample_count: usize) {
        self.output.clear();
        if self.accumulated == 0 {
            self.output.resize(sample_count, 0);
            return;
        }
        let source = &self.accumulator[..self.accumulated];
        self.output.extend(
            (0..sample_count).map(|i| source[i * source.len() / sample_count]),
        );
    }

    /// Samples produced by the last [`Apu::post_frame`].
    pub fn samples(&self) -> &[i16] {
        &self.output
    }

    /// Raw samples mixed since the last [`Apu::pre_frame`].
    pub fn accumulated(&self) -> &[i16] {
        &self.accumulator[..self.accumulated]
    }

    pub fn save_state(&self) -> ApuState {
        ApuState {
            pulse: self.pulse,
            triangle: self.triangle,
            noise: self.noise,
            dmc: self.dmc,
            frame_counter: self.frame_counter,
            frame_irq: self.frame_irq,
            cycles: self.cycles,
        }
    }

    pub fn load_state(&mut self, state: &ApuState) {
        self.pulse = state.pulse;
        self.triangle = state.triangle;
        self.noise = state.noise;
        self.dmc = state.dmc;
        self.frame_counter = state.frame_counter;
        self.frame_irq = state.frame_irq;
        self.cycles = state.cycles;
        self.accumulated = 0;
        self.output.clear();
    }
}
