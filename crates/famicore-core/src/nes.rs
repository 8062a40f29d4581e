//! The console: master clock, CPU, PPU, APU, controllers and cartridge.
//!
//! [`Nes`] owns every component and steps them from the [`MasterClock`].
//! Inside one master tick the order is fixed: CPU cycle, interrupt line
//! sampling, PPU dot, then the APU (`cpu_clock` when the CPU fired,
//! `run_cycle` when the APU divider fired).

use tracing::{debug, warn};

use crate::{
    apu::Apu,
    bus::{CpuBus, CpuView, OpenBus},
    cartridge::{Mapper, Rom},
    clock::MasterClock,
    config::Config,
    controller::Controller,
    cpu::{Cpu, IrqSource, TraceLog},
    error::Error,
    memory::{cpu as cpu_mem, ppu as ppu_mem},
    ppu::Ppu,
    state::{FORMAT_VERSION, SaveState, SaveStateError, SnapshotMeta},
};

/// Partial stepping granularity for debuggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvanceMode {
    /// Whole CPU instructions.
    Instructions,
    CpuCycles,
    /// Until the PPU VBlank flag rises.
    VBlank,
}

/// One frame of a recorded input movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReplayFrame {
    pub reset_requested: bool,
    pub power_cycle_requested: bool,
    /// Button bitmask for each controller port.
    pub ports: [u8; 2],
}

/// Receives one frame of PCM at a time.
pub trait AudioSink {
    fn push_frame(&mut self, samples: &[i16]);
}

impl AudioSink for Vec<i16> {
    fn push_frame(&mut self, samples: &[i16]) {
        self.extend_from_slice(samples);
    }
}

/// What happened during one master tick.
#[derive(Debug, Default, Clone, Copy)]
struct Tick {
    cpu: bool,
    ppu: bool,
    frame_complete: bool,
}

#[derive(Debug)]
pub struct Nes {
    config: Config,
    clock: MasterClock,
    cpu: Cpu,
    ppu: Ppu,
    apu: Apu,
    ram: [u8; cpu_mem::INTERNAL_RAM_SIZE],
    cartridge: Option<Mapper>,
    controllers: [Controller; 2],
    open_bus: OpenBus,
    /// `$4014` page written during the current CPU cycle.
    oam_dma_request: Option<u8>,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut nes = Self {
            cpu: Cpu::new(config.trace_capacity),
            ppu: Ppu::new(),
            apu: Apu::new(&config),
            config,
            clock: MasterClock::new(),
            ram: [0; cpu_mem::INTERNAL_RAM_SIZE],
            cartridge: None,
            controllers: [Controller::new(); 2],
            open_bus: OpenBus::new(),
            oam_dma_request: None,
        };
        nes.power();
        nes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses an iNES image and inserts it. On error the console keeps the
    /// previous cartridge and state.
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let rom = Rom::from_bytes(bytes)?;
        self.insert_rom(&rom)
    }

    /// Builds the board for `rom` and power-cycles the console with it.
    pub fn insert_rom(&mut self, rom: &Rom) -> Result<(), Error> {
        let mapper = Mapper::new(rom, &self.config)?;
        debug!(
            mapper = mapper.id(),
            board = mapper.name(),
            crc = format_args!("{:08X}", rom.crc32()),
            "cartridge inserted"
        );
        self.cartridge = Some(mapper);
        self.power();
        Ok(())
    }

    /// Removes the cartridge. Stepping becomes a no-op until one is inserted.
    pub fn eject(&mut self) -> Option<Mapper> {
        self.cartridge.take()
    }

    pub fn mapper(&self) -> Option<&Mapper> {
        self.cartridge.as_ref()
    }

    /// Cold start of every component.
    pub fn power(&mut self) {
        self.clock = MasterClock::new();
        self.ram = [0; cpu_mem::INTERNAL_RAM_SIZE];
        self.cpu.power();
        self.ppu.power();
        self.apu.power();
        if let Some(mapper) = self.cartridge.as_mut() {
            mapper.power();
        }
        self.controllers = [Controller::new(); 2];
        self.open_bus.reset();
        self.oam_dma_request = None;
        debug!("console power");
    }

    /// Reset button. RAM, OAM, palette RAM and cartridge RAM survive.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.ppu.reset();
        self.apu.reset();
        if let Some(mapper) = self.cartridge.as_mut() {
            mapper.reset();
        }
        self.oam_dma_request = None;
        debug!("console reset");
    }

    /// Steps one master tick on which at least one component fires.
    fn step(&mut self) -> Tick {
        let Some(mapper) = self.cartridge.as_mut() else {
            return Tick::default();
        };
        let events = self.clock.advance();
        let mut tick = Tick {
            cpu: events.cpu,
            ppu: events.ppu,
            frame_complete: false,
        };

        if events.cpu {
            let cpu_cycle = self.cpu.cycles();
            let mut bus = CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                &mut self.apu,
                mapper,
                &mut self.controllers,
                &mut self.open_bus,
                &mut self.oam_dma_request,
                cpu_cycle,
            );
            self.cpu.clock(&mut bus);
            if let Some(page) = self.oam_dma_request.take() {
                self.cpu.request_oam_dma(page);
            }
            sync_irq_lines(&mut self.cpu, &self.apu, mapper);
            self.cpu.sample_interrupts(self.ppu.nmi_line());
        }

        if events.ppu {
            self.ppu.clock(mapper);
            if self.ppu.take_frame_complete() {
                self.apu.post_frame(self.config.samples_per_frame());
                self.apu.pre_frame();
                tick.frame_complete = true;
            }
        }

        if events.cpu {
            self.apu.cpu_clock();
            if let Some(addr) = self.apu.take_dmc_request() {
                self.cpu.request_dmc_dma(addr);
            }
        }
        if events.apu {
            self.apu.run_cycle();
        }
        sync_irq_lines(&mut self.cpu, &self.apu, mapper);
        tick
    }

    /// Runs until the PPU wraps from the pre-render line to scanline 0. The
    /// APU accumulator is resampled into [`Nes::audio_samples`] at the same
    /// point. Without a cartridge nothing happens.
    pub fn run_frame(&mut self) {
        if self.cartridge.is_none() {
            return;
        }
        while !self.step().frame_complete {}
    }

    /// [`Nes::run_frame`] followed by handing the frame's audio to `sink`.
    pub fn run_frame_into(&mut self, sink: &mut impl AudioSink) {
        self.run_frame();
        sink.push_frame(self.apu.samples());
    }

    /// Applies one recorded frame: power or reset first, then both
    /// controller masks, then one frame of emulation.
    pub fn run_replay_frame(&mut self, frame: &ReplayFrame) {
        if frame.power_cycle_requested {
            self.power();
        } else if frame.reset_requested {
            self.reset();
        }
        for (port, mask) in frame.ports.iter().enumerate() {
            self.controllers[port].set_buttons(*mask);
        }
        self.run_frame();
    }

    /// Debugger stepping. A jammed CPU ends instruction stepping early.
    pub fn advance(&mut self, mode: AdvanceMode, count: u64) {
        if self.cartridge.is_none() || count == 0 {
            return;
        }
        match mode {
            AdvanceMode::CpuCycles => {
                let mut remaining = count;
                while remaining > 0 {
                    if self.step().cpu {
                        remaining -= 1;
                    }
                }
            }
            AdvanceMode::Instructions => {
                let target = self.cpu.instructions() + count;
                loop {
                    if !self.step().cpu {
                        continue;
                    }
                    if self.cpu.is_jammed()
                        || (self.cpu.instructions() >= target && self.cpu.at_instruction_boundary())
                    {
                        break;
                    }
                }
            }
            AdvanceMode::VBlank => {
                for _ in 0..count {
                    loop {
                        let before = self.ppu.in_vblank();
                        if self.step().ppu && !before && self.ppu.in_vblank() {
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Side-effect free read of the CPU address space.
    pub fn debug_read(&self, addr: u16) -> u8 {
        match self.cpu_view() {
            Some(view) => view.peek(addr),
            None => self.open_bus.sample(),
        }
    }

    pub fn cpu_view(&self) -> Option<CpuView<'_>> {
        let mapper = self.cartridge.as_ref()?;
        Some(CpuView {
            ram: &self.ram,
            ppu: &self.ppu,
            apu: &self.apu,
            mapper,
            controllers: &self.controllers,
            open_bus: self.open_bus,
        })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn trace(&self) -> &TraceLog {
        self.cpu.trace()
    }

    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count()
    }

    /// Palette indices with emphasis bits, 256x240.
    pub fn palette_indices(&self) -> &[u16] {
        self.ppu.frame_buffer()
    }

    /// The current frame as packed RGB, 256x240x3 bytes.
    pub fn frame_buffer(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(ppu_mem::SCREEN_WIDTH * ppu_mem::SCREEN_HEIGHT * 3);
        for &pixel in self.ppu.frame_buffer() {
            rgb.extend_from_slice(&self.config.palette.rgb(pixel));
        }
        rgb
    }

    /// PCM produced by the last completed frame.
    pub fn audio_samples(&self) -> &[i16] {
        self.apu.samples()
    }

    pub fn set_buttons(&mut self, port: usize, mask: u8) {
        if let Some(pad) = self.controllers.get_mut(port) {
            pad.set_buttons(mask);
        }
    }

    pub fn controller(&self, port: usize) -> Option<&Controller> {
        self.controllers.get(port)
    }

    pub fn save_ram(&self) -> Option<&[u8]> {
        self.cartridge.as_ref()?.save_ram()
    }

    pub fn load_save_ram(&mut self, bytes: &[u8]) {
        if let Some(mapper) = self.cartridge.as_mut() {
            mapper.load_save_ram(bytes);
        }
    }

    /// Captures the whole console. Only meaningful between frames.
    pub fn save_state(&self) -> Result<SaveState, SaveStateError> {
        let mapper = self.cartridge.as_ref().ok_or(SaveStateError::NoCartridge)?;
        let state = SaveState {
            meta: SnapshotMeta {
                format_version: FORMAT_VERSION,
                mapper_id: mapper.id(),
                frame: self.frame_count(),
            },
            clock: self.clock,
            cpu: self.cpu.save_state(),
            ppu: self.ppu.save_state(),
            apu: self.apu.save_state(),
            mapper: mapper.save_state(),
            controllers: self.controllers,
            ram: self.ram.to_vec(),
            open_bus: self.open_bus.sample(),
            oam_dma_request: self.oam_dma_request,
        };
        debug!(frame = state.meta.frame, mapper = mapper.id(), "state saved");
        Ok(state)
    }

    /// Restores a snapshot. Nothing changes when the snapshot does not fit
    /// the inserted cartridge.
    pub fn load_state(&mut self, state: &SaveState) -> Result<(), SaveStateError> {
        let result = self.apply_state(state);
        match &result {
            Ok(()) => debug!(frame = state.meta.frame, "state loaded"),
            Err(err) => warn!(%err, "save state refused"),
        }
        result
    }

    fn apply_state(&mut self, state: &SaveState) -> Result<(), SaveStateError> {
        let mapper = self.cartridge.as_mut().ok_or(SaveStateError::NoCartridge)?;
        if state.meta.format_version != FORMAT_VERSION {
            return Err(SaveStateError::Corrupt("unsupported format version"));
        }
        if state.meta.mapper_id != mapper.id() {
            return Err(SaveStateError::MapperMismatch {
                expected: mapper.id(),
                found: state.meta.mapper_id,
            });
        }
        let ram: [u8; cpu_mem::INTERNAL_RAM_SIZE] = state
            .ram
            .as_slice()
            .try_into()
            .map_err(|_| SaveStateError::Corrupt("work RAM size"))?;
        let mut ppu = self.ppu.clone();
        ppu.load_state(&state.ppu).map_err(SaveStateError::Corrupt)?;
        // Validates fully before touching the board.
        mapper.load_state(&state.mapper)?;

        self.ppu = ppu;
        self.ram = ram;
        self.clock = state.clock;
        self.cpu.load_state(&state.cpu);
        self.apu.load_state(&state.apu);
        self.controllers = state.controllers;
        self.open_bus.latch(state.open_bus);
        self.oam_dma_request = state.oam_dma_request;
        Ok(())
    }
}

/// Pushes the level of every IRQ source into the CPU.
fn sync_irq_lines(cpu: &mut Cpu, apu: &Apu, mapper: &Mapper) {
    cpu.set_irq_source(IrqSource::FRAME_COUNTER, apu.frame_irq());
    cpu.set_irq_source(IrqSource::DMC, apu.dmc_irq());
    cpu.set_irq_source(IrqSource::MAPPER, mapper.irq_asserted());
}
