//! Dot-stepped 2C02 PPU.
//!
//! [`Ppu::clock`] advances exactly one dot. A frame is 262 scanlines of 341
//! dots: lines 0-239 are visible, 240 is idle, 241-260 are VBlank and 261 is
//! the pre-render line. Every address the PPU puts on its bus, whether from a
//! rendering fetch or from CPU `$2006/$2007` activity, is reported to the
//! cartridge so scanline-counting boards see the same A12 pattern as
//! hardware.
//!
//! The frame buffer holds palette indices, not colours: bits 0-5 are the
//! palette entry and bits 6-8 the colour emphasis bits of `$2001`.

mod background;
pub mod palette;
mod registers;
mod sprites;

use core::fmt;

use tracing::debug;

use crate::{
    cartridge::Mapper,
    memory::ppu::{self as ppu_mem, Register as PpuRegister},
};

pub use background::Background;
pub use palette::Palette;
pub use registers::VramRegisters;
pub use sprites::{SpriteSlot, Sprites};

use registers::{Control, Mask, Status};

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_START_LINE: u16 = 241;
pub const PRE_RENDER_LINE: u16 = 261;
const VISIBLE_LINES: u16 = 240;

/// Palette RAM contents after power-on, as dumped from a front-loading
/// console.
#[rustfmt::skip]
const POWER_UP_PALETTE: [u8; ppu_mem::PALETTE_RAM_SIZE] = [
    0x09, 0x01, 0x00, 0x01, 0x00, 0x02, 0x02, 0x0D, 0x08, 0x10, 0x08, 0x24, 0x00, 0x00, 0x04, 0x2C,
    0x09, 0x01, 0x34, 0x03, 0x00, 0x04, 0x00, 0x14, 0x08, 0x3A, 0x00, 0x02, 0x00, 0x20, 0x2C, 0x08,
];

#[derive(Clone)]
pub struct Ppu {
    control: Control,
    mask: Mask,
    status: Status,
    vram: VramRegisters,
    oam_addr: u8,
    oam: Box<[u8; ppu_mem::OAM_SIZE]>,
    palette_ram: [u8; ppu_mem::PALETTE_RAM_SIZE],
    /// Delayed `$2007` read buffer.
    read_buffer: u8,
    /// Value left on the CPU-facing data lines by the last register access.
    io_latch: u8,
    /// Last processed position.
    scanline: u16,
    dot: u16,
    frame: u64,
    odd_frame: bool,
    frame_complete: bool,
    /// A `$2002` read one dot before VBlank suppresses the flag and NMI.
    suppress_vblank: bool,
    /// Address currently driven on the PPU bus.
    bus_addr: u16,
    bg: Background,
    sprites: Sprites,
    frame_buffer: Box<[u16]>,
}

impl fmt::Debug for Ppu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ppu")
            .field("control", &self.control)
            .field("mask", &self.mask)
            .field("status", &self.status)
            .field("vram", &self.vram)
            .field("scanline", &self.scanline)
            .field("dot", &self.dot)
            .field("frame", &self.frame)
            .finish()
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            control: Control::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            vram: VramRegisters::default(),
            oam_addr: 0,
            oam: Box::new([0; ppu_mem::OAM_SIZE]),
            palette_ram: POWER_UP_PALETTE,
            read_buffer: 0,
            io_latch: 0,
            scanline: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            frame_complete: false,
            suppress_vblank: false,
            bus_addr: 0,
            bg: Background::default(),
            sprites: Sprites::default(),
            frame_buffer: vec![0; ppu_mem::SCREEN_WIDTH * ppu_mem::SCREEN_HEIGHT]
                .into_boxed_slice(),
        }
    }

    /// Cold start: registers, memories and counters return to power-on values.
    pub fn power(&mut self) {
        *self = Self::new();
        debug!("ppu power");
    }

    /// Reset button: `$2000/$2001` and the write toggle clear; OAM, palette
    /// RAM and the raster position are kept.
    pub fn reset(&mut self) {
        self.control = Control::empty();
        self.mask = Mask::empty();
        self.vram.reset_latch();
        self.read_buffer = 0;
        self.odd_frame = false;
        debug!("ppu reset");
    }

    /// NMI output: VBlank AND NMI enable. The CPU detects its rising edge.
    pub fn nmi_line(&self) -> bool {
        self.status.contains(Status::VERTICAL_BLANK) && self.control.nmi_enabled()
    }

    /// VBlank flag as it would read from `$2002` bit 7.
    pub fn in_vblank(&self) -> bool {
        self.status.contains(Status::VERTICAL_BLANK)
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Frames completed since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Returns and clears the end-of-frame flag raised when the raster wraps
    /// from the pre-render line to scanline 0.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// 256x240 palette indices with emphasis bits.
    pub fn frame_buffer(&self) -> &[u16] {
        &self.frame_buffer
    }

    pub fn oam(&self) -> &[u8] {
        &self.oam[..]
    }

    pub fn palette_ram(&self) -> &[u8; ppu_mem::PALETTE_RAM_SIZE] {
        &self.palette_ram
    }

    /// Advances one dot.
    pub fn clock(&mut self, mapper: &mut Mapper) {
        self.advance_position();

        match self.scanline {
            0..VISIBLE_LINES => self.rendering_dot(mapper),
            VBLANK_START_LINE if self.dot == 1 => {
                if !self.suppress_vblank {
                    self.status.insert(Status::VERTICAL_BLANK);
                }
                self.suppress_vblank = false;
            }
            PRE_RENDER_LINE => {
                if self.dot == 1 {
                    self.status.remove(
                        Status::VERTICAL_BLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW,
                    );
                }
                self.rendering_dot(mapper);
            }
            _ => {}
        }
    }

    fn advance_position(&mut self) {
        // Odd frames drop the last pre-render dot while rendering.
        if self.scanline == PRE_RENDER_LINE
            && self.dot == 339
            && self.odd_frame
            && self.mask.rendering_enabled()
        {
            self.dot = 340;
        }

        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame += 1;
                self.odd_frame = !self.odd_frame;
                self.frame_complete = true;
            }
        }
    }

    /// Work done on visible and pre-render lines.
    fn rendering_dot(&mut self, mapper: &mut Mapper) {
        let visible = self.scanline < VISIBLE_LINES;
        if self.mask.rendering_enabled() {
            self.background_dot(mapper);
            if visible {
                self.evaluate_sprites_dot();
            }
            self.sprite_fetch_dot(mapper);
        }
        if visible && (1..=256).contains(&self.dot) {
            self.render_pixel(self.dot - 1);
        }
    }

    fn render_pixel(&mut self, x: u16) {
        let mut color = 0;
        if self.mask.background_visible_at(x) {
            let pixel = self.bg.pixel(self.vram.x);
            if pixel & 0x03 != 0 {
                color = pixel;
            }
        }

        if self.mask.sprites_visible_at(x)
            && let Some(sprite) = self.sprites.pixel(x)
        {
            if sprite.sprite0 && color != 0 && x != 255 {
                self.status.insert(Status::SPRITE_ZERO_HIT);
            }
            if color == 0 || !sprite.behind_background {
                color = sprite.color;
            }
        }

        let v = self.vram.v.raw() & ppu_mem::VRAM_ADDR_MASK;
        let entry = if !self.mask.rendering_enabled() && v >= ppu_mem::PALETTE_BASE {
            // With rendering off, a VRAM address inside palette RAM is drawn.
            self.palette_ram[palette_index(v)]
        } else {
            self.palette_ram[palette_index(ppu_mem::PALETTE_BASE | u16::from(color))]
        };

        let index = usize::from(self.scanline) * ppu_mem::SCREEN_WIDTH + usize::from(x);
        self.frame_buffer[index] =
            u16::from(entry & self.mask.palette_mask()) | self.mask.emphasis();
    }

    /// Timestamp given to the cartridge. The odd-frame skip leaves a one-dot
    /// gap, so it never runs backwards within a power cycle.
    fn ppu_dot(&self) -> u64 {
        let frame_len = u64::from(DOTS_PER_SCANLINE) * u64::from(SCANLINES_PER_FRAME);
        let line = u64::from(self.scanline) * u64::from(DOTS_PER_SCANLINE);
        self.frame * frame_len + line + u64::from(self.dot)
    }

    fn set_bus_address(&mut self, addr: u16, mapper: &mut Mapper) {
        self.bus_addr = addr & ppu_mem::VRAM_ADDR_MASK;
        mapper.ppu_address_changed(self.bus_addr, self.ppu_dot());
    }

    /// Visible and pre-render lines with rendering on; `$2007` accesses
    /// misbehave here.
    fn rendering_active(&self) -> bool {
        self.mask.rendering_enabled()
            && (self.scanline < VISIBLE_LINES || self.scanline == PRE_RENDER_LINE)
    }

    /// `$2007` post-access increment. During rendering the access bumps
    /// coarse X and Y together instead.
    fn advance_vram_addr(&mut self, mapper: &mut Mapper) {
        if self.rendering_active() {
            self.vram.v.increment_coarse_x();
            self.vram.v.increment_y();
        } else {
            self.vram.v.increment(self.control.vram_increment());
            self.set_bus_address(self.vram.v.raw(), mapper);
        }
    }

    /// CPU read of `$2000-$3FFF`.
    pub fn cpu_read(&mut self, addr: u16, mapper: &mut Mapper) -> u8 {
        let value = match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Status => {
                let value = (self.status.bits() & 0xE0) | (self.io_latch & 0x1F);
                self.status.remove(Status::VERTICAL_BLANK);
                self.vram.reset_latch();
                if self.scanline == VBLANK_START_LINE && self.dot == 0 {
                    self.suppress_vblank = true;
                }
                value
            }
            PpuRegister::OamData => self.read_oam_data(),
            PpuRegister::Data => {
                let vaddr = self.vram.v.raw() & ppu_mem::VRAM_ADDR_MASK;
                self.set_bus_address(vaddr, mapper);
                let value = if vaddr >= ppu_mem::PALETTE_BASE {
                    // Palette reads bypass the buffer, which picks up the
                    // nametable byte underneath instead.
                    self.read_buffer = mapper.ppu_read(vaddr & 0x2FFF);
                    (self.palette_ram[palette_index(vaddr)] & 0x3F) | (self.io_latch & 0xC0)
                } else {
                    std::mem::replace(&mut self.read_buffer, mapper.ppu_read(vaddr))
                };
                self.advance_vram_addr(mapper);
                value
            }
            _ => self.io_latch,
        };
        self.io_latch = value;
        value
    }

    /// Side-effect free register read for debuggers.
    pub fn peek_register(&self, addr: u16) -> u8 {
        match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Status => (self.status.bits() & 0xE0) | (self.io_latch & 0x1F),
            PpuRegister::OamData => self.read_oam_data(),
            PpuRegister::Data => {
                let vaddr = self.vram.v.raw() & ppu_mem::VRAM_ADDR_MASK;
                if vaddr >= ppu_mem::PALETTE_BASE {
                    (self.palette_ram[palette_index(vaddr)] & 0x3F) | (self.io_latch & 0xC0)
                } else {
                    self.read_buffer
                }
            }
            _ => self.io_latch,
        }
    }

    /// CPU write of `$2000-$3FFF`.
    pub fn cpu_write(&mut self, addr: u16, value: u8, mapper: &mut Mapper) {
        self.io_latch = value;
        match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Control => {
                self.control = Control::from_bits_retain(value);
                self.vram.write_control(self.control);
            }
            PpuRegister::Mask => self.mask = Mask::from_bits_retain(value),
            PpuRegister::Status => {}
            PpuRegister::OamAddr => self.oam_addr = value,
            PpuRegister::OamData => {
                if self.rendering_active() {
                    // Writes are dropped; only the high six bits advance.
                    self.oam_addr = self.oam_addr.wrapping_add(4);
                } else {
                    self.oam[usize::from(self.oam_addr)] = value;
                    self.oam_addr = self.oam_addr.wrapping_add(1);
                }
            }
            PpuRegister::Scroll => self.vram.write_scroll(value),
            PpuRegister::Addr => {
                if self.vram.write_addr(value) && !self.rendering_active() {
                    self.set_bus_address(self.vram.v.raw(), mapper);
                }
            }
            PpuRegister::Data => {
                let vaddr = self.vram.v.raw() & ppu_mem::VRAM_ADDR_MASK;
                self.set_bus_address(vaddr, mapper);
                if vaddr >= ppu_mem::PALETTE_BASE {
                    self.palette_ram[palette_index(vaddr)] = value & 0x3F;
                } else {
                    mapper.ppu_write(vaddr, value);
                }
                self.advance_vram_addr(mapper);
            }
        }
    }

    fn read_oam_data(&self) -> u8 {
        if self.scanline < VISIBLE_LINES && self.mask.rendering_enabled() {
            return self.sprites.latch;
        }
        let value = self.oam[usize::from(self.oam_addr)];
        // Attribute bits 2-4 do not exist.
        if self.oam_addr & 0x03 == 0x02 {
            value & 0xE3
        } else {
            value
        }
    }

    pub fn save_state(&self) -> PpuState {
        PpuState {
            control: self.control.bits(),
            mask: self.mask.bits(),
            status: self.status.bits(),
            vram: self.vram,
            oam_addr: self.oam_addr,
            oam: self.oam.to_vec(),
            palette_ram: self.palette_ram,
            read_buffer: self.read_buffer,
            io_latch: self.io_latch,
            scanline: self.scanline,
            dot: self.dot,
            frame: self.frame,
            odd_frame: self.odd_frame,
            suppress_vblank: self.suppress_vblank,
            bus_addr: self.bus_addr,
            background: self.bg,
            sprites: self.sprites,
        }
    }

    /// Restores a snapshot; an OAM image of the wrong size is refused.
    pub fn load_state(&mut self, state: &PpuState) -> Result<(), &'static str> {
        let oam: [u8; ppu_mem::OAM_SIZE] = state
            .oam
            .as_slice()
            .try_into()
            .map_err(|_| "ppu oam size")?;
        if state.scanline >= SCANLINES_PER_FRAME || state.dot >= DOTS_PER_SCANLINE {
            return Err("ppu raster position");
        }

        self.control = Control::from_bits_retain(state.control);
        self.mask = Mask::from_bits_retain(state.mask);
        self.status = Status::from_bits_truncate(state.status);
        self.vram = state.vram;
        self.oam_addr = state.oam_addr;
        *self.oam = oam;
        self.palette_ram = state.palette_ram;
        self.read_buffer = state.read_buffer;
        self.io_latch = state.io_latch;
        self.scanline = state.scanline;
        self.dot = state.dot;
        self.frame = state.frame;
        self.odd_frame = state.odd_frame;
        self.frame_complete = false;
        self.suppress_vblank = state.suppress_vblank;
        self.bus_addr = state.bus_addr;
        self.bg = state.background;
        self.sprites = state.sprites;
        Ok(())
    }
}

/// Folds `$3F00-$3FFF` onto the 32 palette bytes; `$3F10/$14/$18/$1C` share
/// storage with `$3F00/$04/$08/$0C`.
fn palette_index(addr: u16) -> usize {
    let index = usize::from(addr) & (ppu_mem::PALETTE_RAM_SIZE - 1);
    if index & 0x13 == 0x10 {
        index & !0x10
    } else {
        index
    }
}

/// PPU part of a save state.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpuState {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub vram: VramRegisters,
    pub oam_addr: u8,
    pub oam: Vec<u8>,
    pub palette_ram: [u8; ppu_mem::PALETTE_RAM_SIZE],
    pub read_buffer: u8,
    pub io_latch: u8,
    pub scanline: u16,
    pub dot: u16,
    pub frame: u64,
    pub odd_frame: bool,
    pub suppress_vblank: bool,
    pub bus_addr: u16,
    pub background: Background,
    pub sprites: Sprites,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cartridge::mapper::test_support::rom, config::Config};

    fn setup() -> (Ppu, Mapper) {
        let mapper = Mapper::new(&rom(0, 2, 0, 0), &Config::default()).expect("mapper");
        (Ppu::new(), mapper)
    }

    fn run_until(ppu: &mut Ppu, mapper: &mut Mapper, scanline: u16, dot: u16) {
        while ppu.scanline != scanline || ppu.dot != dot {
            ppu.clock(mapper);
        }
    }

    fn set_addr(ppu: &mut Ppu, mapper: &mut Mapper, addr: u16) {
        ppu.cpu_write(PpuRegister::Addr as u16, (addr >> 8) as u8, mapper);
        ppu.cpu_write(PpuRegister::Addr as u16, addr as u8, mapper);
    }

    #[test]
    fn control_write_updates_t_nametable() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(0x2000, 0b1000_0110, &mut mapper);
        assert!(ppu.control.nmi_enabled());
        assert_eq!(ppu.control.vram_increment(), 32);
        assert_eq!(ppu.vram.t.nametable(), 2);
    }

    #[test]
    fn buffered_data_read() {
        let (mut ppu, mut mapper) = setup();
        set_addr(&mut ppu, &mut mapper, 0x2000);
        ppu.cpu_write(PpuRegister::Data as u16, 0x12, &mut mapper);

        set_addr(&mut ppu, &mut mapper, 0x2000);
        let first = ppu.cpu_read(PpuRegister::Data as u16, &mut mapper);
        let second = ppu.cpu_read(PpuRegister::Data as u16, &mut mapper);
        assert_eq!(first, 0x00, "first read returns the stale buffer");
        assert_eq!(second, 0x12);
    }

    #[test]
    fn palette_reads_bypass_buffer_and_mirror() {
        let (mut ppu, mut mapper) = setup();
        set_addr(&mut ppu, &mut mapper, 0x3F10);
        ppu.cpu_write(PpuRegister::Data as u16, 0x2A, &mut mapper);

        set_addr(&mut ppu, &mut mapper, 0x3F00);
        assert_eq!(ppu.cpu_read(PpuRegister::Data as u16, &mut mapper) & 0x3F, 0x2A);
        assert_eq!(palette_index(0x3F14), 0x04);
        assert_eq!(palette_index(0x3F11), 0x11);
        assert_eq!(palette_index(0x3FFC), 0x0C);
    }

    #[test]
    fn palette_writes_drive_the_cartridge_address_bus() {
        let mut mapper = Mapper::new(&rom(4, 2, 1, 0), &Config::default()).expect("mapper");
        let mut ppu = Ppu::new();
        // MMC3 counter armed with a zero reload: the next A12 rise raises IRQ.
        mapper.cpu_write(0xC000, 0, 0);
        mapper.cpu_write(0xC001, 0, 0);
        mapper.cpu_write(0xE001, 0, 0);

        // Background and sprites both at $0000 keep A12 low while rendering.
        ppu.cpu_write(0x2001, 0x08, &mut mapper);
        run_until(&mut ppu, &mut mapper, 10, 100);
        assert!(!mapper.irq_asserted());

        ppu.vram.v.set_raw(0x3F00);
        ppu.cpu_write(PpuRegister::Data as u16, 0x0F, &mut mapper);
        assert_eq!(ppu.bus_addr, 0x3F00);
        assert!(mapper.irq_asserted());
    }

    #[test]
    fn status_read_resets_write_toggle() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::Scroll as u16, 0x12, &mut mapper);
        assert!(ppu.vram.w);
        ppu.cpu_read(PpuRegister::Status as u16, &mut mapper);
        assert!(!ppu.vram.w);
    }

    #[test]
    fn write_only_registers_read_the_io_latch() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::Mask as u16, 0x00, &mut mapper);
        ppu.cpu_write(PpuRegister::OamAddr as u16, 0x00, &mut mapper);
        ppu.cpu_write(PpuRegister::Scroll as u16, 0xB7, &mut mapper);
        assert_eq!(ppu.cpu_read(PpuRegister::Control as u16, &mut mapper), 0xB7);
        assert_eq!(ppu.cpu_read(PpuRegister::Status as u16, &mut mapper) & 0x1F, 0x17);
    }

    #[test]
    fn oam_data_auto_increments_outside_rendering() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::OamAddr as u16, 0x02, &mut mapper);
        ppu.cpu_write(PpuRegister::OamData as u16, 0xFF, &mut mapper);
        ppu.cpu_write(PpuRegister::OamData as u16, 0xBB, &mut mapper);
        assert_eq!(ppu.oam[2], 0xFF);
        assert_eq!(ppu.oam[3], 0xBB);

        ppu.cpu_write(PpuRegister::OamAddr as u16, 0x02, &mut mapper);
        assert_eq!(ppu.cpu_read(PpuRegister::OamData as u16, &mut mapper), 0xE3);
    }

    #[test]
    fn vblank_window_is_exact() {
        let (mut ppu, mut mapper) = setup();
        run_until(&mut ppu, &mut mapper, VBLANK_START_LINE, 0);
        assert!(!ppu.status.contains(Status::VERTICAL_BLANK));
        ppu.clock(&mut mapper);
        assert!(ppu.status.contains(Status::VERTICAL_BLANK));

        run_until(&mut ppu, &mut mapper, PRE_RENDER_LINE, 0);
        assert!(ppu.status.contains(Status::VERTICAL_BLANK));
        ppu.clock(&mut mapper);
        assert!(!ppu.status.contains(Status::VERTICAL_BLANK));
    }

    #[test]
    fn status_read_just_before_vblank_suppresses_it() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(0x2000, 0x80, &mut mapper);
        run_until(&mut ppu, &mut mapper, VBLANK_START_LINE, 0);
        let status = ppu.cpu_read(PpuRegister::Status as u16, &mut mapper);
        assert_eq!(status & 0x80, 0);
        ppu.clock(&mut mapper);
        assert!(!ppu.status.contains(Status::VERTICAL_BLANK));
        assert!(!ppu.nmi_line());
    }

    #[test]
    fn nmi_line_follows_enable_and_vblank() {
        let (mut ppu, mut mapper) = setup();
        run_until(&mut ppu, &mut mapper, VBLANK_START_LINE, 1);
        assert!(!ppu.nmi_line());
        ppu.cpu_write(0x2000, 0x80, &mut mapper);
        assert!(ppu.nmi_line());
        ppu.cpu_write(0x2000, 0x00, &mut mapper);
        assert!(!ppu.nmi_line());
    }

    #[test]
    fn odd_frames_are_one_dot_shorter_while_rendering() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::Mask as u16, 0x08, &mut mapper);
        let mut lengths = Vec::new();
        for _ in 0..3 {
            let mut dots = 0u32;
            loop {
                ppu.clock(&mut mapper);
                dots += 1;
                if ppu.take_frame_complete() {
                    break;
                }
            }
            lengths.push(dots);
        }
        let full = u32::from(DOTS_PER_SCANLINE) * u32::from(SCANLINES_PER_FRAME);
        assert_eq!(lengths, [full, full - 1, full]);
    }

    #[test]
    fn backdrop_fills_the_frame_when_rendering_is_off() {
        let (mut ppu, mut mapper) = setup();
        set_addr(&mut ppu, &mut mapper, 0x3F00);
        ppu.cpu_write(PpuRegister::Data as u16, 0x21, &mut mapper);
        set_addr(&mut ppu, &mut mapper, 0x2000);
        ppu.cpu_write(PpuRegister::Mask as u16, 0x20, &mut mapper);
        while !ppu.take_frame_complete() {
            ppu.clock(&mut mapper);
        }
        assert!(ppu.frame_buffer().iter().all(|&p| p == 0x21 | 0x40));
    }

    #[test]
    fn sprite_zero_hit_on_opaque_overlap() {
        let (mut ppu, mut mapper) = setup();
        // Tile 1: solid low plane in CHR RAM.
        set_addr(&mut ppu, &mut mapper, 0x0010);
        for _ in 0..8 {
            ppu.cpu_write(PpuRegister::Data as u16, 0xFF, &mut mapper);
        }
        // Background: tile 1 everywhere in the first nametable.
        set_addr(&mut ppu, &mut mapper, 0x2000);
        for _ in 0..0x3C0 {
            ppu.cpu_write(PpuRegister::Data as u16, 0x01, &mut mapper);
        }
        // Sprite 0 at (40, 31) with tile 1.
        ppu.cpu_write(PpuRegister::OamAddr as u16, 0, &mut mapper);
        for byte in [30, 1, 0, 40] {
            ppu.cpu_write(PpuRegister::OamData as u16, byte, &mut mapper);
        }
        set_addr(&mut ppu, &mut mapper, 0x0000);
        ppu.cpu_write(PpuRegister::Mask as u16, 0x1E, &mut mapper);

        run_until(&mut ppu, &mut mapper, 31, 40);
        assert!(!ppu.status.contains(Status::SPRITE_ZERO_HIT));
        ppu.clock(&mut mapper);
        assert!(ppu.status.contains(Status::SPRITE_ZERO_HIT));
    }

    #[test]
    fn sprite_overflow_needs_nine_sprites_on_a_line() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::OamAddr as u16, 0, &mut mapper);
        for i in 0..64u8 {
            let y = if i < 9 { 50 } else { 0xF0 };
            for byte in [y, 0, 0, i] {
                ppu.cpu_write(PpuRegister::OamData as u16, byte, &mut mapper);
            }
        }
        ppu.cpu_write(PpuRegister::Mask as u16, 0x18, &mut mapper);
        run_until(&mut ppu, &mut mapper, 50, 0);
        assert!(!ppu.status.contains(Status::SPRITE_OVERFLOW));
        run_until(&mut ppu, &mut mapper, 51, 0);
        assert!(ppu.status.contains(Status::SPRITE_OVERFLOW));
    }

    #[test]
    fn state_round_trip_resumes_identically() {
        let (mut ppu, mut mapper) = setup();
        ppu.cpu_write(PpuRegister::Mask as u16, 0x1E, &mut mapper);
        run_until(&mut ppu, &mut mapper, 100, 17);

        let state = ppu.save_state();
        let mut other = Ppu::new();
        other.load_state(&state).expect("valid state");
        let mut other_mapper = mapper.clone();
        for _ in 0..2000 {
            ppu.clock(&mut mapper);
            other.clock(&mut other_mapper);
        }
        assert_eq!(ppu.save_state(), other.save_state());
    }
}
