//! Sprite and DMC DMA.
//!
//! Both units share the CPU's bus. A request halts the CPU on its next read
//! cycle; from then on every clock is a DMA cycle until neither unit has work
//! left. Even CPU cycles are "get" cycles that may read, odd ones are "put"
//! cycles that may write. A DMC fetch takes precedence over a sprite read on
//! a get cycle, and the sprite transfer simply resumes on the next get.

use tracing::trace;

use crate::{
    bus::Bus,
    cpu::Cpu,
    memory::{cpu as cpu_mem, ppu::Register as PpuRegister},
};

/// Bytes moved by one sprite DMA (256 reads plus 256 writes).
const SPRITE_DMA_CYCLES: u16 = 0x200;

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dma {
    pub(crate) need_halt: bool,
    pub(crate) need_dummy: bool,
    /// The CPU is halted and every clock is a DMA cycle.
    pub(crate) active: bool,
    /// Address of the halted read, repeated by alignment cycles.
    pub(crate) halt_addr: u16,
    /// Controller ports see one read however long /OE stays low.
    pub(crate) skip_dummy: bool,
    pub(crate) dmc_running: bool,
    pub(crate) dmc_addr: u16,
    pub(crate) sprite_running: bool,
    pub(crate) sprite_page: u8,
    pub(crate) sprite_offset: u8,
    pub(crate) sprite_counter: u16,
    pub(crate) latch: u8,
}

impl Dma {
    pub(crate) fn request_oam(&mut self, page: u8) {
        trace!(page = format_args!("{page:#04X}"), "sprite dma requested");
        self.sprite_running = true;
        self.sprite_page = page;
        self.sprite_offset = 0;
        self.sprite_counter = 0;
        self.need_halt = true;
    }

    pub(crate) fn request_dmc(&mut self, addr: u16) {
        trace!(addr = format_args!("{addr:#06X}"), "dmc dma requested");
        self.dmc_running = true;
        self.dmc_addr = addr;
        self.need_halt = true;
        self.need_dummy = true;
    }

    /// The CPU's halted read at `addr` counts as the halt cycle.
    pub(crate) fn begin(&mut self, addr: u16) {
        self.need_halt = false;
        self.active = true;
        self.halt_addr = addr;
        self.skip_dummy =
            addr == cpu_mem::CONTROLLER_PORT_1 || addr == cpu_mem::CONTROLLER_PORT_2;
    }

    /// Sprite DMA and DMC DMA cycles double as the DMC's halt and dummy
    /// cycles.
    fn consume_wait(&mut self) {
        if self.need_halt {
            self.need_halt = false;
        } else if self.need_dummy {
            self.need_dummy = false;
        }
    }
}

impl Cpu {
    pub(super) fn dma_cycle(&mut self, bus: &mut impl Bus) {
        let get_cycle = self.cycles & 1 == 0;
        let dma = &mut self.dma;

        if get_cycle {
            if dma.dmc_running && !dma.need_halt && !dma.need_dummy {
                let value = bus.read(dma.dmc_addr);
                dma.dmc_running = false;
                bus.dmc_fetched(value);
            } else if dma.sprite_running {
                dma.consume_wait();
                let addr = u16::from_be_bytes([dma.sprite_page, dma.sprite_offset]);
                dma.latch = bus.read(addr);
                dma.sprite_offset = dma.sprite_offset.wrapping_add(1);
                dma.sprite_counter += 1;
            } else {
                dma.consume_wait();
                if !dma.skip_dummy {
                    bus.read(dma.halt_addr);
                }
            }
        } else if dma.sprite_running && dma.sprite_counter & 1 == 1 {
            dma.consume_wait();
            bus.write(PpuRegister::OamData as u16, dma.latch);
            dma.sprite_counter += 1;
            if dma.sprite_counter == SPRITE_DMA_CYCLES {
                dma.sprite_running = false;
            }
        } else {
            // Alignment: wait for a get cycle.
            dma.consume_wait();
            if !dma.skip_dummy {
                bus.read(dma.halt_addr);
            }
        }

        if !dma.dmc_running && !dma.sprite_running {
            dma.active = false;
        }
    }
}
