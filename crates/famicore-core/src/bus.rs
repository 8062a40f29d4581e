//! CPU address bus.
//!
//! The CPU only ever talks to a [`Bus`]. The console wires that trait to
//! [`cpu::CpuBus`], which borrows RAM, the PPU, the APU, the
//! controllers and the cartridge for the duration of one CPU cycle; tests use
//! the flat [`mock::MockBus`].

#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod open_bus;
pub(crate) mod cpu;

pub use cpu::CpuView;
pub(crate) use cpu::CpuBus;
pub(crate) use open_bus::OpenBus;

/// One CPU bus access per call; reads and writes are never batched.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8);

    /// Side-effect free read used for disassembly and debugger views.
    fn peek(&self, addr: u16) -> u8;

    /// Delivers the byte fetched by a DMC DMA to the audio unit.
    fn dmc_fetched(&mut self, _value: u8) {}
}
