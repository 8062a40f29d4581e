//! Cycle-level NES emulation core.
//!
//! [`Nes`] owns the 2A03 CPU, the 2C02 PPU, the APU, two standard
//! controllers and the inserted cartridge, and steps them from a shared
//! master clock. Hosts load an iNES image, call [`Nes::run_frame`] once per
//! video frame and read back [`Nes::frame_buffer`] and
//! [`Nes::audio_samples`].

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod clock;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod nes;
pub mod ppu;
pub mod state;

pub use cartridge::{Mapper, Rom};
pub use config::Config;
pub use controller::{Button, Controller};
pub use error::Error;
pub use nes::{AdvanceMode, AudioSink, Nes, ReplayFrame};
pub use state::{SaveState, SaveStateError};

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub(crate) const TEST_COUNT: usize = 1000;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::DEBUG)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
