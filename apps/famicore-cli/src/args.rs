use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use famicore_core::Button;
use tracing::Level;

/// Headless NES runner
#[derive(Parser, Debug)]
#[command(name = "famicore", author, version, about, long_about = None)]
pub struct Args {
    /// Path to the iNES ROM file
    #[arg(required = true)]
    pub rom: PathBuf,

    /// Number of frames to emulate
    #[arg(short, long, default_value_t = 60)]
    pub frames: u64,

    /// Output PCM rate in Hz
    #[arg(long, default_value_t = 48_000)]
    pub sample_rate: u32,

    /// Keep the last N instructions and print them on exit
    #[arg(long, value_name = "N")]
    pub trace: Option<usize>,

    /// Restore this postcard snapshot before running
    #[arg(long)]
    pub load_state: Option<PathBuf>,

    /// Write a postcard snapshot after the last frame
    #[arg(long)]
    pub save_state: Option<PathBuf>,

    /// Write the final frame as a binary PPM image
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Write every frame's audio as raw little-endian i16 mono PCM
    #[arg(long)]
    pub pcm: Option<PathBuf>,

    /// Buttons held on controller 1 for the whole run
    #[arg(long, value_enum, value_delimiter = ',')]
    pub hold: Vec<ButtonArg>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: Level,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ButtonArg {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl From<ButtonArg> for Button {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::A => Button::A,
            ButtonArg::B => Button::B,
            ButtonArg::Select => Button::Select,
            ButtonArg::Start => Button::Start,
            ButtonArg::Up => Button::Up,
            ButtonArg::Down => Button::Down,
            ButtonArg::Left => Button::Left,
            ButtonArg::Right => Button::Right,
        }
    }
}

impl Args {
    /// Controller 1 mask built from `--hold`.
    pub fn held_mask(&self) -> u8 {
        self.hold
            .iter()
            .fold(0, |mask, &b| mask | Button::from(b).mask())
    }
}
