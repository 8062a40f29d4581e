mod args;

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use clap::Parser;
use famicore_core::{Config, Nes, SaveState, memory::ppu as ppu_mem};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::args::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;

    let config = Config {
        sample_rate: args.sample_rate,
        trace_capacity: args.trace.unwrap_or(0),
        ..Config::default()
    };
    let mut nes = Nes::with_config(config);

    let image = fs::read(&args.rom).with_context(|| format!("reading {}", args.rom.display()))?;
    nes.load_rom(&image)
        .with_context(|| format!("loading {}", args.rom.display()))?;
    info!(
        mapper = nes.mapper().map(|m| m.name()),
        rom = %args.rom.display(),
        "cartridge inserted"
    );

    if let Some(path) = &args.load_state {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let state = SaveState::from_bytes(&bytes)?;
        nes.load_state(&state)?;
        info!(frame = state.meta.frame, "state restored");
    }

    nes.set_buttons(0, args.held_mask());

    let mut pcm = match &args.pcm {
        Some(path) => Some(BufWriter::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };
    let mut sample_count = 0usize;
    for _ in 0..args.frames {
        nes.run_frame();
        let samples = nes.audio_samples();
        sample_count += samples.len();
        if let Some(out) = pcm.as_mut() {
            for sample in samples {
                out.write_all(&sample.to_le_bytes())?;
            }
        }
    }
    if let Some(mut out) = pcm {
        out.flush()?;
    }

    let picture = nes.palette_indices();
    let mut hasher = crc32fast::Hasher::new();
    for index in picture {
        hasher.update(&index.to_le_bytes());
    }
    println!("frames:  {}", nes.frame_count());
    println!("picture: {:08X}", hasher.finalize());
    println!("samples: {sample_count}");

    if let Some(path) = &args.screenshot {
        write_ppm(path, &nes.frame_buffer())?;
    }

    if args.trace.is_some() {
        for entry in nes.trace().iter() {
            println!("{entry}");
        }
    }

    if let Some(path) = &args.save_state {
        let bytes = nes.save_state()?.to_bytes()?;
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "state saved");
    }
    Ok(())
}

fn write_ppm(path: &Path, rgb: &[u8]) -> Result<()> {
    let mut out = BufWriter::new(
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    write!(
        out,
        "P6\n{} {}\n255\n",
        ppu_mem::SCREEN_WIDTH,
        ppu_mem::SCREEN_HEIGHT
    )?;
    out.write_all(rgb)?;
    out.flush()?;
    Ok(())
}
