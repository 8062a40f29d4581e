#![allow(dead_code)]

use anyhow::{Context, Result};
use famicore_core::Nes;

pub const PRG_BANK: usize = 0x4000;
pub const CHR_BANK: usize = 0x2000;

/// Code starts at `$C000`, the first byte of the last 16 KiB PRG bank. Every
/// supported board maps that bank there at power-on.
pub const CODE_ORIGIN: u16 = 0xC000;
pub const NMI_HANDLER: u16 = 0xC100;
pub const IRQ_HANDLER: u16 = 0xC180;

/// Assembles iNES images in memory.
#[derive(Debug, Clone)]
pub struct RomBuilder {
    mapper: u8,
    flags6: u8,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl RomBuilder {
    pub fn new(mapper: u8, prg_banks: usize, chr_banks: usize) -> Self {
        let chr = (0..chr_banks * CHR_BANK)
            .map(|i| (i as u32).wrapping_mul(0x9E37_79B9).rotate_left(7) as u8)
            .collect();
        let mut builder = Self {
            mapper,
            flags6: 0,
            prg: vec![0xEA; prg_banks * PRG_BANK],
            chr,
        };
        // Default handlers just return.
        builder = builder.at(NMI_HANDLER, &[0x40]).at(IRQ_HANDLER, &[0x40]);
        builder.vectors(NMI_HANDLER, CODE_ORIGIN, IRQ_HANDLER)
    }

    pub fn vertical(mut self) -> Self {
        self.flags6 |= 0x01;
        self
    }

    pub fn battery(mut self) -> Self {
        self.flags6 |= 0x02;
        self
    }

    /// Fills every PRG bank except the last with its 16 KiB bank number.
    pub fn tag_switchable_banks(mut self) -> Self {
        let last = self.prg.len() / PRG_BANK - 1;
        for (bank, chunk) in self.prg.chunks_mut(PRG_BANK).take(last).enumerate() {
            chunk.fill(bank as u8);
        }
        self
    }

    /// Places `bytes` at a CPU address inside the last 16 KiB bank.
    pub fn at(mut self, addr: u16, bytes: &[u8]) -> Self {
        let base = self.prg.len() - PRG_BANK;
        let offset = base + usize::from(addr - CODE_ORIGIN);
        self.prg[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn code(self, bytes: &[u8]) -> Self {
        self.at(CODE_ORIGIN, bytes)
    }

    pub fn vectors(self, nmi: u16, reset: u16, irq: u16) -> Self {
        let mut table = [0u8; 6];
        table[..2].copy_from_slice(&nmi.to_le_bytes());
        table[2..4].copy_from_slice(&reset.to_le_bytes());
        table[4..].copy_from_slice(&irq.to_le_bytes());
        self.at(0xFFFA, &table)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; 16];
        bytes[..4].copy_from_slice(b"NES\x1A");
        bytes[4] = (self.prg.len() / PRG_BANK) as u8;
        bytes[5] = (self.chr.len() / CHR_BANK) as u8;
        bytes[6] = self.flags6 | ((self.mapper & 0x0F) << 4);
        bytes[7] = self.mapper & 0xF0;
        bytes.extend_from_slice(&self.prg);
        bytes.extend_from_slice(&self.chr);
        bytes
    }
}

pub fn console(image: &[u8]) -> Result<Nes> {
    let mut nes = Nes::new();
    nes.load_rom(image).context("loading synthetic rom")?;
    Ok(nes)
}

/// Plays a pulse tone, enables NMI and background rendering, then spins.
/// The NMI handler counts frames in `$00` and scrolls by that count.
pub fn demo_rom(mapper: u8) -> RomBuilder {
    #[rustfmt::skip]
    let reset = [
        0xA9, 0x01, 0x8D, 0x15, 0x40, // LDA #$01, STA $4015
        0xA9, 0xBF, 0x8D, 0x00, 0x40, // LDA #$BF, STA $4000
        0xA9, 0xFD, 0x8D, 0x02, 0x40, // LDA #$FD, STA $4002
        0xA9, 0x00, 0x8D, 0x03, 0x40, // LDA #$00, STA $4003
        0xA9, 0x80, 0x8D, 0x00, 0x20, // LDA #$80, STA $2000
        0xA9, 0x0A, 0x8D, 0x01, 0x20, // LDA #$0A, STA $2001
        0x4C, 0x1E, 0xC0,             // JMP $C01E
    ];
    #[rustfmt::skip]
    let nmi = [
        0xE6, 0x00,                   // INC $00
        0xA5, 0x00,                   // LDA $00
        0x8D, 0x05, 0x20,             // STA $2005
        0x8D, 0x05, 0x20,             // STA $2005
        0x40,                         // RTI
    ];
    RomBuilder::new(mapper, 2, 1).code(&reset).at(NMI_HANDLER, &nmi)
}
