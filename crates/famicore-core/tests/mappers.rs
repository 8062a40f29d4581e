mod common;

use anyhow::Result;
use common::{IRQ_HANDLER, RomBuilder, console};

/// Arms the MMC3 scanline counter with a reload of 10, sets sprite patterns
/// to `$1000` and enables rendering with `mask`. The IRQ handler counts in
/// `$01` and re-arms the counter.
fn mmc3_irq_rom(mask: u8) -> Vec<u8> {
    #[rustfmt::skip]
    let reset = [
        0xA9, 0x0A,                   // LDA #$0A
        0x8D, 0x00, 0xC0,             // STA $C000  latch
        0x8D, 0x01, 0xC0,             // STA $C001  reload
        0x8D, 0x01, 0xE0,             // STA $E001  enable
        0xA9, 0x08, 0x8D, 0x00, 0x20, // LDA #$08, STA $2000
        0xA9, mask, 0x8D, 0x01, 0x20, // LDA #mask, STA $2001
        0x58,                         // CLI
        0x4C, 0x16, 0xC0,             // JMP $C016
    ];
    #[rustfmt::skip]
    let irq = [
        0xEE, 0x01, 0x00,             // INC $0001
        0x8D, 0x00, 0xE0,             // STA $E000  acknowledge
        0x8D, 0x01, 0xE0,             // STA $E001
        0x40,                         // RTI
    ];
    RomBuilder::new(4, 2, 1)
        .code(&reset)
        .at(IRQ_HANDLER, &irq)
        .build()
}

#[test]
fn mmc3_counter_raises_irqs_while_rendering() -> Result<()> {
    let mut nes = console(&mmc3_irq_rom(0x18))?;
    nes.run_frame();
    nes.run_frame();
    let after_two = nes.debug_read(0x0001);
    assert!(after_two > 0);

    // 240 visible lines plus pre-render, reload 10: a steady rate per frame.
    nes.run_frame();
    let per_frame = nes.debug_read(0x0001).wrapping_sub(after_two);
    assert!((20..=23).contains(&per_frame), "{per_frame} irqs in one frame");
    Ok(())
}

#[test]
fn mmc3_counter_idles_with_rendering_off() -> Result<()> {
    let mut nes = console(&mmc3_irq_rom(0x00))?;
    for _ in 0..3 {
        nes.run_frame();
    }
    assert_eq!(nes.debug_read(0x0001), 0);
    assert!(!nes.mapper().is_some_and(|m| m.irq_asserted()));
    Ok(())
}

#[test]
fn mmc1_serial_port_switches_prg_through_the_cpu() -> Result<()> {
    #[rustfmt::skip]
    let program = [
        0xA9, 0x01, 0x8D, 0x00, 0xE0, // LDA #$01, STA $E000  stray bit
        0xA9, 0x80, 0x8D, 0x00, 0x80, // LDA #$80, STA $8000  reset shift
        0xA9, 0x01, 0x8D, 0x00, 0xE0, // bank 5 = 0b00101, LSB first
        0xA9, 0x00, 0x8D, 0x00, 0xE0,
        0xA9, 0x01, 0x8D, 0x00, 0xE0,
        0xA9, 0x00, 0x8D, 0x00, 0xE0,
        0x8D, 0x00, 0xE0,
        0xAD, 0x00, 0x80,             // LDA $8000
        0x85, 0x00,                   // STA $00
        0x4C, 0x26, 0xC0,             // JMP $C026
    ];
    let image = RomBuilder::new(1, 8, 1)
        .tag_switchable_banks()
        .code(&program)
        .build();
    let mut nes = console(&image)?;
    nes.run_frame();

    assert_eq!(nes.debug_read(0x0000), 5);
    assert_eq!(nes.debug_read(0x8000), 5);
    // The last bank stays fixed at $C000.
    assert_eq!(nes.debug_read(0xC000), 0xA9);
    Ok(())
}

#[test]
fn mmc1_ignores_the_second_write_of_a_read_modify_write() -> Result<()> {
    // INC writes the unmodified byte, then the result on the next cycle.
    // Only the first write shifts a bit in.
    #[rustfmt::skip]
    let program = [
        0xA9, 0x80, 0x8D, 0x00, 0x80, // LDA #$80, STA $8000
        0xEE, 0xF0, 0xFF,             // INC $FFF0  shifts in 1 from $01
        0xA9, 0x00, 0x8D, 0x00, 0xE0, // then 0, 1, 0, 0
        0xA9, 0x01, 0x8D, 0x00, 0xE0,
        0xA9, 0x00, 0x8D, 0x00, 0xE0,
        0x8D, 0x00, 0xE0,
        0xAD, 0x00, 0x80,             // LDA $8000
        0x85, 0x00,                   // STA $00
        0x4C, 0x1F, 0xC0,             // JMP $C01F
    ];
    let image = RomBuilder::new(1, 8, 1)
        .tag_switchable_banks()
        .code(&program)
        .at(0xFFF0, &[0x01])
        .build();
    let mut nes = console(&image)?;
    nes.run_frame();

    assert_eq!(nes.debug_read(0x0000), 5);
    assert_eq!(nes.debug_read(0xFFF0), 0x01);
    Ok(())
}
