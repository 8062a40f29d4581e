//! MMC1 (SxROM).
//!
//! The CPU programs MMC1 one bit at a time: each write to `$8000-$FFFF`
//! shifts data bit 0 into the top of a 5-bit shift register. The fifth write
//! copies the register into one of four internal registers chosen by address
//! bits 13-14. Writing a value with bit 7 set clears the shift register and
//! forces PRG mode 3 instead.
//!
//! | Target | Window        | Meaning                                         |
//! |--------|---------------|-------------------------------------------------|
//! | 0      | `$8000-$9FFF` | control: mirroring, PRG mode, CHR mode          |
//! | 1      | `$A000-$BFFF` | CHR bank 0 (4 KiB, or 8 KiB with low bit clear) |
//! | 2      | `$C000-$DFFF` | CHR bank 1 (4 KiB mode only)                    |
//! | 3      | `$E000-$FFFF` | PRG bank, bit 4 = work RAM disable (MMC1B)      |

use tracing::trace;

use crate::{
    cartridge::header::Mirroring,
    config::Mmc1Revision,
    memory::cpu as cpu_mem,
};

use super::{Access, Banks, Board, BoardState};

const SHIFT_RESET: u8 = 0x10;

#[derive(Debug, Clone)]
pub struct Mmc1 {
    revision: Mmc1Revision,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
    shift_reg: u8,
    shift_count: u8,
    /// CPU cycle of the last serial write; writes on the next cycle are ignored.
    last_write_cycle: Option<u64>,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mmc1State {
    pub control: u8,
    pub chr_bank0: u8,
    pub chr_bank1: u8,
    pub prg_bank: u8,
    pub shift_reg: u8,
    pub shift_count: u8,
    pub last_write_cycle: Option<u64>,
}

impl Mmc1 {
    pub fn new(revision: Mmc1Revision) -> Self {
        Self {
            revision,
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            shift_reg: SHIFT_RESET,
            shift_count: 0,
            last_write_cycle: None,
        }
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn prg_bank(&self) -> u8 {
        self.prg_bank
    }

    pub fn chr_banks(&self) -> (u8, u8) {
        (self.chr_bank0, self.chr_bank1)
    }

    fn reset_shift(&mut self) {
        self.shift_reg = SHIFT_RESET;
        self.shift_count = 0;
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenA,
            1 => Mirroring::SingleScreenB,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn update_banks(&self, banks: &mut Banks) {
        banks.set_mirroring(self.mirroring());

        let prg = (self.prg_bank & 0x0F) as i32;
        match (self.control >> 2) & 0x03 {
            0 | 1 => {
                banks.select_prg_page(0, prg & !1);
                banks.select_prg_page(1, prg | 1);
            }
            2 => {
                banks.select_prg_page(0, 0);
                banks.select_prg_page(1, prg);
            }
            _ => {
                banks.select_prg_page(0, prg);
                banks.select_prg_page(1, -1);
            }
        }

        let kind = banks.default_chr_kind();
        if self.control & 0x10 == 0 {
            let bank = (self.chr_bank0 & 0x1E) as i32;
            banks.select_chr_page(0, bank, kind);
            banks.select_chr_page(1, bank | 1, kind);
        } else {
            banks.select_chr_page(0, self.chr_bank0 as i32, kind);
            banks.select_chr_page(1, self.chr_bank1 as i32, kind);
        }

        let ram_kind = banks.prg_ram_kind();
        let ram_enabled = match self.revision {
            Mmc1Revision::A => true,
            Mmc1Revision::B => self.prg_bank & 0x10 == 0,
        };
        let access = if ram_enabled {
            Access::ReadWrite
        } else {
            Access::None
        };
        banks.map_cpu(cpu_mem::PRG_RAM_START, 0x7FFF, ram_kind, 0, access);
    }
}

impl Board for Mmc1 {
    fn prg_page_size(&self) -> usize {
        0x4000
    }

    fn chr_page_size(&self) -> usize {
        0x1000
    }

    fn power(&mut self, banks: &mut Banks) {
        *self = Self::new(self.revision);
        self.update_banks(banks);
    }

    fn write_register(&mut self, banks: &mut Banks, addr: u16, value: u8, cpu_cycle: u64) {
        // The serial port ignores the second write of a read-modify-write
        // instruction (two writes on consecutive cycles).
        let consecutive = self
            .last_write_cycle
            .is_some_and(|last| cpu_cycle == last.wrapping_add(1));
        self.last_write_cycle = Some(cpu_cycle);
        if consecutive {
            return;
        }

        if value & 0x80 != 0 {
            self.reset_shift();
            self.control |= 0x0C;
            self.update_banks(banks);
            return;
        }

        self.shift_reg = (self.shift_reg >> 1) | ((value & 0x01) << 4);
        self.shift_count += 1;
        if self.shift_count < 5 {
            return;
        }

        let data = self.shift_reg & 0x1F;
        match (addr >> 13) & 0x03 {
            0 => self.control = data,
            1 => self.chr_bank0 = data,
            2 => self.chr_bank1 = data,
            _ => self.prg_bank = data,
        }
        trace!(
            target_reg = (addr >> 13) & 0x03,
            data,
            "mmc1 register commit"
        );
        self.reset_shift();
        self.update_banks(banks);
    }

    fn save_state(&self) -> BoardState {
        BoardState::Mmc1(Mmc1State {
            control: self.control,
            chr_bank0: self.chr_bank0,
            chr_bank1: self.chr_bank1,
            prg_bank: self.prg_bank,
            shift_reg: self.shift_reg,
            shift_count: self.shift_count,
            last_write_cycle: self.last_write_cycle,
        })
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        let BoardState::Mmc1(state) = state else {
            return false;
        };
        self.control = state.control;
        self.chr_bank0 = state.chr_bank0;
        self.chr_bank1 = state.chr_bank1;
        self.prg_bank = state.prg_bank;
        self.shift_reg = state.shift_reg;
        self.shift_count = state.shift_count;
        self.last_write_cycle = state.last_write_cycle;
        true
    }
}
