//! CNROM: fixed PRG, 8 KiB CHR bank selected by any write to `$8000-$FFFF`.

use tracing::trace;

use crate::cartridge::header::Mirroring;

use super::{Banks, Board, BoardState};

#[derive(Debug, Clone)]
pub struct Cnrom {
    mirroring: Mirroring,
    chr_bank: u8,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CnromState {
    pub chr_bank: u8,
}

impl Cnrom {
    pub fn new(mirroring: Mirroring) -> Self {
        Self {
            mirroring,
            chr_bank: 0,
        }
    }
}

impl Board for Cnrom {
    fn prg_page_size(&self) -> usize {
        0x4000
    }

    fn chr_page_size(&self) -> usize {
        0x2000
    }

    fn power(&mut self, banks: &mut Banks) {
        self.chr_bank = 0;
        banks.select_prg_page(0, 0);
        banks.select_prg_page(1, -1);
        banks.select_chr_page(0, 0, banks.default_chr_kind());
        banks.set_mirroring(self.mirroring);
    }

    fn write_register(&mut self, banks: &mut Banks, _addr: u16, value: u8, _cpu_cycle: u64) {
        self.chr_bank = value;
        trace!(bank = value, "cnrom chr bank");
        banks.select_chr_page(0, value as i32, banks.default_chr_kind());
    }

    fn save_state(&self) -> BoardState {
        BoardState::Cnrom(CnromState {
            chr_bank: self.chr_bank,
        })
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        match state {
            BoardState::Cnrom(state) => {
                self.chr_bank = state.chr_bank;
                true
            }
            _ => false,
        }
    }
}
