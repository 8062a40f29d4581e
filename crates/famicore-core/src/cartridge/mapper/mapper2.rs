//! UxROM: switchable 16 KiB bank at `$8000`, last bank fixed at `$C000`.

use tracing::trace;

use crate::cartridge::header::Mirroring;

use super::{Banks, Board, BoardState};

#[derive(Debug, Clone)]
pub struct Uxrom {
    mirroring: Mirroring,
    bank: u8,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UxromState {
    pub bank: u8,
}

impl Uxrom {
    pub fn new(mirroring: Mirroring) -> Self {
        Self { mirroring, bank: 0 }
    }
}

impl Board for Uxrom {
    fn prg_page_size(&self) -> usize {
        0x4000
    }

    fn chr_page_size(&self) -> usize {
        0x2000
    }

    fn power(&mut self, banks: &mut Banks) {
        self.bank = 0;
        banks.select_prg_page(0, 0);
        banks.select_prg_page(1, -1);
        banks.set_mirroring(self.mirroring);
    }

    fn write_register(&mut self, banks: &mut Banks, _addr: u16, value: u8, _cpu_cycle: u64) {
        self.bank = value;
        trace!(bank = value, "uxrom prg bank");
        banks.select_prg_page(0, value as i32);
    }

    fn save_state(&self) -> BoardState {
        BoardState::Uxrom(UxromState { bank: self.bank })
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        match state {
            BoardState::Uxrom(state) => {
                self.bank = state.bank;
                true
            }
            _ => false,
        }
    }
}
