//! AxROM: 32 KiB PRG switching with single-screen mirroring select.

use tracing::trace;

use crate::cartridge::header::Mirroring;

use super::{Banks, Board, BoardState};

#[derive(Debug, Clone, Default)]
pub struct Axrom {
    bank: u8,
    upper_screen: bool,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxromState {
    pub bank: u8,
    pub upper_screen: bool,
}

impl Axrom {
    pub fn new() -> Self {
        Self::default()
    }

    fn mirroring(&self) -> Mirroring {
        if self.upper_screen {
            Mirroring::SingleScreenB
        } else {
            Mirroring::SingleScreenA
        }
    }
}

impl Board for Axrom {
    fn prg_page_size(&self) -> usize {
        0x8000
    }

    fn chr_page_size(&self) -> usize {
        0x2000
    }

    fn power(&mut self, banks: &mut Banks) {
        self.bank = 0;
        self.upper_screen = false;
        banks.select_prg_page(0, 0);
        banks.set_mirroring(self.mirroring());
    }

    fn write_register(&mut self, banks: &mut Banks, _addr: u16, value: u8, _cpu_cycle: u64) {
        self.bank = value & 0x0F;
        self.upper_screen = value & 0x10 != 0;
        trace!(bank = self.bank, upper = self.upper_screen, "axrom bank");
        banks.select_prg_page(0, self.bank as i32);
        banks.set_mirroring(self.mirroring());
    }

    fn save_state(&self) -> BoardState {
        BoardState::Axrom(AxromState {
            bank: self.bank,
            upper_screen: self.upper_screen,
        })
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        match state {
            BoardState::Axrom(state) => {
                self.bank = state.bank;
                self.upper_screen = state.upper_screen;
                true
            }
            _ => false,
        }
    }
}
