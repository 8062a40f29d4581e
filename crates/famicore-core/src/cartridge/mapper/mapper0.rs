//! NROM: fixed 16/32 KiB PRG and 8 KiB CHR, no registers.

use crate::cartridge::header::Mirroring;

use super::{Banks, Board, BoardState};

#[derive(Debug, Clone)]
pub struct Nrom {
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(mirroring: Mirroring) -> Self {
        Self { mirroring }
    }
}

impl Board for Nrom {
    fn prg_page_size(&self) -> usize {
        0x4000
    }

    fn chr_page_size(&self) -> usize {
        0x2000
    }

    fn register_ranges(&self, _banks: &mut Banks) {}

    fn power(&mut self, banks: &mut Banks) {
        // A 16 KiB image appears twice; -1 resolves to bank 0 in that case.
        banks.select_prg_page(0, 0);
        banks.select_prg_page(1, -1);
        banks.set_mirroring(self.mirroring);
    }

    fn write_register(&mut self, _banks: &mut Banks, _addr: u16, _value: u8, _cpu_cycle: u64) {}

    fn save_state(&self) -> BoardState {
        BoardState::Nrom
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        matches!(state, BoardState::Nrom)
    }
}
