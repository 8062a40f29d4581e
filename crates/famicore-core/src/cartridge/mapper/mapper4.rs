//! MMC3 (TxROM): 8 KiB PRG / 1-2 KiB CHR banking and the A12 scanline IRQ.
//!
//! Registers are decoded by 8 KiB window and address parity:
//!
//! | Window        | Even address          | Odd address            |
//! |---------------|-----------------------|------------------------|
//! | `$8000-$9FFF` | bank select           | bank data              |
//! | `$A000-$BFFF` | mirroring             | PRG RAM protect        |
//! | `$C000-$DFFF` | IRQ latch             | IRQ reload             |
//! | `$E000-$FFFF` | IRQ disable + ack     | IRQ enable             |

use tracing::trace;

use crate::{
    cartridge::{
        a12_watcher::{A12Edge, A12Watcher},
        header::Mirroring,
    },
    memory::cpu as cpu_mem,
};

use super::{Access, Banks, Board, BoardState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Register {
    BankSelect,
    BankData,
    Mirroring,
    PrgRamProtect,
    IrqLatch,
    IrqReload,
    IrqDisable,
    IrqEnable,
}

impl Register {
    fn from_addr(addr: u16) -> Self {
        let odd = addr & 1 != 0;
        match (addr & 0xE000, odd) {
            (0x8000, false) => Register::BankSelect,
            (0x8000, true) => Register::BankData,
            (0xA000, false) => Register::Mirroring,
            (0xA000, true) => Register::PrgRamProtect,
            (0xC000, false) => Register::IrqLatch,
            (0xC000, true) => Register::IrqReload,
            (_, false) => Register::IrqDisable,
            (_, true) => Register::IrqEnable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mmc3 {
    header_mirroring: Mirroring,
    bank_select: u8,
    banks: [u8; 8],
    mirroring: Mirroring,
    prg_ram_protect: u8,
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
    a12: A12Watcher,
    /// Number of times the counter was clocked (debug aid, not hardware).
    clocks: u64,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mmc3State {
    pub bank_select: u8,
    pub banks: [u8; 8],
    pub mirroring: Mirroring,
    pub prg_ram_protect: u8,
    pub irq_latch: u8,
    pub irq_counter: u8,
    pub irq_reload: bool,
    pub irq_enabled: bool,
    pub irq_pending: bool,
    pub a12: A12Watcher,
    pub clocks: u64,
}

impl Mmc3 {
    pub fn new(mirroring: Mirroring) -> Self {
        Self {
            header_mirroring: mirroring,
            bank_select: 0,
            banks: [0, 2, 4, 5, 6, 7, 0, 1],
            mirroring,
            prg_ram_protect: 0x80,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            a12: A12Watcher::new(),
            clocks: 0,
        }
    }

    pub fn irq_counter(&self) -> u8 {
        self.irq_counter
    }

    /// How many A12 rising edges clocked the counter since power-on.
    pub fn counter_clocks(&self) -> u64 {
        self.clocks
    }

    fn update_banks(&self, banks: &mut Banks) {
        let r = |i: usize| self.banks[i] as i32;

        if self.bank_select & 0x40 == 0 {
            banks.select_prg_page(0, r(6));
            banks.select_prg_page(2, -2);
        } else {
            banks.select_prg_page(0, -2);
            banks.select_prg_page(2, r(6));
        }
        banks.select_prg_page(1, r(7));
        banks.select_prg_page(3, -1);

        // CHR inversion swaps the 2 KiB and 1 KiB halves.
        let base = if self.bank_select & 0x80 == 0 { 0 } else { 4 };
        let kind = banks.default_chr_kind();
        banks.select_chr_page(base, r(0) & !1, kind);
        banks.select_chr_page(base + 1, r(0) | 1, kind);
        banks.select_chr_page(base + 2, r(1) & !1, kind);
        banks.select_chr_page(base + 3, r(1) | 1, kind);
        for i in 0..4 {
            banks.select_chr_page((base + 4 + i) % 8, r(2 + i), kind);
        }

        banks.set_mirroring(self.mirroring);

        let ram_kind = banks.prg_ram_kind();
        let access = match (self.prg_ram_protect & 0x80 != 0, self.prg_ram_protect & 0x40 != 0) {
            (false, _) => Access::None,
            (true, false) => Access::ReadWrite,
            (true, true) => Access::Read,
        };
        banks.map_cpu(cpu_mem::PRG_RAM_START, 0x7FFF, ram_kind, 0, access);
    }

    fn clock_counter(&mut self) {
        self.clocks += 1;
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            trace!("mmc3 irq asserted");
            self.irq_pending = true;
        }
    }
}

impl Board for Mmc3 {
    fn prg_page_size(&self) -> usize {
        0x2000
    }

    fn chr_page_size(&self) -> usize {
        0x0400
    }

    fn power(&mut self, banks: &mut Banks) {
        *self = Self::new(self.header_mirroring);
        self.update_banks(banks);
    }

    fn write_register(&mut self, banks: &mut Banks, addr: u16, value: u8, _cpu_cycle: u64) {
        match Register::from_addr(addr) {
            Register::BankSelect => self.bank_select = value,
            Register::BankData => self.banks[(self.bank_select & 0x07) as usize] = value,
            Register::Mirroring => {
                if self.header_mirroring != Mirroring::FourScreen {
                    self.mirroring = if value & 0x01 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            Register::PrgRamProtect => self.prg_ram_protect = value,
            Register::IrqLatch => self.irq_latch = value,
            Register::IrqReload => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            Register::IrqDisable => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            Register::IrqEnable => self.irq_enabled = true,
        }
        self.update_banks(banks);
    }

    fn ppu_address_changed(&mut self, addr: u16, ppu_dot: u64) {
        if self.a12.update(addr, ppu_dot) == A12Edge::Rise {
            self.clock_counter();
        }
    }

    fn irq_asserted(&self) -> bool {
        self.irq_pending
    }

    fn save_state(&self) -> BoardState {
        BoardState::Mmc3(Mmc3State {
            bank_select: self.bank_select,
            banks: self.banks,
            mirroring: self.mirroring,
            prg_ram_protect: self.prg_ram_protect,
            irq_latch: self.irq_latch,
            irq_counter: self.irq_counter,
            irq_reload: self.irq_reload,
            irq_enabled: self.irq_enabled,
            irq_pending: self.irq_pending,
            a12: self.a12,
            clocks: self.clocks,
        })
    }

    fn load_state(&mut self, state: &BoardState) -> bool {
        let BoardState::Mmc3(state) = state else {
            return false;
        };
        self.bank_select = state.bank_select;
        self.banks = state.banks;
        self.mirroring = state.mirroring;
        self.prg_ram_protect = state.prg_ram_protect;
        self.irq_latch = state.irq_latch;
        self.irq_counter = state.irq_counter;
        self.irq_reload = state.irq_reload;
        self.irq_enabled = state.irq_enabled;
        self.irq_pending = state.irq_pending;
        self.a12 = state.a12;
        self.clocks = state.clocks;
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cartridge::{
            header::Mirroring,
            mapper::{BoardKind, Mapper, test_support::rom},
        },
        config::Config,
    };

    fn mmc3(mapper: &Mapper) -> &super::Mmc3 {
        match mapper.board() {
            BoardKind::Mmc3(board) => board,
            other => panic!("unexpected board {}", other.name()),
        }
    }

    fn new_mapper() -> Mapper {
        Mapper::new(&rom(4, 8, 8, 0), &Config::default()).expect("mapper")
    }

    /// One scanline worth of A12 activity: low for background, high for sprites.
    fn scanline(mapper: &mut Mapper, line: u64) {
        let base = line * 341;
        mapper.ppu_address_changed(0x0000, base + 1);
        mapper.ppu_address_changed(0x0FF0, base + 200);
        mapper.ppu_address_changed(0x1000, base + 261);
        mapper.ppu_address_changed(0x2000, base + 265);
        mapper.ppu_address_changed(0x1010, base + 269);
    }

    #[test]
    fn prg_modes_swap_fixed_second_last_bank() {
        let mut mapper = new_mapper();
        mapper.cpu_write(0x8000, 6, 0);
        mapper.cpu_write(0x8001, 3, 0);
        mapper.cpu_write(0x8000, 7, 0);
        mapper.cpu_write(0x8001, 5, 0);
        assert_eq!(mapper.cpu_read(0x8000), Some(3));
        assert_eq!(mapper.cpu_read(0xA000), Some(5));
        assert_eq!(mapper.cpu_read(0xC000), Some(14));
        assert_eq!(mapper.cpu_read(0xE000), Some(15));

        mapper.cpu_write(0x8000, 0x46, 0);
        assert_eq!(mapper.cpu_read(0x8000), Some(14));
        assert_eq!(mapper.cpu_read(0xC000), Some(3));
    }

    #[test]
    fn chr_inversion_moves_two_kib_banks() {
        let mut mapper = new_mapper();
        mapper.cpu_write(0x8000, 0, 0);
        mapper.cpu_write(0x8001, 9, 0);
        mapper.cpu_write(0x8000, 2, 0);
        mapper.cpu_write(0x8001, 20, 0);
        // R0 ignores its low bit.
        assert_eq!(mapper.ppu_read(0x0000), 8);
        assert_eq!(mapper.ppu_read(0x0400), 9);
        assert_eq!(mapper.ppu_read(0x1000), 20);

        mapper.cpu_write(0x8000, 0x80, 0);
        assert_eq!(mapper.ppu_read(0x1000), 8);
        assert_eq!(mapper.ppu_read(0x1400), 9);
        assert_eq!(mapper.ppu_read(0x0000), 20);
    }

    #[test]
    fn mirroring_and_ram_protect() {
        let mut mapper = new_mapper();
        mapper.cpu_write(0xA000, 1, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        mapper.cpu_write(0xA000, 0, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);

        mapper.cpu_write(0x6000, 0x11, 0);
        mapper.cpu_write(0xA001, 0xC0, 0);
        mapper.cpu_write(0x6000, 0x22, 0);
        assert_eq!(mapper.cpu_read(0x6000), Some(0x11));
        mapper.cpu_write(0xA001, 0x00, 0);
        assert_eq!(mapper.cpu_read(0x6000), None);
    }

    #[test]
    fn irq_fires_after_latch_plus_one_rises() {
        let mut mapper = new_mapper();
        mapper.cpu_write(0xC000, 3, 0);
        mapper.cpu_write(0xC001, 0, 0);
        mapper.cpu_write(0xE001, 0, 0);

        for line in 0..3 {
            scanline(&mut mapper, line);
            assert!(!mapper.irq_asserted(), "line {line}");
        }
        scanline(&mut mapper, 3);
        assert!(mapper.irq_asserted());

        // The short low at dot 265 never produced an extra clock.
        assert_eq!(mmc3(&mapper).counter_clocks(), 4);

        mapper.cpu_write(0xE000, 0, 0);
        assert!(!mapper.irq_asserted());
    }

    #[test]
    fn constant_a12_never_clocks_counter() {
        let mut mapper = new_mapper();
        mapper.cpu_write(0xC000, 1, 0);
        mapper.cpu_write(0xC001, 0, 0);
        mapper.cpu_write(0xE001, 0, 0);
        for dot in (0..341 * 262).step_by(2) {
            mapper.ppu_address_changed(0x0ABC, dot);
        }
        assert_eq!(mmc3(&mapper).counter_clocks(), 0);
        assert!(!mapper.irq_asserted());
    }
}
