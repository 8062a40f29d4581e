//! Cartridge boards.
//!
//! A [`Mapper`] pairs the shared page-table engine ([`Banks`]) with one board
//! variant. Boards implement [`Board`], a fixed capability set, and are held
//! in the closed [`BoardKind`] enum so dispatch is a plain `match`.

use tracing::{debug, trace};

use crate::{
    cartridge::{Rom, TRAINER_SIZE, header::Mirroring},
    config::Config,
    error::Error,
    memory::cpu as cpu_mem,
    state::SaveStateError,
};

pub mod banks;
pub mod mapper0;
pub mod mapper1;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;
pub mod mapper7;

pub use banks::{Access, Banks, BanksState, ChrMemory, PrgMemory};
pub use mapper0::Nrom;
pub use mapper1::{Mmc1, Mmc1State};
pub use mapper2::{Uxrom, UxromState};
pub use mapper3::{Cnrom, CnromState};
pub use mapper4::{Mmc3, Mmc3State};
pub use mapper7::{Axrom, AxromState};

use self::banks::Layout;

/// Operations every board provides on top of the shared [`Banks`].
pub trait Board {
    /// PRG page granularity used by [`Banks::select_prg_page`].
    fn prg_page_size(&self) -> usize;

    /// CHR page granularity used by [`Banks::select_chr_page`].
    fn chr_page_size(&self) -> usize;

    /// Declares register windows in the bank's decode bitmap.
    fn register_ranges(&self, banks: &mut Banks) {
        banks.add_register_range(cpu_mem::PRG_ROM_START, 0xFFFF, Access::Write);
    }

    /// Power-on register values and initial bank layout.
    fn power(&mut self, banks: &mut Banks);

    /// Console reset button. Most boards ignore it.
    fn reset(&mut self, _banks: &mut Banks) {}

    fn write_register(&mut self, banks: &mut Banks, addr: u16, value: u8, cpu_cycle: u64);

    fn read_register(&mut self, _banks: &Banks, _addr: u16) -> Option<u8> {
        None
    }

    /// Every PPU address bus change, stamped with the PPU dot count.
    fn ppu_address_changed(&mut self, _addr: u16, _ppu_dot: u64) {}

    fn irq_asserted(&self) -> bool {
        false
    }

    fn save_state(&self) -> BoardState;

    /// Restores registers; `false` when `state` belongs to another variant.
    fn load_state(&mut self, state: &BoardState) -> bool;
}

/// Per-variant register snapshot.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardState {
    Nrom,
    Mmc1(Mmc1State),
    Uxrom(UxromState),
    Cnrom(CnromState),
    Mmc3(Mmc3State),
    Axrom(AxromState),
}

impl BoardState {
    pub fn variant_name(&self) -> &'static str {
        match self {
            BoardState::Nrom => "NROM",
            BoardState::Mmc1(_) => "MMC1",
            BoardState::Uxrom(_) => "UxROM",
            BoardState::Cnrom(_) => "CNROM",
            BoardState::Mmc3(_) => "MMC3",
            BoardState::Axrom(_) => "AxROM",
        }
    }
}

#[derive(Debug, Clone)]
pub enum BoardKind {
    Nrom(Nrom),
    Mmc1(Mmc1),
    Uxrom(Uxrom),
    Cnrom(Cnrom),
    Mmc3(Mmc3),
    Axrom(Axrom),
}

macro_rules! with_board {
    ($kind:expr, $board:ident => $body:expr) => {
        match $kind {
            BoardKind::Nrom($board) => $body,
            BoardKind::Mmc1($board) => $body,
            BoardKind::Uxrom($board) => $body,
            BoardKind::Cnrom($board) => $body,
            BoardKind::Mmc3($board) => $body,
            BoardKind::Axrom($board) => $body,
        }
    };
}

impl BoardKind {
    /// Board factory keyed by iNES mapper number.
    pub fn for_mapper(id: u16, rom: &Rom, config: &Config) -> Result<Self, Error> {
        let mirroring = rom.header().mirroring;
        Ok(match id {
            0 => BoardKind::Nrom(Nrom::new(mirroring)),
            1 => BoardKind::Mmc1(Mmc1::new(config.mmc1_revision)),
            2 => BoardKind::Uxrom(Uxrom::new(mirroring)),
            3 => BoardKind::Cnrom(Cnrom::new(mirroring)),
            4 => BoardKind::Mmc3(Mmc3::new(mirroring)),
            7 => BoardKind::Axrom(Axrom::new()),
            other => return Err(Error::UnsupportedMapper(other)),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoardKind::Nrom(_) => "NROM",
            BoardKind::Mmc1(_) => "MMC1",
            BoardKind::Uxrom(_) => "UxROM",
            BoardKind::Cnrom(_) => "CNROM",
            BoardKind::Mmc3(_) => "MMC3",
            BoardKind::Axrom(_) => "AxROM",
        }
    }

    fn as_board(&self) -> &dyn Board {
        with_board!(self, b => b as &dyn Board)
    }

    fn as_board_mut(&mut self) -> &mut dyn Board {
        with_board!(self, b => b as &mut dyn Board)
    }
}

/// A loaded cartridge: memory, page tables and board registers.
#[derive(Debug, Clone)]
pub struct Mapper {
    id: u16,
    banks: Banks,
    board: BoardKind,
    trainer: Option<Box<[u8]>>,
}

impl Mapper {
    /// Builds the board for `rom`, failing for mapper numbers not emulated.
    pub fn new(rom: &Rom, config: &Config) -> Result<Self, Error> {
        let header = rom.header();
        let board = BoardKind::for_mapper(header.mapper, rom, config)?;
        let layout = {
            let b = board.as_board();
            Layout {
                prg_page_size: b.prg_page_size(),
                chr_page_size: b.chr_page_size(),
                work_ram_size: header.prg_ram_size,
                battery: header.battery,
                mapper_ram_size: 0,
            }
        };
        let mut banks = Banks::new(rom.prg_rom(), rom.chr_rom(), layout);
        board.as_board().register_ranges(&mut banks);

        debug!(
            mapper = header.mapper,
            board = board.name(),
            prg = rom.prg_rom().len(),
            chr = rom.chr_rom().len(),
            battery = header.battery,
            "mapper constructed"
        );

        let mut mapper = Self {
            id: header.mapper,
            banks,
            board,
            trainer: rom.trainer().map(Into::into),
        };
        mapper.power();
        Ok(mapper)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.board.name()
    }

    pub fn board(&self) -> &BoardKind {
        &self.board
    }

    pub fn banks(&self) -> &Banks {
        &self.banks
    }

    pub fn mirroring(&self) -> Mirroring {
        self.banks.mirroring()
    }

    /// Cold start: clears volatile RAM (battery RAM survives) and re-runs the
    /// board's power-on banking.
    pub fn power(&mut self) {
        self.banks.power();
        let kind = self.banks.prg_ram_kind();
        if kind != PrgMemory::None {
            self.banks
                .map_cpu(cpu_mem::PRG_RAM_START, 0x7FFF, kind, 0, Access::ReadWrite);
        }
        let chr_kind = self.banks.default_chr_kind();
        self.banks.map_ppu(0x0000, 0x1FFF, chr_kind, 0, access_for(chr_kind));
        self.board.as_board_mut().power(&mut self.banks);

        if let Some(trainer) = &self.trainer {
            let offset = (cpu_mem::TRAINER_START - cpu_mem::PRG_RAM_START) as usize;
            let ram = match kind {
                PrgMemory::SaveRam => self.banks.save_ram_mut(),
                _ => self.banks.work_ram_mut(),
            };
            if let Some(dst) = ram.get_mut(offset..offset + TRAINER_SIZE) {
                dst.copy_from_slice(trainer);
            }
        }
    }

    pub fn reset(&mut self) {
        self.board.as_board_mut().reset(&mut self.banks);
    }

    /// CPU read of cartridge space; `None` leaves the open-bus value in place.
    pub fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        if self.banks.is_register_read(addr) {
            return self.board.as_board_mut().read_register(&self.banks, addr);
        }
        self.banks.cpu_read(addr)
    }

    /// Side-effect free read used by debuggers.
    pub fn cpu_peek(&self, addr: u16) -> Option<u8> {
        self.banks.cpu_read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8, cpu_cycle: u64) {
        if self.banks.is_register_write(addr) {
            trace!(addr = format_args!("{addr:#06X}"), value, "board register write");
            self.board
                .as_board_mut()
                .write_register(&mut self.banks, addr, value, cpu_cycle);
        } else {
            self.banks.cpu_write(addr, value);
        }
    }

    /// PPU read of `$0000-$3EFF`; unmapped pages return the low address byte.
    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.banks.ppu_read(addr).unwrap_or(addr as u8)
    }

    pub fn ppu_write(&mut self, addr: u16, value: u8) {
        self.banks.ppu_write(addr, value);
    }

    /// Notification of every PPU address bus transition.
    pub fn ppu_address_changed(&mut self, addr: u16, ppu_dot: u64) {
        self.board.as_board_mut().ppu_address_changed(addr, ppu_dot);
    }

    pub fn irq_asserted(&self) -> bool {
        self.board.as_board().irq_asserted()
    }

    /// Battery-backed RAM, when the cartridge has any.
    pub fn save_ram(&self) -> Option<&[u8]> {
        let ram = self.banks.save_ram();
        (!ram.is_empty()).then_some(ram)
    }

    /// Restores battery RAM contents; extra bytes are ignored.
    pub fn load_save_ram(&mut self, bytes: &[u8]) {
        let ram = self.banks.save_ram_mut();
        let len = ram.len().min(bytes.len());
        ram[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn save_state(&self) -> MapperState {
        MapperState {
            mapper_id: self.id,
            banks: self.banks.save_state(),
            board: self.board.as_board().save_state(),
        }
    }

    /// Restores a snapshot. Nothing is applied unless the snapshot was taken
    /// from the same board variant with the same memory layout.
    pub fn load_state(&mut self, state: &MapperState) -> Result<(), SaveStateError> {
        if state.mapper_id != self.id {
            return Err(SaveStateError::MapperMismatch {
                expected: self.id,
                found: state.mapper_id,
            });
        }
        self.banks
            .validate_state(&state.banks)
            .map_err(SaveStateError::Corrupt)?;

        let mut board = self.board.clone();
        if !board.as_board_mut().load_state(&state.board) {
            return Err(SaveStateError::BoardMismatch {
                expected: self.board.name(),
                found: state.board.variant_name(),
            });
        }
        self.board = board;
        self.banks.load_state(&state.banks);
        Ok(())
    }
}

fn access_for(kind: ChrMemory) -> Access {
    match kind {
        ChrMemory::ChrRom => Access::Read,
        ChrMemory::None => Access::None,
        _ => Access::ReadWrite,
    }
}

/// Mapper part of a save state.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperState {
    pub mapper_id: u16,
    pub banks: BanksState,
    pub board: BoardState,
}
