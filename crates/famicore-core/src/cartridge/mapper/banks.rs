//! Paged address translation shared by every board.
//!
//! Both address spaces are split into 256-byte pages. Each page records which
//! backing array it reads from, the byte offset inside that array, and whether
//! the CPU/PPU may read or write it. Boards never decode addresses themselves;
//! they reprogram the tables through [`Banks::select_prg_page`],
//! [`Banks::select_chr_page`], [`Banks::map_cpu`] and [`Banks::set_mirroring`]
//! whenever one of their registers changes.

use crate::{
    cartridge::header::Mirroring,
    memory::{cpu as cpu_mem, ppu as ppu_mem},
};

/// Granularity of both page tables.
pub const PAGE_SIZE: usize = 0x100;
/// Pages covering the 64 KiB CPU space.
pub const CPU_PAGE_COUNT: usize = 0x100;
/// Pages covering the 16 KiB PPU space.
pub const PPU_PAGE_COUNT: usize = 0x40;
/// Nametable RAM owned by the cartridge slot (enough for four-screen boards).
pub const VRAM_SIZE: usize = 0x1000;
/// CHR RAM allocated for boards without CHR ROM.
pub const CHR_RAM_SIZE: usize = 0x2000;

/// Backing store of a CPU page.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrgMemory {
    #[default]
    None,
    PrgRom,
    WorkRam,
    SaveRam,
    MapperRam,
}

/// Backing store of a PPU page.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChrMemory {
    #[default]
    None,
    ChrRom,
    ChrRam,
    Vram,
}

#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    None,
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub const fn readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub const fn writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

/// One 256-byte page table entry.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Page<K> {
    pub kind: K,
    pub offset: usize,
    pub access: Access,
}

/// Set of CPU addresses decoded by a board's registers.
#[derive(Debug, Clone)]
pub(crate) struct RegisterMap {
    read: Box<[u64]>,
    write: Box<[u64]>,
}

impl RegisterMap {
    fn new() -> Self {
        Self {
            read: vec![0; 0x10000 / 64].into_boxed_slice(),
            write: vec![0; 0x10000 / 64].into_boxed_slice(),
        }
    }

    fn add(&mut self, start: u16, end: u16, access: Access) {
        for addr in start..=end {
            let (word, bit) = (addr as usize / 64, addr as usize % 64);
            if access.readable() {
                self.read[word] |= 1 << bit;
            }
            if access.writable() {
                self.write[word] |= 1 << bit;
            }
        }
    }

    #[inline]
    fn test(bits: &[u64], addr: u16) -> bool {
        bits[addr as usize / 64] & (1 << (addr as usize % 64)) != 0
    }
}

/// Memory arrays of one cartridge plus the page tables addressing them.
#[derive(Debug, Clone)]
pub struct Banks {
    prg_rom: Box<[u8]>,
    chr_rom: Box<[u8]>,
    work_ram: Vec<u8>,
    save_ram: Vec<u8>,
    mapper_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    vram: Vec<u8>,
    cpu_pages: Vec<Page<PrgMemory>>,
    ppu_pages: Vec<Page<ChrMemory>>,
    registers: RegisterMap,
    prg_page_size: usize,
    chr_page_size: usize,
    mirroring: Mirroring,
}

/// Mutable part of [`Banks`] captured in a save state.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanksState {
    pub work_ram: Vec<u8>,
    pub save_ram: Vec<u8>,
    pub mapper_ram: Vec<u8>,
    pub chr_ram: Vec<u8>,
    pub vram: Vec<u8>,
    pub cpu_pages: Vec<Page<PrgMemory>>,
    pub ppu_pages: Vec<Page<ChrMemory>>,
    pub mirroring: Mirroring,
}

/// Static description used to allocate a [`Banks`] instance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub prg_page_size: usize,
    pub chr_page_size: usize,
    pub work_ram_size: usize,
    pub battery: bool,
    pub mapper_ram_size: usize,
}

impl Banks {
    pub(crate) fn new(prg_rom: &[u8], chr_rom: &[u8], layout: Layout) -> Self {
        let (work_ram, save_ram) = if layout.battery {
            (Vec::new(), vec![0; layout.work_ram_size])
        } else {
            (vec![0; layout.work_ram_size], Vec::new())
        };
        let chr_ram = if chr_rom.is_empty() {
            vec![0; CHR_RAM_SIZE]
        } else {
            Vec::new()
        };
        Self {
            prg_rom: prg_rom.into(),
            chr_rom: chr_rom.into(),
            work_ram,
            save_ram,
            mapper_ram: vec![0; layout.mapper_ram_size],
            chr_ram,
            vram: vec![0; VRAM_SIZE],
            cpu_pages: vec![Page::default(); CPU_PAGE_COUNT],
            ppu_pages: vec![Page::default(); PPU_PAGE_COUNT],
            registers: RegisterMap::new(),
            prg_page_size: layout.prg_page_size,
            chr_page_size: layout.chr_page_size,
            mirroring: Mirroring::default(),
        }
    }

    /// Clears volatile RAM and every page mapping (register decode is kept).
    pub(crate) fn power(&mut self) {
        self.work_ram.fill(0);
        self.mapper_ram.fill(0);
        self.chr_ram.fill(0);
        self.vram.fill(0);
        self.cpu_pages.fill(Page::default());
        self.ppu_pages.fill(Page::default());
    }

    pub fn prg_rom_len(&self) -> usize {
        self.prg_rom.len()
    }

    pub fn chr_rom_len(&self) -> usize {
        self.chr_rom.len()
    }

    pub fn has_chr_ram(&self) -> bool {
        !self.chr_ram.is_empty()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// The `$6000-$7FFF` RAM kind for this cartridge (battery or plain).
    pub fn prg_ram_kind(&self) -> PrgMemory {
        if !self.save_ram.is_empty() {
            PrgMemory::SaveRam
        } else if !self.work_ram.is_empty() {
            PrgMemory::WorkRam
        } else {
            PrgMemory::None
        }
    }

    pub fn save_ram(&self) -> &[u8] {
        &self.save_ram
    }

    pub fn save_ram_mut(&mut self) -> &mut [u8] {
        &mut self.save_ram
    }

    pub fn work_ram_mut(&mut self) -> &mut [u8] {
        &mut self.work_ram
    }

    /// Marks `start..=end` as board registers for the given direction(s).
    pub(crate) fn add_register_range(&mut self, start: u16, end: u16, access: Access) {
        self.registers.add(start, end, access);
    }

    #[inline]
    pub fn is_register_read(&self, addr: u16) -> bool {
        RegisterMap::test(&self.registers.read, addr)
    }

    #[inline]
    pub fn is_register_write(&self, addr: u16) -> bool {
        RegisterMap::test(&self.registers.write, addr)
    }

    /// Maps `start..=end` (page aligned) onto `kind` beginning at byte `offset`.
    pub fn map_cpu(&mut self, start: u16, end: u16, kind: PrgMemory, offset: usize, access: Access) {
        let first = start as usize / PAGE_SIZE;
        let last = end as usize / PAGE_SIZE;
        for (i, page) in self.cpu_pages[first..=last].iter_mut().enumerate() {
            *page = Page {
                kind,
                offset: offset + i * PAGE_SIZE,
                access,
            };
        }
    }

    /// Maps `start..=end` (page aligned) in PPU space onto `kind` at `offset`.
    pub fn map_ppu(&mut self, start: u16, end: u16, kind: ChrMemory, offset: usize, access: Access) {
        let first = start as usize / PAGE_SIZE;
        let last = end as usize / PAGE_SIZE;
        for (i, page) in self.ppu_pages[first..=last].iter_mut().enumerate() {
            *page = Page {
                kind,
                offset: offset + i * PAGE_SIZE,
                access,
            };
        }
    }

    pub fn unmap_cpu(&mut self, start: u16, end: u16) {
        self.map_cpu(start, end, PrgMemory::None, 0, Access::None);
    }

    /// Resolves a possibly negative bank index against `count` banks.
    fn resolve_bank(bank: i32, count: usize) -> usize {
        if bank < 0 {
            (bank as i64).rem_euclid(count.max(1) as i64) as usize
        } else {
            bank as usize
        }
    }

    /// Points PRG slot `slot` (of the board's PRG granularity, counted from
    /// `$8000`) at `bank`. Negative banks count from the end of PRG ROM.
    pub fn select_prg_page(&mut self, slot: usize, bank: i32) {
        let size = self.prg_page_size;
        let bank = Self::resolve_bank(bank, self.prg_rom.len() / size);
        let start = cpu_mem::PRG_ROM_START as usize + slot * size;
        self.map_cpu(
            start as u16,
            (start + size - 1) as u16,
            PrgMemory::PrgRom,
            bank * size,
            Access::Read,
        );
    }

    /// Points CHR slot `slot` (of the board's CHR granularity) at `bank` of
    /// `kind`. Negative banks count from the end of the chosen memory.
    pub fn select_chr_page(&mut self, slot: usize, bank: i32, kind: ChrMemory) {
        let size = self.chr_page_size;
        let len = match kind {
            ChrMemory::ChrRom => self.chr_rom.len(),
            ChrMemory::ChrRam => self.chr_ram.len(),
            ChrMemory::Vram => self.vram.len(),
            ChrMemory::None => 0,
        };
        let bank = Self::resolve_bank(bank, len / size);
        let access = match kind {
            ChrMemory::ChrRom => Access::Read,
            ChrMemory::None => Access::None,
            _ => Access::ReadWrite,
        };
        let start = slot * size;
        self.map_ppu(
            start as u16,
            (start + size - 1) as u16,
            kind,
            bank * size,
            access,
        );
    }

    /// CHR ROM when the cartridge has it, otherwise CHR RAM.
    pub fn default_chr_kind(&self) -> ChrMemory {
        if self.chr_rom.is_empty() {
            ChrMemory::ChrRam
        } else {
            ChrMemory::ChrRom
        }
    }

    /// Rebuilds the `$2000-$3EFF` nametable pages for `mirroring`.
    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
        let nt_pages = ppu_mem::NAMETABLE_SIZE / PAGE_SIZE;
        for (table, vram_page) in mirroring.nametable_pages().into_iter().enumerate() {
            for mirror in [0x2000usize, 0x3000] {
                let start = mirror + table * ppu_mem::NAMETABLE_SIZE;
                for i in 0..nt_pages {
                    let page = start / PAGE_SIZE + i;
                    // $3F00-$3FFF belongs to palette RAM inside the PPU.
                    if page >= PPU_PAGE_COUNT - 1 {
                        continue;
                    }
                    self.ppu_pages[page] = Page {
                        kind: ChrMemory::Vram,
                        offset: vram_page * ppu_mem::NAMETABLE_SIZE + i * PAGE_SIZE,
                        access: Access::ReadWrite,
                    };
                }
            }
        }
    }

    fn prg_slice(&self, kind: PrgMemory) -> &[u8] {
        match kind {
            PrgMemory::None => &[],
            PrgMemory::PrgRom => &self.prg_rom,
            PrgMemory::WorkRam => &self.work_ram,
            PrgMemory::SaveRam => &self.save_ram,
            PrgMemory::MapperRam => &self.mapper_ram,
        }
    }

    fn prg_slice_mut(&mut self, kind: PrgMemory) -> Option<&mut [u8]> {
        match kind {
            PrgMemory::WorkRam => Some(&mut self.work_ram),
            PrgMemory::SaveRam => Some(&mut self.save_ram),
            PrgMemory::MapperRam => Some(&mut self.mapper_ram),
            PrgMemory::None | PrgMemory::PrgRom => None,
        }
    }

    fn chr_slice(&self, kind: ChrMemory) -> &[u8] {
        match kind {
            ChrMemory::None => &[],
            ChrMemory::ChrRom => &self.chr_rom,
            ChrMemory::ChrRam => &self.chr_ram,
            ChrMemory::Vram => &self.vram,
        }
    }

    fn chr_slice_mut(&mut self, kind: ChrMemory) -> Option<&mut [u8]> {
        match kind {
            ChrMemory::ChrRam => Some(&mut self.chr_ram),
            ChrMemory::Vram => Some(&mut self.vram),
            ChrMemory::None | ChrMemory::ChrRom => None,
        }
    }

    /// Reads through the CPU page table; `None` means nothing drives the bus.
    #[inline]
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        let page = self.cpu_pages[addr as usize / PAGE_SIZE];
        if !page.access.readable() {
            return None;
        }
        let data = self.prg_slice(page.kind);
        if data.is_empty() {
            return None;
        }
        Some(data[(page.offset + (addr as usize % PAGE_SIZE)) % data.len()])
    }

    #[inline]
    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        let page = self.cpu_pages[addr as usize / PAGE_SIZE];
        if !page.access.writable() {
            return;
        }
        if let Some(data) = self.prg_slice_mut(page.kind)
            && !data.is_empty()
        {
            let len = data.len();
            data[(page.offset + (addr as usize % PAGE_SIZE)) % len] = value;
        }
    }

    #[inline]
    pub fn ppu_read(&self, addr: u16) -> Option<u8> {
        let addr = addr & ppu_mem::VRAM_ADDR_MASK;
        let page = self.ppu_pages[addr as usize / PAGE_SIZE];
        if !page.access.readable() {
            return None;
        }
        let data = self.chr_slice(page.kind);
        if data.is_empty() {
            return None;
        }
        Some(data[(page.offset + (addr as usize % PAGE_SIZE)) % data.len()])
    }

    #[inline]
    pub fn ppu_write(&mut self, addr: u16, value: u8) {
        let addr = addr & ppu_mem::VRAM_ADDR_MASK;
        let page = self.ppu_pages[addr as usize / PAGE_SIZE];
        if !page.access.writable() {
            return;
        }
        if let Some(data) = self.chr_slice_mut(page.kind)
            && !data.is_empty()
        {
            let len = data.len();
            data[(page.offset + (addr as usize % PAGE_SIZE)) % len] = value;
        }
    }

    pub fn cpu_page(&self, addr: u16) -> Page<PrgMemory> {
        self.cpu_pages[addr as usize / PAGE_SIZE]
    }

    pub fn ppu_page(&self, addr: u16) -> Page<ChrMemory> {
        self.ppu_pages[(addr & ppu_mem::VRAM_ADDR_MASK) as usize / PAGE_SIZE]
    }

    pub fn save_state(&self) -> BanksState {
        BanksState {
            work_ram: self.work_ram.clone(),
            save_ram: self.save_ram.clone(),
            mapper_ram: self.mapper_ram.clone(),
            chr_ram: self.chr_ram.clone(),
            vram: self.vram.clone(),
            cpu_pages: self.cpu_pages.clone(),
            ppu_pages: self.ppu_pages.clone(),
            mirroring: self.mirroring,
        }
    }

    /// Checks that `state` was produced by a cartridge with this layout.
    pub fn validate_state(&self, state: &BanksState) -> Result<(), &'static str> {
        if state.work_ram.len() != self.work_ram.len()
            || state.save_ram.len() != self.save_ram.len()
            || state.mapper_ram.len() != self.mapper_ram.len()
            || state.chr_ram.len() != self.chr_ram.len()
            || state.vram.len() != self.vram.len()
        {
            return Err("cartridge RAM size mismatch");
        }
        if state.cpu_pages.len() != CPU_PAGE_COUNT || state.ppu_pages.len() != PPU_PAGE_COUNT {
            return Err("page table size mismatch");
        }
        Ok(())
    }

    /// Applies a state previously accepted by [`Banks::validate_state`].
    pub fn load_state(&mut self, state: &BanksState) {
        self.work_ram.copy_from_slice(&state.work_ram);
        self.save_ram.copy_from_slice(&state.save_ram);
        self.mapper_ram.copy_from_slice(&state.mapper_ram);
        self.chr_ram.copy_from_slice(&state.chr_ram);
        self.vram.copy_from_slice(&state.vram);
        self.cpu_pages.copy_from_slice(&state.cpu_pages);
        self.ppu_pages.copy_from_slice(&state.ppu_pages);
        self.mirroring = state.mirroring;
    }
}
