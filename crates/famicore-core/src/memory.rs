//! Address map of the console.
//!
//! Every fixed address the core decodes lives here so the bus, PPU, APU and
//! mapper code never spell out raw hex for hardware locations.

/// CPU address space.
pub mod cpu {
    /// Base of the hardware stack page.
    pub const STACK_PAGE: u16 = 0x0100;

    /// NMI vector (`$FFFA/$FFFB`).
    pub const NMI_VECTOR: u16 = 0xFFFA;
    /// Reset vector (`$FFFC/$FFFD`).
    pub const RESET_VECTOR: u16 = 0xFFFC;
    /// IRQ/BRK vector (`$FFFE/$FFFF`).
    pub const IRQ_VECTOR: u16 = 0xFFFE;

    /// Size of the console's internal work RAM (mirrored through `$1FFF`).
    pub const INTERNAL_RAM_SIZE: usize = 0x0800;
    /// Mask folding `$0000-$1FFF` onto the 2 KiB RAM.
    pub const INTERNAL_RAM_MASK: u16 = (INTERNAL_RAM_SIZE as u16) - 1;
    /// Last address of the internal RAM mirrors.
    pub const INTERNAL_RAM_END: u16 = 0x1FFF;

    /// First PPU register mirror.
    pub const PPU_REGISTER_BASE: u16 = 0x2000;
    /// Last PPU register mirror.
    pub const PPU_REGISTER_END: u16 = 0x3FFF;

    /// First APU channel register.
    pub const APU_REGISTER_BASE: u16 = 0x4000;
    /// Last APU channel register.
    pub const APU_CHANNEL_END: u16 = 0x4013;
    /// Sprite DMA trigger.
    pub const OAM_DMA: u16 = 0x4014;
    /// APU status / channel enable.
    pub const APU_STATUS: u16 = 0x4015;
    /// Controller strobe (write) and port 1 data (read).
    pub const CONTROLLER_PORT_1: u16 = 0x4016;
    /// Port 2 data (read) and APU frame counter (write).
    pub const CONTROLLER_PORT_2: u16 = 0x4017;
    /// Last address of the CPU test-mode window; cartridge space starts after it.
    pub const TEST_MODE_END: u16 = 0x401F;

    /// Work RAM window start.
    pub const PRG_RAM_START: u16 = 0x6000;
    /// Trainer load address inside work RAM.
    pub const TRAINER_START: u16 = 0x7000;
    /// PRG ROM window start.
    pub const PRG_ROM_START: u16 = 0x8000;
}

/// PPU address space and register decode.
pub mod ppu {
    /// Mask applied to PPU register mirrors.
    pub const REGISTER_SELECT_MASK: u16 = 0x0007;

    /// The PPU bus is 14 bits wide.
    pub const VRAM_ADDR_MASK: u16 = 0x3FFF;

    /// Left pattern table.
    pub const PATTERN_TABLE_0: u16 = 0x0000;
    /// Right pattern table.
    pub const PATTERN_TABLE_1: u16 = 0x1000;

    /// First nametable byte.
    pub const NAMETABLE_BASE: u16 = 0x2000;
    /// Size of one nametable (including its attribute table).
    pub const NAMETABLE_SIZE: usize = 0x0400;
    /// Attribute table offset inside a nametable.
    pub const ATTRIBUTE_OFFSET: u16 = 0x03C0;

    /// Start of palette RAM.
    pub const PALETTE_BASE: u16 = 0x3F00;
    /// Palette RAM size; mirrored every 32 bytes up to `$3FFF`.
    pub const PALETTE_RAM_SIZE: usize = 0x20;

    /// Primary OAM size.
    pub const OAM_SIZE: usize = 0x100;
    /// Secondary OAM size (8 sprites × 4 bytes).
    pub const SECONDARY_OAM_SIZE: usize = 0x20;

    /// Visible raster width.
    pub const SCREEN_WIDTH: usize = 256;
    /// Visible raster height.
    pub const SCREEN_HEIGHT: usize = 240;

    /// CPU-visible PPU registers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        /// `$2000` PPUCTRL
        Control = 0x2000,
        /// `$2001` PPUMASK
        Mask = 0x2001,
        /// `$2002` PPUSTATUS
        Status = 0x2002,
        /// `$2003` OAMADDR
        OamAddr = 0x2003,
        /// `$2004` OAMDATA
        OamData = 0x2004,
        /// `$2005` PPUSCROLL
        Scroll = 0x2005,
        /// `$2006` PPUADDR
        Addr = 0x2006,
        /// `$2007` PPUDATA
        Data = 0x2007,
    }

    impl Register {
        /// Decodes any mirror in `$2000-$3FFF`.
        pub const fn from_cpu_addr(addr: u16) -> Self {
            match addr & REGISTER_SELECT_MASK {
                0 => Self::Control,
                1 => Self::Mask,
                2 => Self::Status,
                3 => Self::OamAddr,
                4 => Self::OamData,
                5 => Self::Scroll,
                6 => Self::Addr,
                _ => Self::Data,
            }
        }
    }
}

/// APU register layout.
pub mod apu {
    /// CPU-visible APU registers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        Pulse1Control = 0x4000,
        Pulse1Sweep = 0x4001,
        Pulse1TimerLow = 0x4002,
        Pulse1TimerHigh = 0x4003,
        Pulse2Control = 0x4004,
        Pulse2Sweep = 0x4005,
        Pulse2TimerLow = 0x4006,
        Pulse2TimerHigh = 0x4007,
        TriangleControl = 0x4008,
        TriangleUnused = 0x4009,
        TriangleTimerLow = 0x400A,
        TriangleTimerHigh = 0x400B,
        NoiseControl = 0x400C,
        NoiseUnused = 0x400D,
        NoisePeriod = 0x400E,
        NoiseLength = 0x400F,
        DmcControl = 0x4010,
        DmcDirectLoad = 0x4011,
        DmcSampleAddress = 0x4012,
        DmcSampleLength = 0x4013,
        Status = 0x4015,
        FrameCounter = 0x4017,
    }

    impl Register {
        /// Maps a CPU address onto an APU register, if it is one.
        pub const fn from_cpu_addr(addr: u16) -> Option<Self> {
            Some(match addr {
                0x4000 => Self::Pulse1Control,
                0x4001 => Self::Pulse1Sweep,
                0x4002 => Self::Pulse1TimerLow,
                0x4003 => Self::Pulse1TimerHigh,
                0x4004 => Self::Pulse2Control,
                0x4005 => Self::Pulse2Sweep,
                0x4006 => Self::Pulse2TimerLow,
                0x4007 => Self::Pulse2TimerHigh,
                0x4008 => Self::TriangleControl,
                0x4009 => Self::TriangleUnused,
                0x400A => Self::TriangleTimerLow,
                0x400B => Self::TriangleTimerHigh,
                0x400C => Self::NoiseControl,
                0x400D => Self::NoiseUnused,
                0x400E => Self::NoisePeriod,
                0x400F => Self::NoiseLength,
                0x4010 => Self::DmcControl,
                0x4011 => Self::DmcDirectLoad,
                0x4012 => Self::DmcSampleAddress,
                0x4013 => Self::DmcSampleLength,
                0x4015 => Self::Status,
                0x4017 => Self::FrameCounter,
                _ => return None,
            })
        }
    }
}
