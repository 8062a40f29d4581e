use crate::{
    apu::Apu,
    bus::{Bus, OpenBus},
    cartridge::Mapper,
    controller::{Controller, OPEN_BUS_MASK},
    memory::cpu as cpu_mem,
    ppu::Ppu,
};

/// Bit 5 of `$4015` is not driven by the APU.
const APU_STATUS_OPEN_BUS_MASK: u8 = 0x20;

/// CPU-visible bus that routes accesses to RAM, the PPU, the APU, the
/// controllers and the cartridge. It borrows the hardware from the owning
/// console for one CPU cycle.
#[derive(Debug)]
pub struct CpuBus<'a> {
    ram: &'a mut [u8; cpu_mem::INTERNAL_RAM_SIZE],
    ppu: &'a mut Ppu,
    apu: &'a mut Apu,
    mapper: &'a mut Mapper,
    controllers: &'a mut [Controller; 2],
    open_bus: &'a mut OpenBus,
    oam_dma_request: &'a mut Option<u8>,
    /// CPU cycle of this access, used by boards that ignore back-to-back writes.
    cpu_cycle: u64,
}

impl<'a> CpuBus<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ram: &'a mut [u8; cpu_mem::INTERNAL_RAM_SIZE],
        ppu: &'a mut Ppu,
        apu: &'a mut Apu,
        mapper: &'a mut Mapper,
        controllers: &'a mut [Controller; 2],
        open_bus: &'a mut OpenBus,
        oam_dma_request: &'a mut Option<u8>,
        cpu_cycle: u64,
    ) -> Self {
        Self {
            ram,
            ppu,
            apu,
            mapper,
            controllers,
            open_bus,
            oam_dma_request,
            cpu_cycle,
        }
    }

    fn view(&self) -> CpuView<'_> {
        CpuView {
            ram: self.ram,
            ppu: self.ppu,
            apu: self.apu,
            mapper: self.mapper,
            controllers: self.controllers,
            open_bus: *self.open_bus,
        }
    }

    fn write_strobe(&mut self, value: u8) {
        for pad in self.controllers.iter_mut() {
            pad.write_strobe(value);
        }
    }
}

impl Bus for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        let mut driven = true;
        let value = match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.cpu_read(addr, self.mapper)
            }
            cpu_mem::APU_STATUS => {
                // Only the CPU's internal bus sees $4015; the latch keeps its value.
                driven = false;
                self.apu.read_status() | (self.open_bus.sample() & APU_STATUS_OPEN_BUS_MASK)
            }
            cpu_mem::CONTROLLER_PORT_1 | cpu_mem::CONTROLLER_PORT_2 => {
                let bit = self.controllers[(addr & 1) as usize].read();
                self.open_bus.apply_masked(OPEN_BUS_MASK, bit)
            }
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::TEST_MODE_END => {
                driven = false;
                self.open_bus.sample()
            }
            _ => match self.mapper.cpu_read(addr) {
                Some(value) => value,
                None => {
                    driven = false;
                    self.open_bus.sample()
                }
            },
        };

        if driven {
            self.open_bus.latch(value);
        }
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus.latch(value);

        match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize] = value;
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.cpu_write(addr, value, self.mapper)
            }
            cpu_mem::OAM_DMA => *self.oam_dma_request = Some(value),
            cpu_mem::CONTROLLER_PORT_1 => self.write_strobe(value),
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_CHANNEL_END
            | cpu_mem::APU_STATUS
            | cpu_mem::CONTROLLER_PORT_2 => self.apu.cpu_write(addr, value),
            0x4018..=cpu_mem::TEST_MODE_END => {}
            _ => self.mapper.cpu_write(addr, value, self.cpu_cycle),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.view().peek(addr)
    }

    fn dmc_fetched(&mut self, value: u8) {
        self.apu.dmc_fetched(value);
    }
}

/// Read-only snapshot of the CPU address space for debuggers and the trace
/// log. Reading through it never changes hardware state.
#[derive(Debug, Clone, Copy)]
pub struct CpuView<'a> {
    pub(crate) ram: &'a [u8; cpu_mem::INTERNAL_RAM_SIZE],
    pub(crate) ppu: &'a Ppu,
    pub(crate) apu: &'a Apu,
    pub(crate) mapper: &'a Mapper,
    pub(crate) controllers: &'a [Controller; 2],
    pub(crate) open_bus: OpenBus,
}

impl CpuView<'_> {
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=cpu_mem::INTERNAL_RAM_END => {
                self.ram[(addr & cpu_mem::INTERNAL_RAM_MASK) as usize]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                self.ppu.peek_register(addr)
            }
            cpu_mem::APU_STATUS => {
                self.apu.peek_status() | (self.open_bus.sample() & APU_STATUS_OPEN_BUS_MASK)
            }
            cpu_mem::CONTROLLER_PORT_1 | cpu_mem::CONTROLLER_PORT_2 => {
                let bit = self.controllers[(addr & 1) as usize].peek();
                self.open_bus.apply_masked(OPEN_BUS_MASK, bit)
            }
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::TEST_MODE_END => self.open_bus.sample(),
            _ => self
                .mapper
                .cpu_peek(addr)
                .unwrap_or_else(|| self.open_bus.sample()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cartridge::mapper::test_support::rom, config::Config, controller::Button,
    };

    struct Parts {
        ram: [u8; cpu_mem::INTERNAL_RAM_SIZE],
        ppu: Ppu,
        apu: Apu,
        mapper: Mapper,
        controllers: [Controller; 2],
        open_bus: OpenBus,
        oam_dma: Option<u8>,
    }

    impl Parts {
        fn new() -> Self {
            let mut ppu = Ppu::new();
            ppu.power();
            let mut apu = Apu::new(&Config::default());
            apu.power();
            Self {
                ram: [0; cpu_mem::INTERNAL_RAM_SIZE],
                ppu,
                apu,
                mapper: Mapper::new(&rom(0, 2, 1, 0), &Config::default()).expect("mapper"),
                controllers: [Controller::new(); 2],
                open_bus: OpenBus::new(),
                oam_dma: None,
            }
        }

        fn bus(&mut self) -> CpuBus<'_> {
            CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                &mut self.apu,
                &mut self.mapper,
                &mut self.controllers,
                &mut self.open_bus,
                &mut self.oam_dma,
                0,
            )
        }
    }

    #[test]
    fn internal_ram_is_mirrored() {
        let mut parts = Parts::new();
        let mut bus = parts.bus();
        bus.write(0x0002, 0x55);
        assert_eq!(bus.read(0x0802), 0x55);
        assert_eq!(bus.read(0x1802), 0x55);
    }

    #[test]
    fn unmapped_reads_return_the_last_driven_value() {
        let mut parts = Parts::new();
        let mut bus = parts.bus();
        bus.write(0x0000, 0x3C);
        assert_eq!(bus.read(0x0000), 0x3C);
        assert_eq!(bus.read(0x4018), 0x3C);
        assert_eq!(bus.read(0x4000), 0x3C);
        assert_eq!(bus.read(0x5000), 0x3C);
    }

    #[test]
    fn controller_reads_mix_in_open_bus_bits() {
        let mut parts = Parts::new();
        parts.controllers[0].set_buttons(Button::A.mask());
        let mut bus = parts.bus();
        bus.write(cpu_mem::CONTROLLER_PORT_1, 1);
        bus.write(cpu_mem::CONTROLLER_PORT_1, 0);
        bus.write(0x0000, 0x40);
        assert_eq!(bus.read(cpu_mem::CONTROLLER_PORT_1), 0x41);
        assert_eq!(bus.read(cpu_mem::CONTROLLER_PORT_1), 0x40);
    }

    #[test]
    fn oam_dma_write_is_queued() {
        let mut parts = Parts::new();
        parts.bus().write(cpu_mem::OAM_DMA, 0x02);
        assert_eq!(parts.oam_dma, Some(0x02));
    }

    #[test]
    fn peek_leaves_controllers_and_latch_alone() {
        let mut parts = Parts::new();
        parts.controllers[0].set_buttons(0xFF);
        {
            let mut bus = parts.bus();
            bus.write(cpu_mem::CONTROLLER_PORT_1, 1);
            bus.write(cpu_mem::CONTROLLER_PORT_1, 0);
        }
        let before = parts.controllers;
        let latch = parts.open_bus;
        let bus = parts.bus();
        assert_eq!(bus.peek(cpu_mem::CONTROLLER_PORT_1) & 1, 1);
        drop(bus);
        assert_eq!(parts.controllers, before);
        assert_eq!(parts.open_bus, latch);
    }
}
