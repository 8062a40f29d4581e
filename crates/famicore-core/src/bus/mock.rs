use crate::bus::Bus;

/// Kind of access recorded by [`MockBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read(u16),
    Write(u16, u8),
}

/// Flat 64 KiB memory that logs every access.
#[derive(Debug)]
pub(crate) struct MockBus {
    pub(crate) mem: Box<[u8; 0x10000]>,
    pub(crate) log: Vec<Access>,
    pub(crate) dmc_bytes: Vec<u8>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self {
            mem: Box::new([0; 0x10000]),
            log: Vec::new(),
            dmc_bytes: Vec::new(),
        }
    }
}

impl MockBus {
    /// Places `program` at `origin` and points the reset vector at it.
    pub(crate) fn with_program(origin: u16, program: &[u8]) -> Self {
        let mut bus = Self::default();
        bus.load(origin, program);
        bus.mem[0xFFFC] = origin as u8;
        bus.mem[0xFFFD] = (origin >> 8) as u8;
        bus
    }

    pub(crate) fn load(&mut self, origin: u16, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.mem[origin.wrapping_add(i as u16) as usize] = *byte;
        }
    }
}

impl Bus for MockBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.log.push(Access::Read(addr));
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.log.push(Access::Write(addr, value));
        self.mem[addr as usize] = value;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn dmc_fetched(&mut self, value: u8) {
        self.dmc_bytes.push(value);
    }
}
