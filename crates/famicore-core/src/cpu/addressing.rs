//! Address phase: one bus access per cycle until the effective address is
//! known.
//!
//! Indexed modes add the index to the low byte first and read from that
//! unfixed address while the high byte is corrected. Read instructions skip
//! that extra cycle when no page was crossed; writes and read-modify-write
//! instructions always take it.

use crate::{
    bus::Bus,
    cpu::{Cpu, Kind, Mode, Opcode, Phase},
};

impl Cpu {
    pub(super) fn address_cycle(&mut self, bus: &mut impl Bus) {
        let op = self.opcode();
        let step = self.latches.step;
        self.latches.step += 1;

        match op.mode {
            Mode::ZeroPage => {
                self.latches.addr = self.fetch_operand(bus) as u16;
                self.enter_execute(op);
            }
            Mode::ZeroPageX | Mode::ZeroPageY => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                _ => {
                    self.read(bus, self.latches.ptr as u16);
                    let index = self.index_for(op.mode);
                    self.latches.addr = self.latches.ptr.wrapping_add(index) as u16;
                    self.enter_execute(op);
                }
            },
            Mode::Absolute => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                _ => {
                    let hi = self.fetch_operand(bus);
                    self.latches.addr = u16::from_le_bytes([self.latches.ptr, hi]);
                    self.latches.base = self.latches.addr;
                    self.enter_execute(op);
                }
            },
            Mode::AbsoluteX | Mode::AbsoluteY => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                1 => {
                    let hi = self.fetch_operand(bus);
                    let base = u16::from_le_bytes([self.latches.ptr, hi]);
                    self.apply_index(op, base, self.index_for(op.mode));
                }
                _ => {
                    self.read(bus, self.unfixed_addr());
                    self.enter_execute(op);
                }
            },
            Mode::IndirectX => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                1 => {
                    self.read(bus, self.latches.ptr as u16);
                    self.latches.ptr = self.latches.ptr.wrapping_add(self.regs.x);
                }
                2 => self.latches.data = self.read(bus, self.latches.ptr as u16),
                _ => {
                    let hi = self.read(bus, self.latches.ptr.wrapping_add(1) as u16);
                    self.latches.addr = u16::from_le_bytes([self.latches.data, hi]);
                    self.latches.base = self.latches.addr;
                    self.enter_execute(op);
                }
            },
            Mode::IndirectY => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                1 => self.latches.data = self.read(bus, self.latches.ptr as u16),
                2 => {
                    let hi = self.read(bus, self.latches.ptr.wrapping_add(1) as u16);
                    let base = u16::from_le_bytes([self.latches.data, hi]);
                    self.apply_index(op, base, self.regs.y);
                }
                _ => {
                    self.read(bus, self.unfixed_addr());
                    self.enter_execute(op);
                }
            },
            Mode::Indirect => match step {
                0 => self.latches.ptr = self.fetch_operand(bus),
                1 => {
                    let hi = self.fetch_operand(bus);
                    self.latches.base = u16::from_le_bytes([self.latches.ptr, hi]);
                }
                2 => self.latches.data = self.read(bus, self.latches.base),
                _ => {
                    // The pointer's high byte comes from the same page.
                    let base = self.latches.base;
                    let hi_addr = (base & 0xFF00) | (base.wrapping_add(1) & 0x00FF);
                    let hi = self.read(bus, hi_addr);
                    self.latches.addr = u16::from_le_bytes([self.latches.data, hi]);
                    self.enter_execute(op);
                }
            },
            Mode::Implied | Mode::Accumulator | Mode::Immediate | Mode::Relative => {
                unreachable!("{:?} has no address phase", op.mode)
            }
        }
    }

    fn index_for(&self, mode: Mode) -> u8 {
        match mode {
            Mode::ZeroPageY | Mode::AbsoluteY | Mode::IndirectY => self.regs.y,
            _ => self.regs.x,
        }
    }

    /// Records `base + index`; reads without a page cross go straight to the
    /// execute phase.
    fn apply_index(&mut self, op: Opcode, base: u16, index: u8) {
        let addr = base.wrapping_add(index as u16);
        self.latches.base = base;
        self.latches.addr = addr;
        self.latches.page_crossed = (base ^ addr) & 0xFF00 != 0;
        if !self.latches.page_crossed && op.kind() == Kind::Read {
            self.enter_execute(op);
        }
    }

    /// Address driven during the fix-up cycle: new low byte, old high byte.
    fn unfixed_addr(&self) -> u16 {
        (self.latches.base & 0xFF00) | (self.latches.addr & 0x00FF)
    }

    fn enter_execute(&mut self, op: Opcode) {
        self.latches.step = 0;
        if op.kind() == Kind::Jmp {
            self.regs.pc = self.latches.addr;
            self.latches.phase = Phase::Fetch;
        } else {
            self.latches.phase = Phase::Execute;
        }
    }
}
