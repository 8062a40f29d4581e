//! Execute phase and the ALU.

use crate::{
    bus::Bus,
    cpu::{Cpu, Kind, Mnemonic, Status},
    memory::cpu as cpu_mem,
};

impl Cpu {
    pub(super) fn execute_cycle(&mut self, bus: &mut impl Bus) {
        let op = self.opcode();
        let step = self.latches.step;
        self.latches.step += 1;

        match op.kind() {
            Kind::Read => {
                let value = self.read(bus, self.latches.addr);
                self.apply_read(op.mnemonic, value);
                self.finish();
            }
            Kind::Write => {
                self.store(bus, op.mnemonic);
                self.finish();
            }
            Kind::ReadModifyWrite => match step {
                0 => self.latches.data = self.read(bus, self.latches.addr),
                1 => {
                    self.write(bus, self.latches.addr, self.latches.data);
                    self.latches.data = self.modify(op.mnemonic, self.latches.data);
                }
                _ => {
                    self.write(bus, self.latches.addr, self.latches.data);
                    self.finish();
                }
            },
            Kind::Implied => {
                self.read(bus, self.regs.pc);
                self.apply_implied(op.mnemonic);
                self.finish();
            }
            Kind::Branch => self.branch_cycle(bus, op.mnemonic, step),
            Kind::Push => match step {
                0 => {
                    self.read(bus, self.regs.pc);
                }
                _ => {
                    let value = match op.mnemonic {
                        Mnemonic::Pha => self.regs.a,
                        _ => self.regs.p.to_stack(true),
                    };
                    self.push(bus, value);
                    self.finish();
                }
            },
            Kind::Pull => match step {
                0 => {
                    self.read(bus, self.regs.pc);
                }
                1 => self.stack_dummy_read(bus),
                _ => {
                    let value = self.read(bus, self.stack_addr());
                    match op.mnemonic {
                        Mnemonic::Pla => self.load_a(value),
                        _ => self.regs.p = Status::from_stack(value),
                    }
                    self.finish();
                }
            },
            Kind::Jsr => match step {
                0 => self.latches.data = self.fetch_operand(bus),
                1 => {
                    self.read(bus, self.stack_addr());
                }
                2 => self.push(bus, (self.regs.pc >> 8) as u8),
                3 => self.push(bus, self.regs.pc as u8),
                _ => {
                    let hi = self.read(bus, self.regs.pc);
                    self.regs.pc = u16::from_le_bytes([self.latches.data, hi]);
                    self.finish();
                }
            },
            Kind::Rts => match step {
                0 => {
                    self.read(bus, self.regs.pc);
                }
                1 => self.stack_dummy_read(bus),
                2 => self.latches.data = self.pull(bus),
                3 => {
                    let hi = self.read(bus, self.stack_addr());
                    self.regs.pc = u16::from_le_bytes([self.latches.data, hi]);
                }
                _ => {
                    self.fetch_operand(bus);
                    self.finish();
                }
            },
            Kind::Rti => match step {
                0 => {
                    self.read(bus, self.regs.pc);
                }
                1 => self.stack_dummy_read(bus),
                2 => {
                    let p = self.pull(bus);
                    self.regs.p = Status::from_stack(p);
                }
                3 => self.latches.data = self.pull(bus),
                _ => {
                    let hi = self.read(bus, self.stack_addr());
                    self.regs.pc = u16::from_le_bytes([self.latches.data, hi]);
                    self.finish();
                }
            },
            Kind::Brk | Kind::Jmp | Kind::Jam => {
                unreachable!("{:?} never reaches the execute phase", op.mnemonic)
            }
        }
    }

    fn stack_addr(&self) -> u16 {
        cpu_mem::STACK_PAGE | self.regs.s as u16
    }

    /// Reads the current stack slot and moves S up.
    fn stack_dummy_read(&mut self, bus: &mut impl Bus) {
        self.read(bus, self.stack_addr());
        self.regs.s = self.regs.s.wrapping_add(1);
    }

    fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        let value = self.read(bus, self.stack_addr());
        self.regs.s = self.regs.s.wrapping_add(1);
        value
    }

    fn branch_cycle(&mut self, bus: &mut impl Bus, mnemonic: Mnemonic, step: u8) {
        match step {
            0 => {
                self.latches.data = self.fetch_operand(bus);
                if !self.branch_taken(mnemonic) {
                    self.finish();
                }
            }
            1 => {
                // A taken branch without a page cross does not poll on its
                // last cycle, so an IRQ that only just became visible waits.
                if self.irq.run_irq && !self.irq.prev_run_irq {
                    self.irq.run_irq = false;
                }
                self.read(bus, self.regs.pc);
                let pc = self.regs.pc;
                let target = pc.wrapping_add(self.latches.data as i8 as u16);
                if (pc ^ target) & 0xFF00 == 0 {
                    self.regs.pc = target;
                    self.finish();
                } else {
                    self.regs.pc = (pc & 0xFF00) | (target & 0x00FF);
                    self.latches.addr = target;
                }
            }
            _ => {
                self.read(bus, self.regs.pc);
                self.regs.pc = self.latches.addr;
                self.finish();
            }
        }
    }

    fn branch_taken(&self, mnemonic: Mnemonic) -> bool {
        let p = self.regs.p;
        match mnemonic {
            Mnemonic::Bcc => !p.contains(Status::CARRY),
            Mnemonic::Bcs => p.contains(Status::CARRY),
            Mnemonic::Bne => !p.contains(Status::ZERO),
            Mnemonic::Beq => p.contains(Status::ZERO),
            Mnemonic::Bpl => !p.contains(Status::NEGATIVE),
            Mnemonic::Bmi => p.contains(Status::NEGATIVE),
            Mnemonic::Bvc => !p.contains(Status::OVERFLOW),
            Mnemonic::Bvs => p.contains(Status::OVERFLOW),
            _ => false,
        }
    }

    fn apply_read(&mut self, mnemonic: Mnemonic, value: u8) {
        use Mnemonic::*;
        match mnemonic {
            Lda => self.load_a(value),
            Ldx => self.load_x(value),
            Ldy => self.load_y(value),
            Lax => {
                self.regs.x = value;
                self.load_a(value);
            }
            And => self.load_a(self.regs.a & value),
            Ora => self.load_a(self.regs.a | value),
            Eor => self.load_a(self.regs.a ^ value),
            Adc => self.adc(value),
            Sbc => self.adc(!value),
            Cmp => self.compare(self.regs.a, value),
            Cpx => self.compare(self.regs.x, value),
            Cpy => self.compare(self.regs.y, value),
            Bit => {
                let p = &mut self.regs.p;
                p.set(Status::ZERO, self.regs.a & value == 0);
                p.set(Status::OVERFLOW, value & 0x40 != 0);
                p.set(Status::NEGATIVE, value & 0x80 != 0);
            }
            Anc => {
                self.load_a(self.regs.a & value);
                let negative = self.regs.p.contains(Status::NEGATIVE);
                self.regs.p.set(Status::CARRY, negative);
            }
            Alr => {
                let masked = self.regs.a & value;
                let shifted = self.lsr(masked);
                self.load_a(shifted);
            }
            Arr => {
                let masked = self.regs.a & value;
                let result = (masked >> 1) | (self.regs.p.carry() << 7);
                self.load_a(result);
                let p = &mut self.regs.p;
                p.set(Status::CARRY, result & 0x40 != 0);
                p.set(Status::OVERFLOW, ((result >> 6) ^ (result >> 5)) & 1 != 0);
            }
            // The analog "magic" constant varies between chips; 0xEE is the
            // common value.
            Ane => self.load_a((self.regs.a | 0xEE) & self.regs.x & value),
            Lxa => {
                let result = (self.regs.a | 0xEE) & value;
                self.regs.x = result;
                self.load_a(result);
            }
            Sbx => {
                let masked = self.regs.a & self.regs.x;
                self.regs.p.set(Status::CARRY, masked >= value);
                self.regs.x = masked.wrapping_sub(value);
                self.regs.p.set_zn(self.regs.x);
            }
            Las => {
                let result = value & self.regs.s;
                self.regs.s = result;
                self.regs.x = result;
                self.load_a(result);
            }
            Nop => {}
            other => unreachable!("{other:?} is not a read instruction"),
        }
    }

    fn store(&mut self, bus: &mut impl Bus, mnemonic: Mnemonic) {
        let regs = self.regs;
        let value = match mnemonic {
            Mnemonic::Sta => regs.a,
            Mnemonic::Stx => regs.x,
            Mnemonic::Sty => regs.y,
            Mnemonic::Sax => regs.a & regs.x,
            Mnemonic::Sha => return self.store_and_high(bus, regs.a & regs.x),
            Mnemonic::Shx => return self.store_and_high(bus, regs.x),
            Mnemonic::Shy => return self.store_and_high(bus, regs.y),
            Mnemonic::Tas => {
                self.regs.s = regs.a & regs.x;
                return self.store_and_high(bus, self.regs.s);
            }
            other => unreachable!("{other:?} is not a write instruction"),
        };
        self.write(bus, self.latches.addr, value);
    }

    /// SHA/SHX/SHY/TAS: the stored value is ANDed with the base high byte
    /// plus one, and a page cross replaces the target high byte with
    /// `value & high`.
    fn store_and_high(&mut self, bus: &mut impl Bus, value: u8) {
        let base_hi = (self.latches.base >> 8) as u8;
        let mut addr = self.latches.addr;
        if self.latches.page_crossed {
            let hi = (addr >> 8) as u8 & value;
            addr = ((hi as u16) << 8) | (addr & 0x00FF);
        }
        self.write(bus, addr, value & base_hi.wrapping_add(1));
    }

    /// Computes the value written back by a read-modify-write instruction.
    fn modify(&mut self, mnemonic: Mnemonic, value: u8) -> u8 {
        use Mnemonic::*;
        match mnemonic {
            Asl => self.asl(value),
            Lsr => self.lsr(value),
            Rol => self.rol(value),
            Ror => self.ror(value),
            Inc => {
                let result = value.wrapping_add(1);
                self.regs.p.set_zn(result);
                result
            }
            Dec => {
                let result = value.wrapping_sub(1);
                self.regs.p.set_zn(result);
                result
            }
            Slo => {
                let result = self.asl(value);
                self.load_a(self.regs.a | result);
                result
            }
            Rla => {
                let result = self.rol(value);
                self.load_a(self.regs.a & result);
                result
            }
            Sre => {
                let result = self.lsr(value);
                self.load_a(self.regs.a ^ result);
                result
            }
            Rra => {
                let result = self.ror(value);
                self.adc(result);
                result
            }
            Dcp => {
                let result = value.wrapping_sub(1);
                self.compare(self.regs.a, result);
                result
            }
            Isc => {
                let result = value.wrapping_add(1);
                self.adc(!result);
                result
            }
            other => unreachable!("{other:?} is not a read-modify-write instruction"),
        }
    }

    fn apply_implied(&mut self, mnemonic: Mnemonic) {
        use Mnemonic::*;
        match mnemonic {
            Asl => self.regs.a = self.asl(self.regs.a),
            Lsr => self.regs.a = self.lsr(self.regs.a),
            Rol => self.regs.a = self.rol(self.regs.a),
            Ror => self.regs.a = self.ror(self.regs.a),
            Clc => self.regs.p.remove(Status::CARRY),
            Cld => self.regs.p.remove(Status::DECIMAL),
            Cli => self.regs.p.remove(Status::INTERRUPT),
            Clv => self.regs.p.remove(Status::OVERFLOW),
            Sec => self.regs.p.insert(Status::CARRY),
            Sed => self.regs.p.insert(Status::DECIMAL),
            Sei => self.regs.p.insert(Status::INTERRUPT),
            Dex => self.load_x(self.regs.x.wrapping_sub(1)),
            Dey => self.load_y(self.regs.y.wrapping_sub(1)),
            Inx => self.load_x(self.regs.x.wrapping_add(1)),
            Iny => self.load_y(self.regs.y.wrapping_add(1)),
            Tax => self.load_x(self.regs.a),
            Tay => self.load_y(self.regs.a),
            Tsx => self.load_x(self.regs.s),
            Txa => self.load_a(self.regs.x),
            Tya => self.load_a(self.regs.y),
            Txs => self.regs.s = self.regs.x,
            Nop => {}
            other => unreachable!("{other:?} is not an implied instruction"),
        }
    }

    fn load_a(&mut self, value: u8) {
        self.regs.a = value;
        self.regs.p.set_zn(value);
    }

    fn load_x(&mut self, value: u8) {
        self.regs.x = value;
        self.regs.p.set_zn(value);
    }

    fn load_y(&mut self, value: u8) {
        self.regs.y = value;
        self.regs.p.set_zn(value);
    }

    /// Binary add with carry; the 2A03 has no decimal mode.
    fn adc(&mut self, value: u8) {
        let a = self.regs.a;
        let sum = a as u16 + value as u16 + self.regs.p.carry() as u16;
        let result = sum as u8;
        self.regs.p.set(Status::CARRY, sum > 0xFF);
        self.regs
            .p
            .set(Status::OVERFLOW, (!(a ^ value) & (a ^ result) & 0x80) != 0);
        self.load_a(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.p.set(Status::CARRY, register >= value);
        self.regs.p.set_zn(register.wrapping_sub(value));
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.set(Status::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.set_zn(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set(Status::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.set_zn(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.regs.p.carry();
        self.regs.p.set(Status::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.set_zn(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = self.regs.p.carry();
        self.regs.p.set(Status::CARRY, value & 0x01 != 0);
        let result = (value >> 1) | (carry_in << 7);
        self.regs.p.set_zn(result);
        result
    }
}
