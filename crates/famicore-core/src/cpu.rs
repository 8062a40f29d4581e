//! Cycle-stepped 2A03 CPU.
//!
//! [`Cpu::clock`] performs exactly one bus access (or one DMA cycle) per call.
//! An instruction moves through three phases: [`Phase::Fetch`] reads the
//! opcode and decides between normal dispatch and an interrupt sequence,
//! [`Phase::Address`] computes the effective address one cycle at a time and
//! [`Phase::Execute`] performs the operand accesses. Everything needed to
//! resume in the middle of an instruction lives in [`Latches`].
//!
//! Interrupt lines are sampled by the console after every CPU cycle through
//! [`Cpu::sample_interrupts`]; the value seen at the end of an instruction's
//! second-to-last cycle decides whether the next fetch turns into an
//! interrupt sequence.

mod addressing;
mod dma;
mod execute;
pub mod opcode;
mod status;
#[cfg(test)]
mod timing;
pub mod trace;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::{bus::Bus, memory::cpu as cpu_mem};

pub use dma::Dma;
pub use opcode::{Kind, Mnemonic, Mode, OPCODES, Opcode};
pub use status::Status;
pub use trace::{TraceEntry, TraceLog};

bitflags! {
    /// Devices that can hold the shared IRQ line asserted.
    ///
    /// Each source raises and lowers its own bit; the line is their OR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IrqSource: u8 {
        const FRAME_COUNTER = 0b001;
        const DMC           = 0b010;
        const MAPPER        = 0b100;
    }
}

/// Which part of an instruction the next cycle belongs to.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Fetch,
    Address,
    Execute,
    /// BRK, IRQ, NMI and reset share this 7-cycle sequence.
    Interrupt,
    /// A JAM opcode stopped the CPU until the next power or reset.
    Jammed,
}

/// Flavour of the running [`Phase::Interrupt`] sequence.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sequence {
    Brk,
    /// Hardware IRQ or NMI; the vector is picked at the status push.
    Interrupt,
    #[default]
    Reset,
}

/// Programmer-visible registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            pc: 0,
            p: Status::power_on(),
        }
    }
}

/// Mid-instruction latches.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Latches {
    pub(crate) opcode: u8,
    pub(crate) phase: Phase,
    pub(crate) sequence: Sequence,
    /// Cycle index inside the current phase.
    pub(crate) step: u8,
    /// Effective address (or branch target once a page fix is pending).
    pub(crate) addr: u16,
    /// Address before indexing.
    pub(crate) base: u16,
    /// Zero-page pointer or low operand byte.
    pub(crate) ptr: u8,
    /// Scratch byte: RMW operand, pulled PCL, vector low byte.
    pub(crate) data: u8,
    pub(crate) page_crossed: bool,
    /// Set after an interrupt sequence so the next instruction always runs.
    pub(crate) suppress_poll: bool,
}

/// Interrupt line state as seen by the edge/level detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct Interrupts {
    sources: IrqSource,
    /// NMI input level at the previous sample.
    nmi_line: bool,
    need_nmi: bool,
    prev_need_nmi: bool,
    run_irq: bool,
    prev_run_irq: bool,
}

/// Last bus access made by the instruction stepper in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastAccess {
    None,
    Read(u16),
    Write,
}

/// Serializable snapshot of the CPU core.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    /// Raw status register bits (NV-BDIZC).
    pub p: u8,
    pub pc: u16,
    pub latches: Latches,
    pub irq_sources: u8,
    pub nmi_line: bool,
    pub need_nmi: bool,
    pub prev_need_nmi: bool,
    pub run_irq: bool,
    pub prev_run_irq: bool,
    pub dma: Dma,
    pub cycles: u64,
}

#[derive(Debug, Clone)]
pub struct Cpu {
    regs: Registers,
    latches: Latches,
    irq: Interrupts,
    dma: Dma,
    cycles: u64,
    /// Instructions dispatched since power-on.
    instructions: u64,
    last_access: LastAccess,
    trace: TraceLog,
}

impl Cpu {
    /// A CPU that keeps the last `trace_capacity` instructions in its trace
    /// ring. Call [`Cpu::power`] before clocking it.
    pub fn new(trace_capacity: usize) -> Self {
        Self {
            regs: Registers::default(),
            latches: Latches::default(),
            irq: Interrupts::default(),
            dma: Dma::default(),
            cycles: 0,
            instructions: 0,
            last_access: LastAccess::None,
            trace: TraceLog::new(trace_capacity),
        }
    }

    /// Power-on state. The reset sequence runs during the next 7 clocks and
    /// leaves `S = $FD` with PC loaded from `$FFFC`.
    pub fn power(&mut self) {
        self.regs = Registers::default();
        self.irq = Interrupts::default();
        self.dma = Dma::default();
        self.cycles = 0;
        self.instructions = 0;
        self.trace.clear();
        self.arm_reset();
    }

    /// Soft reset: registers are kept, `S` drops by 3 and I is set by the
    /// reset sequence that runs during the next 7 clocks.
    pub fn reset(&mut self) {
        let sources = self.irq.sources;
        self.irq = Interrupts {
            sources,
            ..Interrupts::default()
        };
        self.dma = Dma::default();
        self.arm_reset();
    }

    fn arm_reset(&mut self) {
        self.latches = Latches {
            phase: Phase::Interrupt,
            sequence: Sequence::Reset,
            ..Latches::default()
        };
        debug!(pc = format_args!("{:#06X}", self.regs.pc), "cpu reset armed");
    }

    /// Advances exactly one CPU cycle.
    pub fn clock(&mut self, bus: &mut impl Bus) {
        if self.dma.active {
            self.dma_cycle(bus);
        } else if self.dma.need_halt {
            // The CPU halts on its next read: that read happens, is thrown
            // away and gets repeated once the transfer is over.
            let regs = self.regs;
            let latches = self.latches;
            self.last_access = LastAccess::None;
            self.step(bus);
            if let LastAccess::Read(addr) = self.last_access {
                self.regs = regs;
                self.latches = latches;
                self.dma.begin(addr);
            }
        } else {
            self.step(bus);
        }
        self.cycles += 1;
    }

    fn step(&mut self, bus: &mut impl Bus) {
        match self.latches.phase {
            Phase::Fetch => self.fetch(bus),
            Phase::Address => self.address_cycle(bus),
            Phase::Execute => self.execute_cycle(bus),
            Phase::Interrupt => self.interrupt_cycle(bus),
            Phase::Jammed => {}
        }
    }

    fn fetch(&mut self, bus: &mut impl Bus) {
        let poll = !self.latches.suppress_poll && (self.irq.prev_run_irq || self.irq.prev_need_nmi);
        self.latches.suppress_poll = false;
        if poll {
            self.begin_sequence(Sequence::Interrupt, 0);
            self.interrupt_cycle(bus);
            return;
        }

        if !self.dma.need_halt {
            self.instructions += 1;
            if self.trace.capacity() > 0 {
                self.trace_instruction(bus);
            }
        }

        let opcode = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.latches.opcode = opcode;
        self.latches.step = 0;
        self.latches.page_crossed = false;

        let op = OPCODES[opcode as usize];
        match op.kind() {
            Kind::Brk => self.begin_sequence(Sequence::Brk, 1),
            Kind::Jam => {
                self.latches.phase = Phase::Jammed;
                warn!(
                    opcode = format_args!("{opcode:#04X}"),
                    pc = format_args!("{:#06X}", self.regs.pc.wrapping_sub(1)),
                    "cpu jammed"
                );
            }
            Kind::Implied
            | Kind::Branch
            | Kind::Rti
            | Kind::Rts
            | Kind::Jsr
            | Kind::Push
            | Kind::Pull => self.latches.phase = Phase::Execute,
            Kind::Read | Kind::Write | Kind::ReadModifyWrite | Kind::Jmp => match op.mode {
                Mode::Immediate => {
                    self.latches.addr = self.regs.pc;
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                    self.latches.phase = Phase::Execute;
                }
                _ => self.latches.phase = Phase::Address,
            },
        }
    }

    fn begin_sequence(&mut self, sequence: Sequence, step: u8) {
        self.latches.sequence = sequence;
        self.latches.phase = Phase::Interrupt;
        self.latches.step = step;
    }

    /// One cycle of the shared BRK/IRQ/NMI/reset sequence.
    ///
    /// Step 0 is the discarded opcode fetch (BRK enters at step 1 after its
    /// real fetch). Reset turns the three stack pushes into reads.
    fn interrupt_cycle(&mut self, bus: &mut impl Bus) {
        let sequence = self.latches.sequence;
        let step = self.latches.step;
        self.latches.step += 1;
        match step {
            0 => {
                self.read(bus, self.regs.pc);
            }
            1 => {
                self.read(bus, self.regs.pc);
                if sequence == Sequence::Brk {
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
            }
            2 => self.push_or_read(bus, (self.regs.pc >> 8) as u8),
            3 => self.push_or_read(bus, self.regs.pc as u8),
            4 => {
                self.push_or_read(bus, self.regs.p.to_stack(sequence == Sequence::Brk));
                // An NMI arriving up to here hijacks BRK/IRQ.
                self.latches.addr = match sequence {
                    Sequence::Reset => cpu_mem::RESET_VECTOR,
                    _ if self.irq.need_nmi => {
                        self.irq.need_nmi = false;
                        cpu_mem::NMI_VECTOR
                    }
                    _ => cpu_mem::IRQ_VECTOR,
                };
                self.regs.p.insert(Status::INTERRUPT);
            }
            5 => self.latches.data = self.read(bus, self.latches.addr),
            _ => {
                let hi = self.read(bus, self.latches.addr.wrapping_add(1));
                self.regs.pc = u16::from_le_bytes([self.latches.data, hi]);
                self.latches.suppress_poll = true;
                self.finish();
            }
        }
    }

    fn push_or_read(&mut self, bus: &mut impl Bus, value: u8) {
        if self.latches.sequence == Sequence::Reset {
            self.read(bus, cpu_mem::STACK_PAGE | self.regs.s as u16);
            self.regs.s = self.regs.s.wrapping_sub(1);
        } else {
            self.push(bus, value);
        }
    }

    /// Samples the NMI input and the IRQ line at the end of a CPU cycle.
    pub fn sample_interrupts(&mut self, nmi_line: bool) {
        let irq = &mut self.irq;
        irq.prev_need_nmi = irq.need_nmi;
        if nmi_line && !irq.nmi_line {
            irq.need_nmi = true;
        }
        irq.nmi_line = nmi_line;

        irq.prev_run_irq = irq.run_irq;
        irq.run_irq = !irq.sources.is_empty() && !self.regs.p.contains(Status::INTERRUPT);
    }

    /// Raises or lowers one IRQ source.
    pub fn set_irq_source(&mut self, source: IrqSource, asserted: bool) {
        self.irq.sources.set(source, asserted);
    }

    pub fn irq_sources(&self) -> IrqSource {
        self.irq.sources
    }

    /// Schedules a 256-byte sprite DMA from `page << 8` to `$2004`.
    pub fn request_oam_dma(&mut self, page: u8) {
        self.dma.request_oam(page);
    }

    /// Schedules a one-byte DMC sample fetch from `addr`.
    pub fn request_dmc_dma(&mut self, addr: u16) {
        self.dma.request_dmc(addr);
    }

    pub(crate) fn read(&mut self, bus: &mut impl Bus, addr: u16) -> u8 {
        self.last_access = LastAccess::Read(addr);
        bus.read(addr)
    }

    pub(crate) fn write(&mut self, bus: &mut impl Bus, addr: u16, value: u8) {
        self.last_access = LastAccess::Write;
        bus.write(addr, value);
    }

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        self.write(bus, cpu_mem::STACK_PAGE | self.regs.s as u16, value);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    /// Reads the byte at PC and advances PC.
    fn fetch_operand(&mut self, bus: &mut impl Bus) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn opcode(&self) -> Opcode {
        OPCODES[self.latches.opcode as usize]
    }

    fn finish(&mut self) {
        self.latches.phase = Phase::Fetch;
        self.latches.step = 0;
    }

    fn trace_instruction(&mut self, bus: &impl Bus) {
        let pc = self.regs.pc;
        let bytes = [
            bus.peek(pc),
            bus.peek(pc.wrapping_add(1)),
            bus.peek(pc.wrapping_add(2)),
        ];
        self.trace
            .push(TraceEntry::new(pc, bytes, &self.regs, self.cycles));
    }

    pub fn registers(&self) -> Registers {
        self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn phase(&self) -> Phase {
        self.latches.phase
    }

    /// True between instructions with no DMA pending.
    pub fn at_instruction_boundary(&self) -> bool {
        self.latches.phase == Phase::Fetch && !self.dma.active && !self.dma.need_halt
    }

    pub fn is_jammed(&self) -> bool {
        self.latches.phase == Phase::Jammed
    }

    pub fn dma_active(&self) -> bool {
        self.dma.active
    }

    /// CPU cycles since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut TraceLog {
        &mut self.trace
    }

    pub fn save_state(&self) -> CpuState {
        CpuState {
            a: self.regs.a,
            x: self.regs.x,
            y: self.regs.y,
            s: self.regs.s,
            p: self.regs.p.bits(),
            pc: self.regs.pc,
            latches: self.latches,
            irq_sources: self.irq.sources.bits(),
            nmi_line: self.irq.nmi_line,
            need_nmi: self.irq.need_nmi,
            prev_need_nmi: self.irq.prev_need_nmi,
            run_irq: self.irq.run_irq,
            prev_run_irq: self.irq.prev_run_irq,
            dma: self.dma,
            cycles: self.cycles,
        }
    }

    pub fn load_state(&mut self, state: &CpuState) {
        self.regs = Registers {
            a: state.a,
            x: state.x,
            y: state.y,
            s: state.s,
            pc: state.pc,
            p: Status::from_stack(state.p),
        };
        self.latches = state.latches;
        self.irq = Interrupts {
            sources: IrqSource::from_bits_truncate(state.irq_sources),
            nmi_line: state.nmi_line,
            need_nmi: state.need_nmi,
            prev_need_nmi: state.prev_need_nmi,
            run_irq: state.run_irq,
            prev_run_irq: state.prev_run_irq,
        };
        self.dma = state.dma;
        self.cycles = state.cycles;
        self.last_access = LastAccess::None;
    }
}


#[cfg(test)]
mod tests {
    use super::{
        test_support::{boot, run_instruction, tick},
        timing::CYCLE_TABLE,
        *,
    };
    use crate::{
        bus::mock::{Access, MockBus},
        tests::TEST_COUNT,
    };
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn reset_sequence_takes_seven_cycles_and_reads_vector() {
        let (cpu, _) = boot(&[0xEA]);
        let regs = cpu.registers();
        assert_eq!(cpu.cycles(), 7);
        assert_eq!(regs.s, 0xFD);
        assert_eq!(regs.p.bits(), 0x24);
    }

    #[test]
    fn documented_cycle_counts_without_page_cross() {
        for opcode in 0..=255u8 {
            let op = OPCODES[opcode as usize];
            if matches!(op.kind(), Kind::Jam | Kind::Branch) {
                continue;
            }
            let (mut cpu, mut bus) = boot(&[opcode, 0x00, 0x00]);
            let cycles = run_instruction(&mut cpu, &mut bus);
            let expected = CYCLE_TABLE[opcode as usize].total_cycles(false, false);
            assert_eq!(cycles, expected, "opcode {opcode:#04X} ({})", op.mnemonic);
        }
    }

    #[test]
    fn pc_advances_by_instruction_length() {
        for opcode in 0..=255u8 {
            let op = OPCODES[opcode as usize];
            if !matches!(
                op.kind(),
                Kind::Read | Kind::Write | Kind::ReadModifyWrite | Kind::Implied
            ) {
                continue;
            }
            let (mut cpu, mut bus) = boot(&[opcode, 0x00, 0x00]);
            run_instruction(&mut cpu, &mut bus);
            assert_eq!(
                cpu.registers().pc,
                0x8000 + op.byte_len() as u16,
                "opcode {opcode:#04X}"
            );
        }
    }

    #[test]
    fn indexed_read_pays_for_page_cross_only() {
        // LDX #$01; LDA $80FF,X
        let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xBD, 0xFF, 0x80]);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 5);

        // LDX #$01; LDA $8010,X
        let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xBD, 0x10, 0x80]);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 4);

        // LDX #$01; STA $0210,X always takes the fix-up cycle
        let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0x9D, 0x10, 0x02]);
        run_instruction(&mut cpu, &mut bus);
        bus.log.clear();
        assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
        assert_eq!(bus.log[3], Access::Read(0x0211));
        assert_eq!(bus.log[4], Access::Write(0x0211, 0x00));
    }

    #[test]
    fn page_cross_dummy_read_hits_unfixed_address() {
        // LDY #$10; LDA ($40),Y with ($40) = $02F8
        let (mut cpu, mut bus) = boot(&[0xA0, 0x10, 0xB1, 0x40]);
        bus.mem[0x40] = 0xF8;
        bus.mem[0x41] = 0x02;
        bus.mem[0x0308] = 0x99;
        run_instruction(&mut cpu, &mut bus);
        bus.log.clear();
        assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
        assert_eq!(bus.log[4], Access::Read(0x0208));
        assert_eq!(bus.log[5], Access::Read(0x0308));
        assert_eq!(cpu.registers().a, 0x99);
    }

    #[test]
    fn branch_costs_depend_on_taken_and_page() {
        // LDA #$00 sets Z; BEQ +2 (taken, same page)
        let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xF0, 0x02]);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
        assert_eq!(cpu.registers().pc, 0x8006);

        // BNE not taken
        let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xD0, 0x02]);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.registers().pc, 0x8004);

        // BEQ -6 from $8004 lands on $7FFE, across a page
        let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xF0, 0xFA]);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
        assert_eq!(cpu.registers().pc, 0x7FFE);
    }

    #[test]
    fn read_modify_write_writes_old_value_first() {
        // INC $10
        let (mut cpu, mut bus) = boot(&[0xE6, 0x10]);
        bus.mem[0x10] = 0x41;
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(
            bus.log[2..],
            [
                Access::Read(0x10),
                Access::Write(0x10, 0x41),
                Access::Write(0x10, 0x42)
            ]
        );
    }

    #[test]
    fn jsr_rts_round_trip() {
        // JSR $8010 ; ... ; $8010: RTS
        let mut program = vec![0x20, 0x10, 0x80, 0xEA];
        program.resize(0x10, 0xEA);
        program.push(0x60);
        let (mut cpu, mut bus) = boot(&program);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.registers().pc, 0x8010);
        assert_eq!(bus.mem[0x01FD], 0x80);
        assert_eq!(bus.mem[0x01FC], 0x02);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.registers().pc, 0x8003);
        assert_eq!(cpu.registers().s, 0xFD);
    }

    #[test]
    fn jmp_indirect_wraps_inside_page() {
        let (mut cpu, mut bus) = boot(&[0x6C, 0xFF, 0x02]);
        bus.mem[0x02FF] = 0x34;
        bus.mem[0x0200] = 0x12;
        bus.mem[0x0300] = 0x99;
        assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
        assert_eq!(cpu.registers().pc, 0x1234);
    }

    #[test]
    fn brk_pushes_break_flag_and_skips_padding() {
        let (mut cpu, mut bus) = boot(&[0x00, 0xFF]);
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;
        assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
        assert_eq!(cpu.registers().pc, 0x9000);
        assert_eq!(bus.mem[0x01FD], 0x80);
        assert_eq!(bus.mem[0x01FC], 0x02);
        assert_eq!(bus.mem[0x01FB] & 0x30, 0x30);
        assert!(cpu.registers().p.contains(Status::INTERRUPT));
    }

    #[test]
    fn rti_restores_all_real_flags() {
        // Stack holds P=$CF, PC=$9000
        let (mut cpu, mut bus) = boot(&[0x40]);
        bus.mem[0x01FE] = 0xCF;
        bus.mem[0x01FF] = 0x00;
        bus.mem[0x0100] = 0x90;
        assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
        let regs = cpu.registers();
        assert_eq!(regs.pc, 0x9000);
        assert_eq!(regs.p.bits(), 0xEF);
    }

    #[test]
    fn irq_waits_one_instruction_after_cli() {
        // CLI; NOP; NOP with the IRQ line already asserted.
        let (mut cpu, mut bus) = boot(&[0x58, 0xEA, 0xEA]);
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;
        cpu.set_irq_source(IrqSource::MAPPER, true);
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(cpu.registers().pc, 0x8001);
        // The NOP after CLI still runs.
        run_instruction(&mut cpu, &mut bus);
        assert_eq!(cpu.registers().pc, 0x8002);
        assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
        assert_eq!(cpu.registers().pc, 0x9000);
        // Hardware interrupts push the address of the next instruction.
        assert_eq!(bus.mem[0x01FC], 0x02);
        assert_eq!(bus.mem[0x01FB] & 0x10, 0);
    }

    #[test]
    fn nmi_fires_once_per_rising_edge() {
        let (mut cpu, mut bus) = boot(&[0xEA; 0x200]);
        bus.mem[0xFFFA] = 0x00;
        bus.mem[0xFFFB] = 0x80;

        let mut nmis = 0;
        for cycle in 0..400 {
            cpu.clock(&mut bus);
            // Line goes high once and stays high.
            cpu.sample_interrupts(cycle >= 10);
            if cpu.latches.phase == Phase::Interrupt && cpu.latches.step == 1 {
                nmis += 1;
            }
        }
        assert_eq!(nmis, 1);

        // Dropping and raising the line again produces a second one.
        cpu.sample_interrupts(false);
        for _ in 0..40 {
            cpu.clock(&mut bus);
            cpu.sample_interrupts(true);
            if cpu.latches.phase == Phase::Interrupt && cpu.latches.step == 1 {
                nmis += 1;
            }
        }
        assert_eq!(nmis, 2);
    }

    #[test]
    fn nmi_hijacks_brk() {
        let (mut cpu, mut bus) = boot(&[0x00, 0x00]);
        bus.mem[0xFFFA] = 0x00;
        bus.mem[0xFFFB] = 0xA0;
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;
        // BRK fetch, padding, push PCH...
        tick(&mut cpu, &mut bus);
        tick(&mut cpu, &mut bus);
        cpu.clock(&mut bus);
        cpu.sample_interrupts(true);
        for _ in 0..4 {
            tick(&mut cpu, &mut bus);
        }
        assert_eq!(cpu.registers().pc, 0xA000);
        // The B flag still marks the push as a BRK.
        assert_eq!(bus.mem[0x01FB] & 0x10, 0x10);
    }

    #[test]
    fn oam_dma_takes_513_or_514_cycles() {
        // STA $4014 with A = $02, then NOPs.
        // A 3-cycle LDA $00 in front flips the parity of the halt cycle.
        for prefix in [&[][..], &[0xA5, 0x00][..]] {
            let mut program = prefix.to_vec();
            program.extend_from_slice(&[0x8D, 0x14, 0x40]);
            program.resize(0x20, 0xEA);
            let (mut cpu, mut bus) = boot(&program);
            for i in 0..256 {
                bus.mem[i] = i as u8;
            }
            if !prefix.is_empty() {
                run_instruction(&mut cpu, &mut bus);
            }
            run_instruction(&mut cpu, &mut bus);
            cpu.request_oam_dma(0x00);
            let halt_cycle = cpu.cycles();
            bus.log.clear();

            let mut cycles = 0;
            loop {
                tick(&mut cpu, &mut bus);
                cycles += 1;
                if cycles > 1 && !cpu.dma_active() {
                    break;
                }
            }
            let expected = if halt_cycle % 2 == 1 { 513 } else { 514 };
            assert_eq!(cycles, expected, "halt at cycle {halt_cycle}");
            let writes: Vec<u8> = bus
                .log
                .iter()
                .filter_map(|a| match a {
                    Access::Write(0x2004, v) => Some(*v),
                    _ => None,
                })
                .collect();
            assert_eq!(writes.len(), 256);
            assert_eq!(writes[0x7F], 0x7F);
            // The halted opcode fetch is repeated afterwards.
            assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
        }
    }

    #[test]
    fn dmc_dma_steals_cycles_and_delivers_byte() {
        let (mut cpu, mut bus) = boot(&[0xEA; 0x20]);
        bus.mem[0xC000] = 0x5A;
        cpu.request_dmc_dma(0xC000);
        let mut cycles = 0;
        loop {
            tick(&mut cpu, &mut bus);
            cycles += 1;
            if cycles > 1 && !cpu.dma_active() {
                break;
            }
        }
        assert_eq!(bus.dmc_bytes, [0x5A]);
        assert!((3..=4).contains(&cycles), "took {cycles}");
    }

    #[test]
    fn jam_stops_bus_activity() {
        let (mut cpu, mut bus) = boot(&[0x02, 0xEA]);
        tick(&mut cpu, &mut bus);
        assert!(cpu.is_jammed());
        bus.log.clear();
        for _ in 0..10 {
            tick(&mut cpu, &mut bus);
        }
        assert!(bus.log.is_empty());
        assert_eq!(cpu.registers().pc, 0x8001);

        cpu.reset();
        for _ in 0..7 {
            tick(&mut cpu, &mut bus);
        }
        assert!(!cpu.is_jammed());
        assert_eq!(cpu.registers().pc, 0x8000);
    }

    #[test]
    fn trace_records_retired_instructions() {
        let (mut cpu, mut bus) = boot(&[0xA9, 0x42, 0x4C, 0xF5, 0xC5]);
        run_instruction(&mut cpu, &mut bus);
        run_instruction(&mut cpu, &mut bus);
        let entries: Vec<&TraceEntry> = cpu.trace().iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "LDA #$42");
        assert_eq!(
            entries[1].to_string(),
            "8002  4C F5 C5  JMP $C5F5    A:42 X:00 Y:00 P:24 SP:FD CYC:9"
        );
    }

    #[test]
    fn adc_and_sbc_flags_follow_binary_arithmetic() {
        let mut rng = StdRng::seed_from_u64(0x6502);
        for _ in 0..TEST_COUNT {
            let a: u8 = rng.random();
            let m: u8 = rng.random();
            let carry: bool = rng.random();
            // SBC is ADC of the complemented operand.
            for (opcode, operand) in [(0x69u8, m), (0xE9, !m)] {
                let (mut cpu, mut bus) = boot(&[opcode, m]);
                let regs = cpu.registers_mut();
                regs.a = a;
                regs.p.set(Status::CARRY, carry);
                run_instruction(&mut cpu, &mut bus);

                let sum = u16::from(a) + u16::from(operand) + u16::from(carry);
                let result = sum as u8;
                let regs = cpu.registers();
                assert_eq!(regs.a, result, "{opcode:#04X} {a:#04X} {m:#04X} {carry}");
                assert_eq!(regs.p.contains(Status::CARRY), sum > 0xFF);
                assert_eq!(
                    regs.p.contains(Status::OVERFLOW),
                    (a ^ result) & (operand ^ result) & 0x80 != 0
                );
                assert_eq!(regs.p.contains(Status::ZERO), result == 0);
                assert_eq!(regs.p.contains(Status::NEGATIVE), result & 0x80 != 0);
            }
        }
    }

    #[test]
    fn state_round_trip_mid_instruction() {
        let (mut cpu, mut bus) = boot(&[0xEE, 0x00, 0x02, 0xEA]);
        tick(&mut cpu, &mut bus);
        tick(&mut cpu, &mut bus);
        let state = cpu.save_state();
        let mut other = Cpu::new(0);
        other.load_state(&state);
        let mut other_bus = MockBus::default();
        other_bus.mem.copy_from_slice(&bus.mem[..]);
        for _ in 0..6 {
            tick(&mut cpu, &mut bus);
            tick(&mut other, &mut other_bus);
        }
        assert_eq!(cpu.save_state(), other.save_state());
        assert_eq!(bus.mem[0x0200], 1);
    }
}
