//! Instruction trace ring.
//!
//! Entries are captured at opcode fetch, before the instruction runs, and
//! print in the familiar nestest layout:
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5    A:00 X:00 Y:00 P:24 SP:FD CYC:7
//! ```

use std::{collections::VecDeque, fmt};

use crate::cpu::{Mode, OPCODES, Registers};

/// One dispatched instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub pc: u16,
    /// Opcode followed by up to two operand bytes; only `len` are meaningful.
    pub bytes: [u8; 3],
    pub len: u8,
    /// Disassembly, e.g. `LDA ($20),Y`.
    pub text: String,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub s: u8,
    /// CPU cycle of the opcode fetch.
    pub cycle: u64,
}

impl TraceEntry {
    pub(crate) fn new(pc: u16, bytes: [u8; 3], regs: &Registers, cycle: u64) -> Self {
        let op = OPCODES[bytes[0] as usize];
        Self {
            pc,
            bytes,
            len: op.byte_len(),
            text: disassemble(pc, bytes),
            a: regs.a,
            x: regs.x,
            y: regs.y,
            p: regs.p.bits(),
            s: regs.s,
            cycle,
        }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.bytes[..self.len as usize]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "{:04X}  {:<8}  {:<12} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc, raw, self.text, self.a, self.x, self.y, self.p, self.s, self.cycle
        )
    }
}

/// Formats the instruction starting with `bytes[0]` located at `pc`.
pub fn disassemble(pc: u16, bytes: [u8; 3]) -> String {
    let op = OPCODES[bytes[0] as usize];
    let zp = bytes[1];
    let abs = u16::from_le_bytes([bytes[1], bytes[2]]);
    let operand = match op.mode {
        Mode::Implied => String::new(),
        Mode::Accumulator => "A".to_string(),
        Mode::Immediate => format!("#${zp:02X}"),
        Mode::ZeroPage => format!("${zp:02X}"),
        Mode::ZeroPageX => format!("${zp:02X},X"),
        Mode::ZeroPageY => format!("${zp:02X},Y"),
        Mode::Absolute => format!("${abs:04X}"),
        Mode::AbsoluteX => format!("${abs:04X},X"),
        Mode::AbsoluteY => format!("${abs:04X},Y"),
        Mode::Indirect => format!("(${abs:04X})"),
        Mode::IndirectX => format!("(${zp:02X},X)"),
        Mode::IndirectY => format!("(${zp:02X}),Y"),
        Mode::Relative => {
            let target = pc.wrapping_add(2).wrapping_add(zp as i8 as u16);
            format!("${target:04X}")
        }
    };
    if operand.is_empty() {
        op.mnemonic.to_string()
    } else {
        format!("{} {operand}", op.mnemonic)
    }
}

/// Bounded ring of the most recent [`TraceEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: VecDeque<TraceEntry>,
    capacity: usize,
}

impl TraceLog {
    /// A ring holding at most `capacity` entries; 0 disables tracing.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, dropping the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
