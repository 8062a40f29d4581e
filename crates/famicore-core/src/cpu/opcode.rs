//! Opcode decode table.
//!
//! Every one of the 256 opcode values decodes to a mnemonic and an
//! addressing mode. The mnemonic's [`Kind`] decides which cycle pattern the
//! execute phase follows.

use core::fmt;

/// Addressing modes of the 6502.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($nnnn)` only.
    Indirect,
    /// `(zp,X)`
    IndirectX,
    /// `(zp),Y`
    IndirectY,
    Relative,
}

impl Mode {
    /// Operand bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndirectX
            | Mode::IndirectY
            | Mode::Relative => 1,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
        }
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // Official
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial
    Alr, Anc, Ane, Arr, Dcp, Isc, Jam, Las, Lax, Lxa, Rla, Rra, Sax, Sbx,
    Sha, Shx, Shy, Slo, Sre, Tas,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{self:?}").to_uppercase();
        f.write_str(&name)
    }
}

/// Cycle pattern family of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Reads one operand byte and combines it with registers.
    Read,
    /// Stores a register-derived byte.
    Write,
    /// Read, dummy write of the old value, write of the new value.
    ReadModifyWrite,
    /// Register-only work after a dummy operand read.
    Implied,
    Branch,
    Brk,
    Rti,
    Rts,
    Jsr,
    Jmp,
    Push,
    Pull,
    Jam,
}

/// One decoded table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
}

impl Opcode {
    pub const fn kind(self) -> Kind {
        use Mnemonic::*;
        match self.mnemonic {
            Asl | Lsr | Rol | Ror if matches!(self.mode, Mode::Accumulator) => Kind::Implied,
            Nop if matches!(self.mode, Mode::Implied) => Kind::Implied,
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Lda | Ldx | Ldy | Ora | Sbc | Nop | Lax
            | Anc | Alr | Arr | Ane | Lxa | Sbx | Las => Kind::Read,
            Sta | Stx | Sty | Sax | Sha | Shx | Shy | Tas => Kind::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Slo | Rla | Sre | Rra | Dcp | Isc => {
                Kind::ReadModifyWrite
            }
            Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs => Kind::Branch,
            Brk => Kind::Brk,
            Rti => Kind::Rti,
            Rts => Kind::Rts,
            Jsr => Kind::Jsr,
            Jmp => Kind::Jmp,
            Pha | Php => Kind::Push,
            Pla | Plp => Kind::Pull,
            Jam => Kind::Jam,
            Clc | Cld | Cli | Clv | Sec | Sed | Sei | Dex | Dey | Inx | Iny | Tax | Tay | Tsx
            | Txa | Txs | Tya => Kind::Implied,
        }
    }

    /// Bytes occupied by the instruction, opcode included.
    pub const fn byte_len(self) -> u8 {
        1 + self.mode.operand_len()
    }
}

use Mnemonic as M;
use Mode as A;

const fn op(mnemonic: Mnemonic, mode: Mode) -> Opcode {
    Opcode { mnemonic, mode }
}

const IMP: A = A::Implied;
const ACC: A = A::Accumulator;
const IMM: A = A::Immediate;
const REL: A = A::Relative;
const ZP: A = A::ZeroPage;
const ZPX: A = A::ZeroPageX;
const ZPY: A = A::ZeroPageY;
const ABS: A = A::Absolute;
const ABX: A = A::AbsoluteX;
const ABY: A = A::AbsoluteY;
const IND: A = A::Indirect;
const INX: A = A::IndirectX;
const INY: A = A::IndirectY;

#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    op(M::Brk, IMP), op(M::Ora, INX), op(M::Jam, IMP), op(M::Slo, INX), op(M::Nop, ZP),  op(M::Ora, ZP),  op(M::Asl, ZP),  op(M::Slo, ZP),
    op(M::Php, IMP), op(M::Ora, IMM), op(M::Asl, ACC), op(M::Anc, IMM), op(M::Nop, ABS), op(M::Ora, ABS), op(M::Asl, ABS), op(M::Slo, ABS),
    // 0x10
    op(M::Bpl, REL), op(M::Ora, INY), op(M::Jam, IMP), op(M::Slo, INY), op(M::Nop, ZPX), op(M::Ora, ZPX), op(M::Asl, ZPX), op(M::Slo, ZPX),
    op(M::Clc, IMP), op(M::Ora, ABY), op(M::Nop, IMP), op(M::Slo, ABY), op(M::Nop, ABX), op(M::Ora, ABX), op(M::Asl, ABX), op(M::Slo, ABX),
    // 0x20
    op(M::Jsr, ABS), op(M::And, INX), op(M::Jam, IMP), op(M::Rla, INX), op(M::Bit, ZP),  op(M::And, ZP),  op(M::Rol, ZP),  op(M::Rla, ZP),
    op(M::Plp, IMP), op(M::And, IMM), op(M::Rol, ACC), op(M::Anc, IMM), op(M::Bit, ABS), op(M::And, ABS), op(M::Rol, ABS), op(M::Rla, ABS),
    // 0x30
    op(M::Bmi, REL), op(M::And, INY), op(M::Jam, IMP), op(M::Rla, INY), op(M::Nop, ZPX), op(M::And, ZPX), op(M::Rol, ZPX), op(M::Rla, ZPX),
    op(M::Sec, IMP), op(M::And, ABY), op(M::Nop, IMP), op(M::Rla, ABY), op(M::Nop, ABX), op(M::And, ABX), op(M::Rol, ABX), op(M::Rla, ABX),
    // 0x40
    op(M::Rti, IMP), op(M::Eor, INX), op(M::Jam, IMP), op(M::Sre, INX), op(M::Nop, ZP),  op(M::Eor, ZP),  op(M::Lsr, ZP),  op(M::Sre, ZP),
    op(M::Pha, IMP), op(M::Eor, IMM), op(M::Lsr, ACC), op(M::Alr, IMM), op(M::Jmp, ABS), op(M::Eor, ABS), op(M::Lsr, ABS), op(M::Sre, ABS),
    // 0x50
    op(M::Bvc, REL), op(M::Eor, INY), op(M::Jam, IMP), op(M::Sre, INY), op(M::Nop, ZPX), op(M::Eor, ZPX), op(M::Lsr, ZPX), op(M::Sre, ZPX),
    op(M::Cli, IMP), op(M::Eor, ABY), op(M::Nop, IMP), op(M::Sre, ABY), op(M::Nop, ABX), op(M::Eor, ABX), op(M::Lsr, ABX), op(M::Sre, ABX),
    // 0x60
    op(M::Rts, IMP), op(M::Adc, INX), op(M::Jam, IMP), op(M::Rra, INX), op(M::Nop, ZP),  op(M::Adc, ZP),  op(M::Ror, ZP),  op(M::Rra, ZP),
    op(M::Pla, IMP), op(M::Adc, IMM), op(M::Ror, ACC), op(M::Arr, IMM), op(M::Jmp, IND), op(M::Adc, ABS), op(M::Ror, ABS), op(M::Rra, ABS),
    // 0x70
    op(M::Bvs, REL), op(M::Adc, INY), op(M::Jam, IMP), op(M::Rra, INY), op(M::Nop, ZPX), op(M::Adc, ZPX), op(M::Ror, ZPX), op(M::Rra, ZPX),
    op(M::Sei, IMP), op(M::Adc, ABY), op(M::Nop, IMP), op(M::Rra, ABY), op(M::Nop, ABX), op(M::Adc, ABX), op(M::Ror, ABX), op(M::Rra, ABX),
    // 0x80
    op(M::Nop, IMM), op(M::Sta, INX), op(M::Nop, IMM), op(M::Sax, INX), op(M::Sty, ZP),  op(M::Sta, ZP),  op(M::Stx, ZP),  op(M::Sax, ZP),
    op(M::Dey, IMP), op(M::Nop, IMM), op(M::Txa, IMP), op(M::Ane, IMM), op(M::Sty, ABS), op(M::Sta, ABS), op(M::Stx, ABS), op(M::Sax, ABS),
    // 0x90
    op(M::Bcc, REL), op(M::Sta, INY), op(M::Jam, IMP), op(M::Sha, INY), op(M::Sty, ZPX), op(M::Sta, ZPX), op(M::Stx, ZPY), op(M::Sax, ZPY),
    op(M::Tya, IMP), op(M::Sta, ABY), op(M::Txs, IMP), op(M::Tas, ABY), op(M::Shy, ABX), op(M::Sta, ABX), op(M::Shx, ABY), op(M::Sha, ABY),
    // 0xA0
    op(M::Ldy, IMM), op(M::Lda, INX), op(M::Ldx, IMM), op(M::Lax, INX), op(M::Ldy, ZP),  op(M::Lda, ZP),  op(M::Ldx, ZP),  op(M::Lax, ZP),
    op(M::Tay, IMP), op(M::Lda, IMM), op(M::Tax, IMP), op(M::Lxa, IMM), op(M::Ldy, ABS), op(M::Lda, ABS), op(M::Ldx, ABS), op(M::Lax, ABS),
    // 0xB0
    op(M::Bcs, REL), op(M::Lda, INY), op(M::Jam, IMP), op(M::Lax, INY), op(M::Ldy, ZPX), op(M::Lda, ZPX), op(M::Ldx, ZPY), op(M::Lax, ZPY),
    op(M::Clv, IMP), op(M::Lda, ABY), op(M::Tsx, IMP), op(M::Las, ABY), op(M::Ldy, ABX), op(M::Lda, ABX), op(M::Ldx, ABY), op(M::Lax, ABY),
    // 0xC0
    op(M::Cpy, IMM), op(M::Cmp, INX), op(M::Nop, IMM), op(M::Dcp, INX), op(M::Cpy, ZP),  op(M::Cmp, ZP),  op(M::Dec, ZP),  op(M::Dcp, ZP),
    op(M::Iny, IMP), op(M::Cmp, IMM), op(M::Dex, IMP), op(M::Sbx, IMM), op(M::Cpy, ABS), op(M::Cmp, ABS), op(M::Dec, ABS), op(M::Dcp, ABS),
    // 0xD0
    op(M::Bne, REL), op(M::Cmp, INY), op(M::Jam, IMP), op(M::Dcp, INY), op(M::Nop, ZPX), op(M::Cmp, ZPX), op(M::Dec, ZPX), op(M::Dcp, ZPX),
    op(M::Cld, IMP), op(M::Cmp, ABY), op(M::Nop, IMP), op(M::Dcp, ABY), op(M::Nop, ABX), op(M::Cmp, ABX), op(M::Dec, ABX), op(M::Dcp, ABX),
    // 0xE0
    op(M::Cpx, IMM), op(M::Sbc, INX), op(M::Nop, IMM), op(M::Isc, INX), op(M::Cpx, ZP),  op(M::Sbc, ZP),  op(M::Inc, ZP),  op(M::Isc, ZP),
    op(M::Inx, IMP), op(M::Sbc, IMM), op(M::Nop, IMP), op(M::Sbc, IMM), op(M::Cpx, ABS), op(M::Sbc, ABS), op(M::Inc, ABS), op(M::Isc, ABS),
    // 0xF0
    op(M::Beq, REL), op(M::Sbc, INY), op(M::Jam, IMP), op(M::Isc, INY), op(M::Nop, ZPX), op(M::Sbc, ZPX), op(M::Inc, ZPX), op(M::Isc, ZPX),
    op(M::Sed, IMP), op(M::Sbc, ABY), op(M::Nop, IMP), op(M::Isc, ABY), op(M::Nop, ABX), op(M::Sbc, ABX), op(M::Inc, ABX), op(M::Isc, ABX),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_twelve_jam_opcodes() {
        let jams: Vec<usize> = (0..256)
            .filter(|&i| OPCODES[i].kind() == Kind::Jam)
            .collect();
        assert_eq!(
            jams,
            [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn accumulator_shifts_are_implied() {
        assert_eq!(OPCODES[0x0A].kind(), Kind::Implied);
        assert_eq!(OPCODES[0x06].kind(), Kind::ReadModifyWrite);
        assert_eq!(OPCODES[0xEA].kind(), Kind::Implied);
        assert_eq!(OPCODES[0x04].kind(), Kind::Read);
        assert_eq!(OPCODES[0x8D].kind(), Kind::Write);
    }

    #[test]
    fn mnemonic_display_is_uppercase() {
        assert_eq!(Mnemonic::Lda.to_string(), "LDA");
        assert_eq!(OPCODES[0xC7].mnemonic.to_string(), "DCP");
    }
}
