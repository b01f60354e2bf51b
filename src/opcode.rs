use std::fmt;

use bitflags::bitflags;

use crate::error::TableError;
use crate::features::Group;

bitflags! {
    /// Condition codes an instruction may modify.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Flags: u8 {
        const Z = 0b0_0001;
        const S = 0b0_0010;
        const P = 0b0_0100;
        const CY = 0b0_1000;
        const AC = 0b1_0000;
    }
}

/// Everything except carry, as set by `INR`/`DCR`.
const ZSPAC: Flags = Flags::Z.union(Flags::S).union(Flags::P).union(Flags::AC);

/// 8-bit operand selected by a 3-bit register field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reg {
    B,
    C,
    D,
    E,
    H,
    L,
    /// Memory byte addressed by `HL`.
    M,
    A,
}

impl Reg {
    pub const ALL: [Reg; 8] = [
        Reg::B,
        Reg::C,
        Reg::D,
        Reg::E,
        Reg::H,
        Reg::L,
        Reg::M,
        Reg::A,
    ];

    /// Decode from the low 3 bits of `bits`.
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Reg::B,
            1 => Reg::C,
            2 => Reg::D,
            3 => Reg::E,
            4 => Reg::H,
            5 => Reg::L,
            6 => Reg::M,
            _ => Reg::A,
        }
    }
}

/// Register pair, as addressed by 16-bit instructions.
///
/// `Sp` and `Psw` share an encoding; which one is meant depends on the instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pair {
    Bc,
    De,
    Hl,
    Sp,
    /// Accumulator (high) and flag byte (low).
    Psw,
}

impl Pair {
    /// Decode a pair field for `LXI`, `INX`, `DCX`, `DAD`.
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Pair::Bc,
            1 => Pair::De,
            2 => Pair::Hl,
            _ => Pair::Sp,
        }
    }

    /// Decode a pair field for `PUSH`/`POP`.
    const fn from_stack_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Pair::Bc,
            1 => Pair::De,
            2 => Pair::Hl,
            _ => Pair::Psw,
        }
    }
}

/// Branch condition tested by `Jcc`, `Ccc` and `Rcc`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond {
    /// Not zero
    Nz,
    /// Zero
    Z,
    /// No carry
    Nc,
    /// Carry
    C,
    /// Parity odd
    Po,
    /// Parity even
    Pe,
    /// Plus
    P,
    /// Minus
    M,
}

impl Cond {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Cond::Nz,
            1 => Cond::Z,
            2 => Cond::Nc,
            3 => Cond::C,
            4 => Cond::Po,
            5 => Cond::Pe,
            6 => Cond::P,
            _ => Cond::M,
        }
    }
}

/// Accumulator operation shared by the register and immediate forms.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbb,
    Ana,
    Xra,
    Ora,
    Cmp,
}

impl AluOp {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbb,
            4 => AluOp::Ana,
            5 => AluOp::Xra,
            6 => AluOp::Ora,
            _ => AluOp::Cmp,
        }
    }
}

/// Decoded operation of a single opcode. Operand bytes are not included.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instr {
    Nop,
    Hlt,

    // Data transfer
    Mov(Reg, Reg),
    Mvi(Reg),
    Lxi(Pair),
    Stax(Pair),
    Ldax(Pair),
    Sta,
    Lda,
    Shld,
    Lhld,
    Xchg,

    // Arithmetic and logic
    Inr(Reg),
    Dcr(Reg),
    Inx(Pair),
    Dcx(Pair),
    Dad(Pair),
    Alu(AluOp, Reg),
    AluImm(AluOp),
    Daa,
    Rlc,
    Rrc,
    Ral,
    Rar,
    Cma,
    Stc,
    Cmc,

    // Branch
    Jmp,
    Jcc(Cond),
    Call,
    Ccc(Cond),
    Ret,
    Rcc(Cond),
    Rst(u8),
    Pchl,

    // Stack
    Push(Pair),
    Pop(Pair),
    Xthl,
    Sphl,

    // Machine control
    In,
    Out,
    Ei,
    Di,
}

impl Instr {
    /// Operand bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        match self {
            Instr::Lxi(_)
            | Instr::Sta
            | Instr::Lda
            | Instr::Shld
            | Instr::Lhld
            | Instr::Jmp
            | Instr::Jcc(_)
            | Instr::Call
            | Instr::Ccc(_) => 2,
            Instr::Mvi(_) | Instr::AluImm(_) | Instr::In | Instr::Out => 1,
            _ => 0,
        }
    }

    const fn flags(self) -> Flags {
        match self {
            Instr::Inr(_) | Instr::Dcr(_) => ZSPAC,
            Instr::Alu(..) | Instr::AluImm(_) | Instr::Daa | Instr::Pop(Pair::Psw) => Flags::all(),
            Instr::Dad(_) | Instr::Rlc | Instr::Rrc | Instr::Ral | Instr::Rar => Flags::CY,
            Instr::Stc | Instr::Cmc => Flags::CY,
            _ => Flags::empty(),
        }
    }

    /// Effect in register transfer notation, for listings.
    const fn summary(self) -> &'static str {
        match self {
            Instr::Nop => "no operation",
            Instr::Hlt => "halt until interrupt",
            Instr::Mov(..) => "r1 <- r2",
            Instr::Mvi(_) => "r <- byte",
            Instr::Lxi(_) => "rp <- word",
            Instr::Stax(_) => "(rp) <- A",
            Instr::Ldax(_) => "A <- (rp)",
            Instr::Sta => "(adr) <- A",
            Instr::Lda => "A <- (adr)",
            Instr::Shld => "(adr) <- L; (adr+1) <- H",
            Instr::Lhld => "L <- (adr); H <- (adr+1)",
            Instr::Xchg => "HL <-> DE",
            Instr::Inr(_) => "r <- r+1",
            Instr::Dcr(_) => "r <- r-1",
            Instr::Inx(_) => "rp <- rp+1",
            Instr::Dcx(_) => "rp <- rp-1",
            Instr::Dad(_) => "HL <- HL + rp",
            Instr::Alu(op, _) => match op {
                AluOp::Add => "A <- A + r",
                AluOp::Adc => "A <- A + r + CY",
                AluOp::Sub => "A <- A - r",
                AluOp::Sbb => "A <- A - r - CY",
                AluOp::Ana => "A <- A & r",
                AluOp::Xra => "A <- A ^ r",
                AluOp::Ora => "A <- A | r",
                AluOp::Cmp => "A - r",
            },
            Instr::AluImm(op) => match op {
                AluOp::Add => "A <- A + byte",
                AluOp::Adc => "A <- A + byte + CY",
                AluOp::Sub => "A <- A - byte",
                AluOp::Sbb => "A <- A - byte - CY",
                AluOp::Ana => "A <- A & byte",
                AluOp::Xra => "A <- A ^ byte",
                AluOp::Ora => "A <- A | byte",
                AluOp::Cmp => "A - byte",
            },
            Instr::Daa => "decimal adjust A",
            Instr::Rlc => "A <- A << 1; CY <- A7",
            Instr::Rrc => "A <- A >> 1; CY <- A0",
            Instr::Ral => "A <- A << 1 through CY",
            Instr::Rar => "A <- A >> 1 through CY",
            Instr::Cma => "A <- !A",
            Instr::Stc => "CY <- 1",
            Instr::Cmc => "CY <- !CY",
            Instr::Jmp => "PC <- adr",
            Instr::Jcc(_) => "if cond, PC <- adr",
            Instr::Call => "push PC; PC <- adr",
            Instr::Ccc(_) => "if cond, push PC; PC <- adr",
            Instr::Ret => "PC <- pop",
            Instr::Rcc(_) => "if cond, PC <- pop",
            Instr::Rst(_) => "push PC; PC <- 8*n",
            Instr::Pchl => "PC <- HL",
            Instr::Push(_) => "push rp",
            Instr::Pop(_) => "rp <- pop",
            Instr::Xthl => "L <-> (SP); H <-> (SP+1)",
            Instr::Sphl => "SP <- HL",
            Instr::In => "A <- port",
            Instr::Out => "port <- A",
            Instr::Ei => "enable interrupts",
            Instr::Di => "disable interrupts",
        }
    }

    const fn mnemonic(self) -> &'static str {
        match self {
            Instr::Nop => "NOP",
            Instr::Hlt => "HLT",
            Instr::Mov(..) => "MOV",
            Instr::Mvi(_) => "MVI",
            Instr::Lxi(_) => "LXI",
            Instr::Stax(_) => "STAX",
            Instr::Ldax(_) => "LDAX",
            Instr::Sta => "STA",
            Instr::Lda => "LDA",
            Instr::Shld => "SHLD",
            Instr::Lhld => "LHLD",
            Instr::Xchg => "XCHG",
            Instr::Inr(_) => "INR",
            Instr::Dcr(_) => "DCR",
            Instr::Inx(_) => "INX",
            Instr::Dcx(_) => "DCX",
            Instr::Dad(_) => "DAD",
            Instr::Alu(op, _) => match op {
                AluOp::Add => "ADD",
                AluOp::Adc => "ADC",
                AluOp::Sub => "SUB",
                AluOp::Sbb => "SBB",
                AluOp::Ana => "ANA",
                AluOp::Xra => "XRA",
                AluOp::Ora => "ORA",
                AluOp::Cmp => "CMP",
            },
            Instr::AluImm(op) => match op {
                AluOp::Add => "ADI",
                AluOp::Adc => "ACI",
                AluOp::Sub => "SUI",
                AluOp::Sbb => "SBI",
                AluOp::Ana => "ANI",
                AluOp::Xra => "XRI",
                AluOp::Ora => "ORI",
                AluOp::Cmp => "CPI",
            },
            Instr::Daa => "DAA",
            Instr::Rlc => "RLC",
            Instr::Rrc => "RRC",
            Instr::Ral => "RAL",
            Instr::Rar => "RAR",
            Instr::Cma => "CMA",
            Instr::Stc => "STC",
            Instr::Cmc => "CMC",
            Instr::Jmp => "JMP",
            Instr::Jcc(cond) => match cond {
                Cond::Nz => "JNZ",
                Cond::Z => "JZ",
                Cond::Nc => "JNC",
                Cond::C => "JC",
                Cond::Po => "JPO",
                Cond::Pe => "JPE",
                Cond::P => "JP",
                Cond::M => "JM",
            },
            Instr::Call => "CALL",
            Instr::Ccc(cond) => match cond {
                Cond::Nz => "CNZ",
                Cond::Z => "CZ",
                Cond::Nc => "CNC",
                Cond::C => "CC",
                Cond::Po => "CPO",
                Cond::Pe => "CPE",
                Cond::P => "CP",
                Cond::M => "CM",
            },
            Instr::Ret => "RET",
            Instr::Rcc(cond) => match cond {
                Cond::Nz => "RNZ",
                Cond::Z => "RZ",
                Cond::Nc => "RNC",
                Cond::C => "RC",
                Cond::Po => "RPO",
                Cond::Pe => "RPE",
                Cond::P => "RP",
                Cond::M => "RM",
            },
            Instr::Rst(_) => "RST",
            Instr::Pchl => "PCHL",
            Instr::Push(_) => "PUSH",
            Instr::Pop(_) => "POP",
            Instr::Xthl => "XTHL",
            Instr::Sphl => "SPHL",
            Instr::In => "IN",
            Instr::Out => "OUT",
            Instr::Ei => "EI",
            Instr::Di => "DI",
        }
    }
}

/// Static definition of one opcode byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Opcode {
    /// The byte this entry describes.
    pub code: u8,
    pub mnemonic: &'static str,
    /// Short description of the effect, e.g. `A <- A + r`.
    pub summary: &'static str,
    /// Total encoded length, opcode included.
    pub len: u8,
    /// Condition codes the instruction may modify.
    pub flags: Flags,
    pub instr: Instr,
    pub group: Group,
}

static OPCODES: [Opcode; 256] = build_table();

/// Definition of `code`. Total over all byte values.
#[inline]
pub fn lookup(code: u8) -> &'static Opcode {
    &OPCODES[code as usize]
}

/// Startup self-check of the opcode table.
pub fn check_table() -> Result<(), TableError> {
    check(&OPCODES)
}

fn check(table: &[Opcode]) -> Result<(), TableError> {
    if table.len() != 256 {
        return Err(TableError::Size { len: table.len() });
    }
    for (index, opcode) in table.iter().enumerate() {
        if opcode.code as usize != index {
            return Err(TableError::Misplaced {
                index,
                code: opcode.code,
            });
        }
        let expected = 1 + opcode.instr.operand_len();
        if !(1..=3).contains(&opcode.len) || opcode.len != expected {
            return Err(TableError::Length {
                code: opcode.code,
                len: opcode.len,
                expected,
            });
        }
        if opcode.mnemonic.is_empty() || opcode.summary.is_empty() {
            return Err(TableError::Unnamed { code: opcode.code });
        }
    }
    Ok(())
}

const fn build_table() -> [Opcode; 256] {
    let mut table = [decode(0); 256];
    let mut code = 0;
    while code < 256 {
        table[code] = decode(code as u8);
        code += 1;
    }
    table
}

const fn decode(code: u8) -> Opcode {
    let (instr, group) = match code >> 6 {
        0 => decode_low(code),
        1 if code == 0x76 => (Instr::Hlt, Group::Base),
        1 => (
            Instr::Mov(Reg::from_bits(code >> 3), Reg::from_bits(code)),
            Group::Base,
        ),
        2 => (
            Instr::Alu(AluOp::from_bits(code >> 3), Reg::from_bits(code)),
            Group::Base,
        ),
        _ => decode_high(code),
    };
    Opcode {
        code,
        mnemonic: instr.mnemonic(),
        summary: instr.summary(),
        len: 1 + instr.operand_len(),
        flags: instr.flags(),
        instr,
        group,
    }
}

/// 0x00..=0x3F
const fn decode_low(code: u8) -> (Instr, Group) {
    let pair = Pair::from_bits(code >> 4);
    let reg = Reg::from_bits(code >> 3);
    let row = (code >> 3) & 0b111;
    let instr = match code & 0b111 {
        0 if code == 0x00 => Instr::Nop,
        0 => return (Instr::Nop, Group::Undocumented),
        1 if code & 0x08 == 0 => Instr::Lxi(pair),
        1 => Instr::Dad(pair),
        2 => match row {
            0 => Instr::Stax(Pair::Bc),
            1 => Instr::Ldax(Pair::Bc),
            2 => Instr::Stax(Pair::De),
            3 => Instr::Ldax(Pair::De),
            4 => Instr::Shld,
            5 => Instr::Lhld,
            6 => Instr::Sta,
            _ => Instr::Lda,
        },
        3 if code & 0x08 == 0 => Instr::Inx(pair),
        3 => Instr::Dcx(pair),
        4 => Instr::Inr(reg),
        5 => Instr::Dcr(reg),
        6 => Instr::Mvi(reg),
        _ => match row {
            0 => Instr::Rlc,
            1 => Instr::Rrc,
            2 => Instr::Ral,
            3 => Instr::Rar,
            4 => return (Instr::Daa, Group::Decimal),
            5 => Instr::Cma,
            6 => Instr::Stc,
            _ => Instr::Cmc,
        },
    };
    (instr, Group::Base)
}

/// 0xC0..=0xFF
const fn decode_high(code: u8) -> (Instr, Group) {
    let cond = Cond::from_bits(code >> 3);
    let pair = Pair::from_stack_bits(code >> 4);
    let row = (code >> 3) & 0b111;
    match code & 0b111 {
        0 => (Instr::Rcc(cond), Group::Base),
        1 => match row {
            1 => (Instr::Ret, Group::Base),
            3 => (Instr::Ret, Group::Undocumented),
            5 => (Instr::Pchl, Group::Base),
            7 => (Instr::Sphl, Group::Base),
            _ => (Instr::Pop(pair), Group::Base),
        },
        2 => (Instr::Jcc(cond), Group::Base),
        3 => match row {
            0 => (Instr::Jmp, Group::Base),
            1 => (Instr::Jmp, Group::Undocumented),
            2 => (Instr::Out, Group::Io),
            3 => (Instr::In, Group::Io),
            4 => (Instr::Xthl, Group::Base),
            5 => (Instr::Xchg, Group::Base),
            6 => (Instr::Di, Group::Interrupt),
            _ => (Instr::Ei, Group::Interrupt),
        },
        4 => (Instr::Ccc(cond), Group::Base),
        5 => match row {
            1 => (Instr::Call, Group::Base),
            3 | 5 | 7 => (Instr::Call, Group::Undocumented),
            _ => (Instr::Push(pair), Group::Base),
        },
        6 => (Instr::AluImm(AluOp::from_bits(code >> 3)), Group::Base),
        _ => (Instr::Rst(row), Group::Restart),
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::B => "B",
            Reg::C => "C",
            Reg::D => "D",
            Reg::E => "E",
            Reg::H => "H",
            Reg::L => "L",
            Reg::M => "M",
            Reg::A => "A",
        };
        f.write_str(name)
    }
}

/// Assembler spelling: `B`, `D`, `H`, `SP`, `PSW`.
impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pair::Bc => "B",
            Pair::De => "D",
            Pair::Hl => "H",
            Pair::Sp => "SP",
            Pair::Psw => "PSW",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_is_defined() {
        for code in 0..=u8::MAX {
            let opcode = lookup(code);
            assert_eq!(opcode.code, code);
            assert!((1..=3).contains(&opcode.len), "0x{code:02x}");
            assert!(!opcode.mnemonic.is_empty(), "0x{code:02x}");
        }
        assert_eq!(check_table(), Ok(()));
    }

    #[test]
    fn check_rejects_broken_tables() {
        let mut table = OPCODES;
        table[0x10] = table[0x11];
        assert_eq!(
            check(&table),
            Err(TableError::Misplaced {
                index: 0x10,
                code: 0x11
            })
        );

        let mut table = OPCODES;
        table[0x01].len = 1;
        assert_eq!(
            check(&table),
            Err(TableError::Length {
                code: 0x01,
                len: 1,
                expected: 3
            })
        );

        assert_eq!(
            check(&OPCODES[..255]),
            Err(TableError::Size { len: 255 })
        );
    }

    #[test]
    fn summaries() {
        assert_eq!(lookup(0x80).summary, "A <- A + r");
        assert_eq!(lookup(0xFE).summary, "A - byte");
        assert_eq!(lookup(0xEB).summary, "HL <-> DE");
        assert_eq!(lookup(0xCD).summary, lookup(0xDD).summary);
        assert!((0..=u8::MAX).all(|code| !lookup(code).summary.is_empty()));
    }

    #[test]
    fn nop_duplicates() {
        assert_eq!(lookup(0x00).group, Group::Base);
        for code in [0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38] {
            let opcode = lookup(code);
            assert_eq!(opcode.instr, Instr::Nop);
            assert_eq!(opcode.len, 1);
            assert_eq!(opcode.group, Group::Undocumented);
        }
    }

    #[test]
    fn undocumented_aliases() {
        assert_eq!(lookup(0xCB).instr, lookup(0xC3).instr);
        assert_eq!(lookup(0xD9).instr, lookup(0xC9).instr);
        for code in [0xDD, 0xED, 0xFD] {
            assert_eq!(lookup(code).instr, Instr::Call);
            assert_eq!(lookup(code).len, 3);
            assert_eq!(lookup(code).group, Group::Undocumented);
        }
    }

    #[test]
    fn lengths() {
        #[rustfmt::skip]
        let cases = [
            (0x01, "LXI", 3), (0x06, "MVI", 2), (0x0E, "MVI", 2), (0x22, "SHLD", 3),
            (0x3A, "LDA", 3), (0x41, "MOV", 1), (0x76, "HLT", 1), (0x86, "ADD", 1),
            (0xC2, "JNZ", 3), (0xC6, "ADI", 2), (0xCD, "CALL", 3), (0xD3, "OUT", 2),
            (0xDB, "IN", 2), (0xE3, "XTHL", 1), (0xF5, "PUSH", 1), (0xFE, "CPI", 2),
            (0xFF, "RST", 1),
        ];
        for (code, mnemonic, len) in cases {
            assert_eq!(lookup(code).mnemonic, mnemonic, "0x{code:02x}");
            assert_eq!(lookup(code).len, len, "0x{code:02x}");
        }
    }

    #[test]
    fn operands() {
        assert_eq!(lookup(0x41).instr, Instr::Mov(Reg::B, Reg::C));
        assert_eq!(lookup(0x77).instr, Instr::Mov(Reg::M, Reg::A));
        assert_eq!(lookup(0x7E).instr, Instr::Mov(Reg::A, Reg::M));
        assert_eq!(lookup(0x31).instr, Instr::Lxi(Pair::Sp));
        assert_eq!(lookup(0xF1).instr, Instr::Pop(Pair::Psw));
        assert_eq!(lookup(0xC5).instr, Instr::Push(Pair::Bc));
        assert_eq!(lookup(0x9E).instr, Instr::Alu(AluOp::Sbb, Reg::M));
        assert_eq!(lookup(0xFA).instr, Instr::Jcc(Cond::M));
        assert_eq!(lookup(0xEC).instr, Instr::Ccc(Cond::Pe));
        assert_eq!(lookup(0xD0).instr, Instr::Rcc(Cond::Nc));
        assert_eq!(lookup(0xEF).instr, Instr::Rst(5));
    }

    #[test]
    fn declared_flags() {
        assert_eq!(lookup(0x80).flags, Flags::all());
        assert_eq!(lookup(0x27).flags, Flags::all());
        assert_eq!(lookup(0x09).flags, Flags::CY);
        assert_eq!(lookup(0x07).flags, Flags::CY);
        assert_eq!(lookup(0x04).flags, ZSPAC);
        assert!(!lookup(0x04).flags.contains(Flags::CY));
        assert_eq!(lookup(0x03).flags, Flags::empty());
        assert_eq!(lookup(0x2F).flags, Flags::empty());
        assert_eq!(lookup(0xF1).flags, Flags::all());
        assert_eq!(lookup(0xC1).flags, Flags::empty());
    }

    #[test]
    fn groups() {
        assert_eq!(lookup(0x27).group, Group::Decimal);
        assert_eq!(lookup(0xD3).group, Group::Io);
        assert_eq!(lookup(0xDB).group, Group::Io);
        assert_eq!(lookup(0xF3).group, Group::Interrupt);
        assert_eq!(lookup(0xFB).group, Group::Interrupt);
        for row in 0..8 {
            assert_eq!(lookup(0xC7 | row << 3).group, Group::Restart);
        }
        let base = (0..=u8::MAX)
            .filter(|code| lookup(*code).group == Group::Base)
            .count();
        // 256 - 8 RST - 12 undocumented - IN/OUT - EI/DI - DAA
        assert_eq!(base, 256 - 8 - 12 - 2 - 2 - 1);
    }
}
