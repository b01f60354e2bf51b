use std::fmt;

use crate::opcode::{self, Instr, Opcode};
use crate::state::addr;

/// One decoded instruction of a listing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Record<'a> {
    /// Address of the opcode byte.
    pub addr: u16,
    pub opcode: &'static Opcode,
    /// Bytes following the opcode. Shorter than declared if the input ended early.
    pub operands: &'a [u8],
}

impl Record<'_> {
    /// Whether the input ended before all operand bytes were read.
    pub fn is_truncated(&self) -> bool {
        self.operands.len() + 1 < self.opcode.len as usize
    }

    /// 16-bit operand, if the instruction has one and it is complete.
    pub fn word(&self) -> Option<u16> {
        match self.operands {
            [lo, hi] => Some(addr(*hi, *lo)),
            _ => None,
        }
    }

    /// 8-bit operand, if the instruction has one and it is complete.
    pub fn byte(&self) -> Option<u8> {
        match (self.opcode.len, self.operands) {
            (2, [value]) => Some(*value),
            _ => None,
        }
    }
}

/// Lazy decoder over a byte slice. Clone it to restart from the same point.
#[derive(Clone, Debug)]
pub struct Disassembly<'a> {
    bytes: &'a [u8],
    base: u16,
    offset: usize,
}

/// Decode `bytes` as if they were loaded at `base`.
pub fn disassemble(bytes: &[u8], base: u16) -> Disassembly<'_> {
    Disassembly {
        bytes,
        base,
        offset: 0,
    }
}

impl<'a> Iterator for Disassembly<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let code = *self.bytes.get(self.offset)?;
        let opcode = opcode::lookup(code);
        let start = self.offset + 1;
        let end = (self.offset + opcode.len as usize).min(self.bytes.len());
        let record = Record {
            addr: self.base.wrapping_add(self.offset as u16),
            opcode,
            operands: &self.bytes[start..end],
        };
        self.offset += opcode.len as usize;
        Some(record)
    }
}

/// `0100  3e 07     MVI   A,$07`
impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = format!("{:02x}", self.opcode.code);
        for byte in self.operands {
            raw.push_str(&format!(" {byte:02x}"));
        }
        write!(f, "{:04x}  {raw:<10}{:<6}", self.addr, self.opcode.mnemonic)?;

        let imm = match (self.byte(), self.word()) {
            (Some(byte), _) => format!("${byte:02x}"),
            (_, Some(word)) => format!("${word:04x}"),
            _ if self.opcode.len > 1 => "??".to_string(),
            _ => String::new(),
        };
        match self.opcode.instr {
            Instr::Mov(dest, src) => write!(f, "{dest},{src}"),
            Instr::Mvi(reg) => write!(f, "{reg},{imm}"),
            Instr::Lxi(pair) => write!(f, "{pair},{imm}"),
            Instr::Inr(reg) | Instr::Dcr(reg) | Instr::Alu(_, reg) => write!(f, "{reg}"),
            Instr::Stax(pair)
            | Instr::Ldax(pair)
            | Instr::Inx(pair)
            | Instr::Dcx(pair)
            | Instr::Dad(pair)
            | Instr::Push(pair)
            | Instr::Pop(pair) => write!(f, "{pair}"),
            Instr::Rst(vector) => write!(f, "{vector}"),
            _ => f.write_str(&imm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_length() {
        // MVI B,1F; LXI H,2000; NOP; JMP 0000
        let bytes = [0x06, 0x1F, 0x21, 0x00, 0x20, 0x00, 0xC3, 0x00, 0x00];
        let records: Vec<_> = disassemble(&bytes, 0).collect();
        let addrs: Vec<_> = records.iter().map(|record| record.addr).collect();
        assert_eq!(addrs, vec![0, 2, 5, 6]);
        assert_eq!(records[0].operands, &[0x1F]);
        assert_eq!(records[1].word(), Some(0x2000));
        assert_eq!(records[2].opcode.mnemonic, "NOP");
        assert!(records.iter().all(|record| !record.is_truncated()));
    }

    #[test]
    fn restartable() {
        let bytes = [0x3E, 0x01, 0x76];
        let listing = disassemble(&bytes, 0x100);
        let first: Vec<_> = listing.clone().collect();
        let second: Vec<_> = listing.collect();
        assert_eq!(first, second);
        assert_eq!(first[0].addr, 0x100);
        assert_eq!(first[1].addr, 0x102);
    }

    #[test]
    fn truncated_tail() {
        let bytes = [0x00, 0xC3, 0x34];
        let records: Vec<_> = disassemble(&bytes, 0).collect();
        assert_eq!(records.len(), 2);
        assert!(records[1].is_truncated());
        assert_eq!(records[1].operands, &[0x34]);
        assert_eq!(records[1].word(), None);
        assert_eq!(records[1].to_string(), "0001  c3 34     JMP   ??");
    }

    #[test]
    fn empty() {
        assert_eq!(disassemble(&[], 0).count(), 0);
    }

    #[test]
    fn agrees_with_table() {
        let bytes: Vec<u8> = (0..=u8::MAX).collect();
        let mut offset = 0;
        for record in disassemble(&bytes, 0) {
            assert_eq!(record.addr as usize, offset);
            offset += record.opcode.len as usize;
        }
    }

    #[test]
    fn formatting() {
        let bytes = [
            0x3E, 0x07, 0x41, 0x21, 0x00, 0x24, 0xC5, 0xF1, 0x86, 0xFF, 0xDB, 0x01, 0xCD, 0x34,
            0x12,
        ];
        let lines: Vec<_> = disassemble(&bytes, 0)
            .map(|record| record.to_string().trim_end().to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "0000  3e 07     MVI   A,$07",
                "0002  41        MOV   B,C",
                "0003  21 00 24  LXI   H,$2400",
                "0006  c5        PUSH  B",
                "0007  f1        POP   PSW",
                "0008  86        ADD   M",
                "0009  ff        RST   7",
                "000a  db 01     IN    $01",
                "000c  cd 34 12  CALL  $1234",
            ]
        );
    }
}
