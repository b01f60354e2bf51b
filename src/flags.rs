/// Operand width used to decide where the carry-out lies.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Width {
    /// 8-bit accumulator arithmetic.
    Byte,
    /// 16-bit `DAD`.
    Word,
}

impl Width {
    #[inline]
    const fn max(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
        }
    }
}

// Bit positions inside the PSW flag byte
const PSW_CY: u8 = 0x01;
const PSW_ONE: u8 = 0x02;
const PSW_P: u8 = 0x04;
const PSW_AC: u8 = 0x10;
const PSW_Z: u8 = 0x40;
const PSW_S: u8 = 0x80;

/// Condition codes, derived from the result of the last flag-affecting instruction.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct ConditionCodes {
    /// Zero
    pub z: bool,
    /// Sign (bit 7)
    pub s: bool,
    /// Even parity
    pub p: bool,
    /// Carry / borrow
    pub cy: bool,
    /// Auxiliary carry out of bit 3
    pub ac: bool,
}

impl ConditionCodes {
    #[inline]
    pub fn set_zero(&mut self, result: u16) {
        self.z = result & 0xFF == 0;
    }

    #[inline]
    pub fn set_sign(&mut self, result: u16) {
        self.s = result & 0x80 != 0;
    }

    /// Only the low 8 bits count, regardless of width.
    #[inline]
    pub fn set_parity(&mut self, result: u16) {
        self.p = (result & 0xFF).count_ones() % 2 == 0;
    }

    /// `result` must be the unmasked sum of the operands.
    #[inline]
    pub fn set_carry(&mut self, result: u32, width: Width) {
        self.cy = result > width.max();
    }

    /// Carry out of bit 3 when adding the low nibbles of `a` and `b` plus `carry_in`.
    #[inline]
    pub fn set_aux_carry(&mut self, a: u8, b: u8, carry_in: bool) {
        self.ac = (a & 0x0F) + (b & 0x0F) + carry_in as u8 > 0x0F;
    }

    /// Zero, sign and parity together, as set by every accumulator result.
    #[inline]
    pub fn set_zsp(&mut self, result: u8) {
        let result = result as u16;
        self.set_zero(result);
        self.set_sign(result);
        self.set_parity(result);
    }

    /// Flag byte pushed by `PUSH PSW`: `S Z 0 AC 0 P 1 CY`.
    pub fn to_psw(self) -> u8 {
        let mut psw = PSW_ONE;
        for (set, bit) in [
            (self.s, PSW_S),
            (self.z, PSW_Z),
            (self.ac, PSW_AC),
            (self.p, PSW_P),
            (self.cy, PSW_CY),
        ] {
            if set {
                psw |= bit;
            }
        }
        psw
    }

    /// Inverse of [`ConditionCodes::to_psw`]. Fixed bits are ignored.
    pub fn from_psw(psw: u8) -> Self {
        ConditionCodes {
            z: psw & PSW_Z != 0,
            s: psw & PSW_S != 0,
            p: psw & PSW_P != 0,
            cy: psw & PSW_CY != 0,
            ac: psw & PSW_AC != 0,
        }
    }
}
