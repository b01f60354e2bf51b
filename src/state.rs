use crate::error::LoadError;
use crate::flags::ConditionCodes;
use crate::opcode::{Pair, Reg};

/// The 8080 addresses 64KB of memory.
pub const MEMORY_SIZE: usize = 0x10000;

/// Combine two bytes into a 16-bit address, `hi` first.
#[inline]
pub const fn addr(hi: u8, lo: u8) -> u16 {
    (hi as u16) << 8 | lo as u16
}

/// Complete processor state: registers, condition codes and memory.
///
/// Register pairs are not stored; they are always derived from their halves through
/// [`State::pair`] and [`State::set_pair`].
pub struct State {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// Stack pointer, stack grows downwards.
    pub sp: u16,
    /// Program counter
    pub pc: u16,
    pub cc: ConditionCodes,
    pub int_enable: bool,
    mem: Box<[u8; MEMORY_SIZE]>,
}

impl State {
    pub fn new() -> Self {
        State {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
            cc: ConditionCodes::default(),
            int_enable: false,
            mem: Box::new([0; MEMORY_SIZE]),
        }
    }

    /// Copy `image` into memory starting at `base`. Nothing is written on error.
    pub fn load(&mut self, image: &[u8], base: u16) -> Result<(), LoadError> {
        let start = base as usize;
        if image.len() > MEMORY_SIZE - start {
            return Err(LoadError::TooLarge {
                base,
                len: image.len(),
            });
        }
        self.mem[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn memory(&self) -> &[u8] {
        &self.mem[..]
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }

    /// Little-endian word; wraps at the top of memory.
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        self::addr(hi, lo)
    }

    pub fn write_word(&mut self, addr: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Value of `reg`; [`Reg::M`] reads memory at `HL`.
    pub fn reg(&self, reg: Reg) -> u8 {
        match reg {
            Reg::B => self.b,
            Reg::C => self.c,
            Reg::D => self.d,
            Reg::E => self.e,
            Reg::H => self.h,
            Reg::L => self.l,
            Reg::M => self.read(self.pair(Pair::Hl)),
            Reg::A => self.a,
        }
    }

    pub fn set_reg(&mut self, reg: Reg, value: u8) {
        match reg {
            Reg::B => self.b = value,
            Reg::C => self.c = value,
            Reg::D => self.d = value,
            Reg::E => self.e = value,
            Reg::H => self.h = value,
            Reg::L => self.l = value,
            Reg::M => self.write(self.pair(Pair::Hl), value),
            Reg::A => self.a = value,
        }
    }

    pub fn pair(&self, pair: Pair) -> u16 {
        match pair {
            Pair::Bc => addr(self.b, self.c),
            Pair::De => addr(self.d, self.e),
            Pair::Hl => addr(self.h, self.l),
            Pair::Sp => self.sp,
            Pair::Psw => addr(self.a, self.cc.to_psw()),
        }
    }

    pub fn set_pair(&mut self, pair: Pair, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        match pair {
            Pair::Bc => (self.b, self.c) = (hi, lo),
            Pair::De => (self.d, self.e) = (hi, lo),
            Pair::Hl => (self.h, self.l) = (hi, lo),
            Pair::Sp => self.sp = value,
            Pair::Psw => (self.a, self.cc) = (hi, ConditionCodes::from_psw(lo)),
        }
    }

    /// High byte goes to `SP-1`, low byte to `SP-2`.
    pub fn push(&mut self, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        self.write_word(self.sp, value);
    }

    pub fn pop(&mut self) -> u16 {
        let value = self.read_word(self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
