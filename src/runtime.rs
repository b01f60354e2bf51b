use tracing::{debug, trace, warn};

use crate::error::{Fault, LoadError};
use crate::features::Features;
use crate::flags::Width;
use crate::opcode::{self, AluOp, Cond, Instr, Opcode, Pair, Reg};
use crate::port::{NullPorts, Ports};
use crate::state::{addr, State};

/// Execution status of a [`Cpu`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Running,
    /// `HLT` executed. Only an interrupt resumes execution.
    Halted,
    /// Terminal; the engine never steps again.
    Faulted(Fault),
}

/// Why [`Cpu::run`] returned without a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Halted,
    /// `PC` left the loaded image.
    EndOfProgram,
    StepLimit,
}

/// How `PC` moves after an instruction.
enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// Control transfer; `PC` was decided by the instruction.
    Jump(u16),
}

/// Fetch-decode-execute engine around a [`State`].
pub struct Cpu<P: Ports> {
    state: State,
    ports: P,
    features: Features,
    status: Status,
    /// Address of the first byte of the loaded image.
    program_start: usize,
    /// One past the last byte of the loaded image.
    program_end: usize,
    /// Set when execution fell through past 0xFFFF.
    wrapped: bool,
    steps: u64,
}

impl<P: Ports> Cpu<P> {
    /// Empty memory; every step until [`Cpu::load`] is at end of program.
    pub fn new(ports: P) -> Self {
        Cpu {
            state: State::new(),
            ports,
            features: Features::all(),
            status: Status::Running,
            program_start: 0,
            program_end: 0,
            wrapped: false,
            steps: 0,
        }
    }

    /// Load `image` at `base` and start executing there.
    pub fn from_image(image: &[u8], base: u16, ports: P) -> Result<Self, LoadError> {
        let mut cpu = Self::new(ports);
        cpu.load(image, base)?;
        Ok(cpu)
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Place `image` at `base` and point `PC` at it.
    pub fn load(&mut self, image: &[u8], base: u16) -> Result<(), LoadError> {
        self.state.load(image, base)?;
        self.state.pc = base;
        self.program_start = base as usize;
        self.program_end = base as usize + image.len();
        self.wrapped = false;
        Ok(())
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn into_parts(self) -> (State, P) {
        (self.state, self.ports)
    }

    /// Whether `PC` is outside of the loaded image, or ran off the top of memory.
    pub fn at_end(&self) -> bool {
        let pc = self.state.pc as usize;
        self.wrapped || !(self.program_start..self.program_end).contains(&pc)
    }

    /// Run until `HLT`, a fault, or `PC` leaving the loaded image.
    pub fn run(&mut self) -> Result<Exit, Fault> {
        self.run_limit(u64::MAX)
    }

    /// As [`Cpu::run`], but return after at most `limit` instructions.
    pub fn run_limit(&mut self, limit: u64) -> Result<Exit, Fault> {
        let mut count = 0;
        loop {
            match &self.status {
                Status::Halted => return Ok(Exit::Halted),
                Status::Faulted(fault) => return Err(fault.clone()),
                Status::Running => (),
            }
            if self.at_end() {
                debug!(pc = self.state.pc, "reached end of program");
                return Ok(Exit::EndOfProgram);
            }
            if count == limit {
                return Ok(Exit::StepLimit);
            }
            self.step();
            count += 1;
        }
    }

    /// Execute a single instruction. No-op once halted or faulted.
    pub fn step(&mut self) -> &Status {
        if self.status != Status::Running {
            return &self.status;
        }

        let pc = self.state.pc;
        let opcode = opcode::lookup(self.state.read(pc));
        if !self.features.enables(opcode.group) {
            let fault = Fault {
                addr: pc,
                byte: opcode.code,
                mnemonic: opcode.mnemonic,
            };
            warn!(%fault, "execution faulted");
            self.status = Status::Faulted(fault);
            return &self.status;
        }

        // Operands are always fetched as two bytes; unused ones are ignored
        let operands = [
            self.state.read(pc.wrapping_add(1)),
            self.state.read(pc.wrapping_add(2)),
        ];
        trace!(
            pc,
            opcode = opcode.code,
            mnemonic = opcode.mnemonic,
            a = self.state.a,
            bc = self.state.pair(Pair::Bc),
            de = self.state.pair(Pair::De),
            hl = self.state.pair(Pair::Hl),
            sp = self.state.sp,
        );

        let next = pc.wrapping_add(opcode.len as u16);
        self.state.pc = match self.execute(opcode, operands, next) {
            Flow::Next => {
                if pc as usize + opcode.len as usize > u16::MAX as usize {
                    debug!(pc, "fell through the top of memory");
                    self.wrapped = true;
                }
                next
            }
            Flow::Jump(target) => target,
        };
        self.steps += 1;
        &self.status
    }

    /// Service an interrupt request with `RST vector`.
    ///
    /// Ignored unless interrupts are enabled. Returns whether the request was accepted.
    pub fn interrupt(&mut self, vector: u8) -> bool {
        if !self.state.int_enable || matches!(self.status, Status::Faulted(_)) {
            return false;
        }
        let vector = vector & 0b111;
        debug!(vector, pc = self.state.pc, "servicing interrupt");
        self.state.int_enable = false;
        self.state.push(self.state.pc);
        self.state.pc = vector as u16 * 8;
        self.status = Status::Running;
        true
    }

    fn execute(&mut self, opcode: &Opcode, operands: [u8; 2], next: u16) -> Flow {
        let [lo, hi] = operands;
        let word = addr(hi, lo);
        let state = &mut self.state;

        match opcode.instr {
            Instr::Nop => (),
            Instr::Hlt => {
                debug!(pc = state.pc, "halted");
                self.status = Status::Halted;
            }

            Instr::Mov(dest, src) => {
                let value = state.reg(src);
                state.set_reg(dest, value);
            }
            Instr::Mvi(reg) => state.set_reg(reg, lo),
            Instr::Lxi(pair) => state.set_pair(pair, word),
            Instr::Stax(pair) => state.write(state.pair(pair), state.a),
            Instr::Ldax(pair) => state.a = state.read(state.pair(pair)),
            Instr::Sta => state.write(word, state.a),
            Instr::Lda => state.a = state.read(word),
            Instr::Shld => state.write_word(word, state.pair(Pair::Hl)),
            Instr::Lhld => {
                let value = state.read_word(word);
                state.set_pair(Pair::Hl, value);
            }
            Instr::Xchg => {
                let de = state.pair(Pair::De);
                let hl = state.pair(Pair::Hl);
                state.set_pair(Pair::De, hl);
                state.set_pair(Pair::Hl, de);
            }

            Instr::Inr(reg) => {
                let value = state.reg(reg);
                let result = value.wrapping_add(1);
                state.cc.set_zsp(result);
                state.cc.set_aux_carry(value, 1, false);
                state.set_reg(reg, result);
            }
            Instr::Dcr(reg) => {
                let value = state.reg(reg);
                let result = value.wrapping_sub(1);
                state.cc.set_zsp(result);
                // Decrement is addition of 0xFF
                state.cc.set_aux_carry(value, 0x0F, false);
                state.set_reg(reg, result);
            }
            Instr::Inx(pair) => {
                let value = state.pair(pair).wrapping_add(1);
                state.set_pair(pair, value);
            }
            Instr::Dcx(pair) => {
                let value = state.pair(pair).wrapping_sub(1);
                state.set_pair(pair, value);
            }
            Instr::Dad(pair) => {
                let sum = state.pair(Pair::Hl) as u32 + state.pair(pair) as u32;
                state.cc.set_carry(sum, Width::Word);
                state.set_pair(Pair::Hl, sum as u16);
            }
            Instr::Alu(op, reg) => {
                let value = state.reg(reg);
                self.alu(op, value);
            }
            Instr::AluImm(op) => self.alu(op, lo),
            Instr::Daa => self.daa(),
            Instr::Rlc => {
                let carry = state.a >> 7;
                state.a = state.a << 1 | carry;
                state.cc.cy = carry == 1;
            }
            Instr::Rrc => {
                let carry = state.a & 1;
                state.a = state.a >> 1 | carry << 7;
                state.cc.cy = carry == 1;
            }
            Instr::Ral => {
                let carry = state.a >> 7;
                state.a = state.a << 1 | state.cc.cy as u8;
                state.cc.cy = carry == 1;
            }
            Instr::Rar => {
                let carry = state.a & 1;
                state.a = state.a >> 1 | (state.cc.cy as u8) << 7;
                state.cc.cy = carry == 1;
            }
            Instr::Cma => state.a = !state.a,
            Instr::Stc => state.cc.cy = true,
            Instr::Cmc => state.cc.cy = !state.cc.cy,

            Instr::Jmp => return Flow::Jump(word),
            Instr::Jcc(cond) => {
                if self.condition(cond) {
                    return Flow::Jump(word);
                }
            }
            Instr::Call => return self.call(word, next),
            Instr::Ccc(cond) => {
                if self.condition(cond) {
                    return self.call(word, next);
                }
            }
            Instr::Ret => return Flow::Jump(state.pop()),
            Instr::Rcc(cond) => {
                if self.condition(cond) {
                    return Flow::Jump(self.state.pop());
                }
            }
            Instr::Rst(vector) => return self.call(vector as u16 * 8, next),
            Instr::Pchl => return Flow::Jump(state.pair(Pair::Hl)),

            Instr::Push(pair) => {
                let value = state.pair(pair);
                state.push(value);
            }
            Instr::Pop(pair) => {
                let value = state.pop();
                state.set_pair(pair, value);
            }
            Instr::Xthl => {
                let top = state.read_word(state.sp);
                state.write_word(state.sp, state.pair(Pair::Hl));
                state.set_pair(Pair::Hl, top);
            }
            Instr::Sphl => state.sp = state.pair(Pair::Hl),

            Instr::In => state.a = self.ports.read_port(lo),
            Instr::Out => self.ports.write_port(lo, state.a),
            Instr::Ei => state.int_enable = true,
            Instr::Di => state.int_enable = false,
        }
        Flow::Next
    }

    fn call(&mut self, target: u16, ret: u16) -> Flow {
        self.state.push(ret);
        Flow::Jump(target)
    }

    fn condition(&self, cond: Cond) -> bool {
        let cc = &self.state.cc;
        match cond {
            Cond::Nz => !cc.z,
            Cond::Z => cc.z,
            Cond::Nc => !cc.cy,
            Cond::C => cc.cy,
            Cond::Po => !cc.p,
            Cond::Pe => cc.p,
            Cond::P => !cc.s,
            Cond::M => cc.s,
        }
    }

    fn alu(&mut self, op: AluOp, value: u8) {
        let carry = self.state.cc.cy;
        match op {
            AluOp::Add => self.state.a = self.add(value, false),
            AluOp::Adc => self.state.a = self.add(value, carry),
            AluOp::Sub => self.state.a = self.sub(value, false),
            AluOp::Sbb => self.state.a = self.sub(value, carry),
            AluOp::Cmp => {
                self.sub(value, false);
            }
            AluOp::Ana => {
                let cc = &mut self.state.cc;
                cc.ac = (self.state.a | value) & 0x08 != 0;
                cc.cy = false;
                self.state.a &= value;
                self.state.cc.set_zsp(self.state.a);
            }
            AluOp::Xra => {
                self.state.a ^= value;
                self.logic_flags();
            }
            AluOp::Ora => {
                self.state.a |= value;
                self.logic_flags();
            }
        }
    }

    /// `A + value + carry`, setting every flag. `A` is not written.
    fn add(&mut self, value: u8, carry: bool) -> u8 {
        let a = self.state.a;
        let sum = a as u16 + value as u16 + carry as u16;
        let cc = &mut self.state.cc;
        cc.set_zsp(sum as u8);
        cc.set_carry(sum as u32, Width::Byte);
        cc.set_aux_carry(a, value, carry);
        sum as u8
    }

    /// `A - value - borrow`, computed as `A + !value + !borrow`. `CY` holds the borrow.
    fn sub(&mut self, value: u8, borrow: bool) -> u8 {
        let result = self.add(!value, !borrow);
        self.state.cc.cy = !self.state.cc.cy;
        result
    }

    fn logic_flags(&mut self) {
        let cc = &mut self.state.cc;
        cc.set_zsp(self.state.a);
        cc.cy = false;
        cc.ac = false;
    }

    fn daa(&mut self) {
        let a = self.state.a;
        let mut correction = 0;
        let mut carry = self.state.cc.cy;
        if self.state.cc.ac || a & 0x0F > 9 {
            correction |= 0x06;
        }
        let hi = a >> 4;
        if carry || hi > 9 || (hi >= 9 && a & 0x0F > 9) {
            correction |= 0x60;
            carry = true;
        }
        self.state.a = self.add(correction, false);
        self.state.cc.cy = carry;
    }
}

/// Convenience for tests and hosts: bytes placed at address 0 with no devices.
impl Cpu<NullPorts> {
    pub fn from_bytes(image: &[u8]) -> Result<Self, LoadError> {
        Self::from_image(image, 0, NullPorts)
    }
}
