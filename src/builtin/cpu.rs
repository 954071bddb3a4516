//! Toy 8-bit CPU.
//!
//! The CPU fetches nothing itself: OPCODE and DATA1..DATA3 are wired from
//! program ROMs addressed by its PC output. One instruction executes per
//! rising CLOCK edge while RUN is high, or per rising STEP edge, and never
//! while halted. RESET is level-sensitive and clears the whole machine.
//!
//! Screen output is exposed as an address, a colour and three strobes
//! (write, clear, refresh) meant to be wired to an RGB display clocked by
//! the same clock. Strobes stay up until the next instruction executes.
//!
//! Everything the CPU remembers lives in its state buffer; the offsets are
//! public so a front end or a test can inspect registers and memory.

use rand::RngCore;

use super::{input_high, input_value, put, region, rising_edge, set_output, word};
use crate::common::PinState;

/// General-purpose registers A, B, C, D, X, Y.
pub const REGISTER_COUNT: usize = 6;
/// Number of hardware stacks: return addresses, parameters, general use.
pub const STACK_COUNT: usize = 3;
pub const STACK_DEPTH: usize = 256;
pub const RAM_SIZE: usize = 256;

pub const REGISTERS: usize = 0;
pub const PC: usize = REGISTERS + REGISTER_COUNT;
pub const STACK_POINTERS: usize = PC + 1;
pub const FLAG_ZERO: usize = STACK_POINTERS + STACK_COUNT;
pub const FLAG_CARRY: usize = FLAG_ZERO + 1;
pub const FLAG_HALTED: usize = FLAG_CARRY + 1;
const PREV_CLOCK: usize = FLAG_HALTED + 1;
const PREV_STEP: usize = PREV_CLOCK + 1;
pub const SCREEN_ADDRESS: usize = PREV_STEP + 1;
pub const SCREEN_RED: usize = SCREEN_ADDRESS + 1;
pub const SCREEN_GREEN: usize = SCREEN_RED + 1;
pub const SCREEN_BLUE: usize = SCREEN_GREEN + 1;
pub const SCREEN_WRITE: usize = SCREEN_BLUE + 1;
pub const SCREEN_CLEAR: usize = SCREEN_WRITE + 1;
pub const SCREEN_REFRESH: usize = SCREEN_CLEAR + 1;
pub const RAM: usize = SCREEN_REFRESH + 1;
pub const STACKS: usize = RAM + RAM_SIZE;
pub const STATE_LEN: usize = STACKS + STACK_COUNT * STACK_DEPTH;

/// Register-field value selecting an immediate operand in stack pushes.
pub const LITERAL_OPERAND: u8 = 0xF;
/// Key-field value meaning "any of the four keys".
pub const ANY_KEY: u8 = 0xF;

/// Instruction opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Alu = 1,
    Store = 2,
    Load = 3,
    Set = 4,
    Jump = 5,
    Draw = 6,
    ClearScreen = 7,
    RefreshScreen = 8,
    Random = 9,
    Stack = 10,
    Halt = 255,
}

impl Opcode {
    /// Decodes an opcode byte. Unknown values yield `None` and execute as
    /// no-ops.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Opcode::Nop,
            1 => Opcode::Alu,
            2 => Opcode::Store,
            3 => Opcode::Load,
            4 => Opcode::Set,
            5 => Opcode::Jump,
            6 => Opcode::Draw,
            7 => Opcode::ClearScreen,
            8 => Opcode::RefreshScreen,
            9 => Opcode::Random,
            10 => Opcode::Stack,
            255 => Opcode::Halt,
            _ => return None,
        })
    }
}

/// ALU operations, encoded in the low nibble of DATA3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AluOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Nand = 4,
    And = 5,
    Not = 6,
    Or = 7,
    Nor = 8,
    Xor = 9,
    Xnor = 10,
    Compare = 11,
    CompareSigned = 12,
}

impl AluOp {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => AluOp::Add,
            1 => AluOp::Sub,
            2 => AluOp::Mul,
            3 => AluOp::Div,
            4 => AluOp::Nand,
            5 => AluOp::And,
            6 => AluOp::Not,
            7 => AluOp::Or,
            8 => AluOp::Nor,
            9 => AluOp::Xor,
            10 => AluOp::Xnor,
            11 => AluOp::Compare,
            12 => AluOp::CompareSigned,
            _ => return None,
        })
    }
}

/// Where an ALU operand comes from, encoded in two bits of DATA2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OperandKind {
    Register = 0,
    Literal = 1,
    Ram = 2,
}

/// Jump conditions, encoded in the low nibble of DATA2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum JumpCondition {
    Always = 0,
    Zero = 1,
    Carry = 2,
    Key = 3,
}

/// Stack operations, encoded in bits 2..3 of DATA3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StackOp {
    Push = 0,
    Pop = 1,
}

/// Result of one ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub zero: bool,
    pub carry: bool,
}

/// 8-bit arithmetic logic unit.
pub struct Alu;

impl Alu {
    /// Executes an ALU operation.
    ///
    /// # Arguments
    ///
    /// * `op` - The operation to perform
    /// * `a` - First operand
    /// * `b` - Second operand (ignored by `Not`)
    ///
    /// # Returns
    ///
    /// The 8-bit result with its flags. Zero is set when the result is zero,
    /// or for comparisons when the operands are equal. Carry is set on
    /// unsigned overflow, on borrow, and for comparisons when `a < b`.
    /// Division by zero yields zero.
    pub fn execute(op: AluOp, a: u8, b: u8) -> AluResult {
        let (value, carry) = match op {
            AluOp::Add => a.overflowing_add(b),
            AluOp::Sub => a.overflowing_sub(b),
            AluOp::Mul => {
                let wide = a as u16 * b as u16;
                (wide as u8, wide > 0xFF)
            }
            AluOp::Div => (a.checked_div(b).unwrap_or(0), false),
            AluOp::Nand => (!(a & b), false),
            AluOp::And => (a & b, false),
            AluOp::Not => (!a, false),
            AluOp::Or => (a | b, false),
            AluOp::Nor => (!(a | b), false),
            AluOp::Xor => (a ^ b, false),
            AluOp::Xnor => (!(a ^ b), false),
            AluOp::Compare => (a.wrapping_sub(b), a < b),
            AluOp::CompareSigned => (a.wrapping_sub(b), (a as i8) < (b as i8)),
        };
        let zero = match op {
            AluOp::Compare | AluOp::CompareSigned => a == b,
            _ => value == 0,
        };
        AluResult { value, zero, carry }
    }
}

/// One fetched instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub data1: u8,
    pub data2: u8,
    pub data3: u8,
}

impl Instruction {
    fn fetch(inputs: &[PinState]) -> Self {
        Self {
            opcode: input_value(inputs, 0) as u8,
            data1: input_value(inputs, 1) as u8,
            data2: input_value(inputs, 2) as u8,
            data3: input_value(inputs, 3) as u8,
        }
    }
}

/// Mutable view of a CPU state buffer.
struct Machine<'a> {
    state: &'a mut [u32],
}

impl Machine<'_> {
    fn reg(&self, index: u8) -> u8 {
        if (index as usize) < REGISTER_COUNT {
            word(self.state, REGISTERS + index as usize) as u8
        } else {
            0
        }
    }

    fn set_reg(&mut self, index: u8, value: u8) {
        if (index as usize) < REGISTER_COUNT {
            put(self.state, REGISTERS + index as usize, value as u32);
        }
    }

    fn ram(&self, address: u8) -> u8 {
        word(self.state, RAM + address as usize) as u8
    }

    fn set_ram(&mut self, address: u8, value: u8) {
        put(self.state, RAM + address as usize, value as u32);
    }

    fn flag(&self, index: usize) -> bool {
        word(self.state, index) != 0
    }

    fn set_flag(&mut self, index: usize, value: bool) {
        put(self.state, index, value as u32);
    }

    fn pc(&self) -> u8 {
        word(self.state, PC) as u8
    }

    fn set_pc(&mut self, value: u8) {
        put(self.state, PC, value as u32);
    }

    fn operand(&self, kind: u8, nibble: u8) -> u8 {
        match kind {
            k if k == OperandKind::Register as u8 => self.reg(nibble),
            k if k == OperandKind::Literal as u8 => nibble,
            k if k == OperandKind::Ram as u8 => self.ram(nibble),
            _ => 0,
        }
    }

    fn push(&mut self, stack: usize, value: u8) {
        let sp = word(self.state, STACK_POINTERS + stack) as u8;
        put(self.state, STACKS + stack * STACK_DEPTH + sp as usize, value as u32);
        put(self.state, STACK_POINTERS + stack, sp.wrapping_add(1) as u32);
    }

    fn pop(&mut self, stack: usize) -> u8 {
        let sp = (word(self.state, STACK_POINTERS + stack) as u8).wrapping_sub(1);
        put(self.state, STACK_POINTERS + stack, sp as u32);
        word(self.state, STACKS + stack * STACK_DEPTH + sp as usize) as u8
    }

    /// Executes one instruction and advances the program counter.
    fn execute(&mut self, instr: Instruction, keys: u8, rng: &mut dyn RngCore) {
        self.set_flag(SCREEN_WRITE, false);
        self.set_flag(SCREEN_CLEAR, false);
        self.set_flag(SCREEN_REFRESH, false);

        let Instruction { opcode, data1, data2, data3 } = instr;
        let mut jumped = false;
        match Opcode::from_u8(opcode) {
            None | Some(Opcode::Nop) => {}
            Some(Opcode::Alu) => {
                if let Some(op) = AluOp::from_u8(data3 & 0xF) {
                    let a = self.operand((data2 >> 4) & 0x3, data1 & 0xF);
                    let b = self.operand((data2 >> 6) & 0x3, data1 >> 4);
                    let result = Alu::execute(op, a, b);
                    self.set_reg(data2 & 0xF, result.value);
                    self.set_flag(FLAG_ZERO, result.zero);
                    self.set_flag(FLAG_CARRY, result.carry);
                }
            }
            Some(Opcode::Store) => {
                let value = self.reg(data2 & 0xF);
                self.set_ram(data1, value);
            }
            Some(Opcode::Load) => {
                let value = self.ram(data1);
                self.set_reg(data2 & 0xF, value);
            }
            Some(Opcode::Set) => self.set_reg(data2 & 0xF, data1),
            Some(Opcode::Jump) => {
                let key = data3 & 0xF;
                let taken = match data2 & 0xF {
                    c if c == JumpCondition::Always as u8 => true,
                    c if c == JumpCondition::Zero as u8 => self.flag(FLAG_ZERO),
                    c if c == JumpCondition::Carry as u8 => self.flag(FLAG_CARRY),
                    c if c == JumpCondition::Key as u8 => match key {
                        ANY_KEY => keys & 0xF != 0,
                        k if k < 4 => keys >> k & 1 != 0,
                        _ => false,
                    },
                    _ => false,
                };
                if taken {
                    let target = if data3 >> 4 != 0 { self.reg(data2 >> 4) } else { data1 };
                    self.set_pc(target);
                    jumped = true;
                }
            }
            Some(Opcode::Draw) => {
                put(self.state, SCREEN_ADDRESS, data1 as u32);
                put(self.state, SCREEN_RED, (data2 >> 4) as u32);
                put(self.state, SCREEN_GREEN, (data2 & 0xF) as u32);
                put(self.state, SCREEN_BLUE, (data3 & 0xF) as u32);
                self.set_flag(SCREEN_WRITE, true);
            }
            Some(Opcode::ClearScreen) => self.set_flag(SCREEN_CLEAR, true),
            Some(Opcode::RefreshScreen) => self.set_flag(SCREEN_REFRESH, true),
            Some(Opcode::Random) => self.set_reg(data2 & 0xF, rng.next_u32() as u8),
            Some(Opcode::Stack) => {
                let stack = (data3 & 0x3) as usize;
                let reg = data2 & 0xF;
                if stack < STACK_COUNT {
                    match (data3 >> 2) & 0x3 {
                        op if op == StackOp::Push as u8 => {
                            let value = if reg == LITERAL_OPERAND { data1 } else { self.reg(reg) };
                            self.push(stack, value);
                        }
                        op if op == StackOp::Pop as u8 => {
                            let value = self.pop(stack);
                            self.set_reg(reg, value);
                        }
                        _ => {}
                    }
                }
            }
            Some(Opcode::Halt) => self.set_flag(FLAG_HALTED, true),
        }
        if !jumped {
            self.set_pc(self.pc().wrapping_add(1));
        }
    }
}

/// Evaluates the CPU for one frame.
pub fn process(
    inputs: &[PinState],
    state: &mut [u32],
    outputs: &mut [PinState],
    rng: &mut dyn RngCore,
) {
    let keys = (input_value(inputs, 4) & 0xF) as u8;
    let run = input_high(inputs, 5);
    let step = input_high(inputs, 6);
    let reset = input_high(inputs, 7);
    let clock = input_high(inputs, 8);

    let clock_rise = rising_edge(state, PREV_CLOCK, clock);
    let step_rise = rising_edge(state, PREV_STEP, step);

    if reset {
        region(state, REGISTERS, PREV_CLOCK).fill(0);
        region(state, SCREEN_ADDRESS, STATE_LEN - SCREEN_ADDRESS).fill(0);
    } else if word(state, FLAG_HALTED) == 0 && ((clock_rise && run) || step_rise) {
        let instr = Instruction::fetch(inputs);
        Machine { state: &mut *state }.execute(instr, keys, rng);
    }

    let out = |index: usize| PinState::from_value(word(state, index) as u64);
    set_output(outputs, 0, out(PC));
    set_output(outputs, 1, out(SCREEN_ADDRESS));
    set_output(outputs, 2, out(SCREEN_RED));
    set_output(outputs, 3, out(SCREEN_GREEN));
    set_output(outputs, 4, out(SCREEN_BLUE));
    set_output(outputs, 5, out(SCREEN_WRITE));
    set_output(outputs, 6, out(SCREEN_CLEAR));
    set_output(outputs, 7, out(SCREEN_REFRESH));
    set_output(outputs, 8, out(FLAG_HALTED));
}

// ----------------------------------------------------------------------
// Inspection
// ----------------------------------------------------------------------

/// Value of register `index` (0 = A .. 5 = Y).
pub fn register(state: &[u32], index: usize) -> u8 {
    if index < REGISTER_COUNT {
        word(state, REGISTERS + index) as u8
    } else {
        0
    }
}

pub fn program_counter(state: &[u32]) -> u8 {
    word(state, PC) as u8
}

pub fn ram_byte(state: &[u32], address: u8) -> u8 {
    word(state, RAM + address as usize) as u8
}

pub fn is_halted(state: &[u32]) -> bool {
    word(state, FLAG_HALTED) != 0
}
