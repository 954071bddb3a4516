//! Toy CPU Assembler.
//!
//! Translates the CPU's assembly language into instructions and the two
//! 256-word ROM images the CPU reads them from (ROM1 holds `DATA1 << 8 |
//! OPCODE`, ROM2 holds `DATA3 << 8 | DATA2`).
//!
//! Programs start with two NOPs. The main program runs until the first
//! function label (`[name]:`); a HALT is appended to it if it does not end
//! in one, and the functions follow. `JUMP [name]` calls a function through
//! the RETURN stack and `RETURN` comes back, both using register D:
//!
//! ```text
//! SET A TO 0
//! loop:
//!     A = A + 1
//!     JUMP [show]
//!     JUMP loop IF KEY W
//! [show]:
//!     DRAW 1 2 15 0 0
//!     REFRESHSCREEN
//!     RETURN
//! ```
//!
//! Three forms expand at assembly time:
//!
//! - `IF a <cmp> b THEN ... [ELSE ...] END` compares into register X and
//!   branches on the flags. `<cmp>` is one of `== != < > <= >=`.
//! - `name: FAKE` (or `[name]: FAKE`) starts a body that runs until the next
//!   label. Every `JUMP name` or `JUMP [name]` pastes the body in place; a
//!   jump to `name` from inside the body goes back to the start of that copy.
//! - `JUMP L<n>` targets the first instruction at or after source line n.

use std::collections::HashMap;

use crate::builtin::cpu::{AluOp, Instruction, JumpCondition, OperandKind, Opcode, StackOp, ANY_KEY, LITERAL_OPERAND};
use crate::common::{Result, SimError};

/// Words in each ROM image.
pub const ROM_WORDS: usize = 256;

/// Register used by calls and returns to carry the return address.
const LINK_REGISTER: u8 = 3;

/// Register an `IF` comparison overwrites.
const COMPARE_REGISTER: u8 = 4;

const REGISTERS: [&str; 6] = ["A", "B", "C", "D", "X", "Y"];
const STACKS: [&str; 3] = ["RETURN", "PARAMETERS", "GENERAL"];
const DEFAULT_STACK: u8 = 2;

/// An assembled program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The two ROM images, padded with NOPs to `ROM_WORDS`.
    ///
    /// # Returns
    ///
    /// `(rom1, rom2)` where `rom1[i] = DATA1 << 8 | OPCODE` and
    /// `rom2[i] = DATA3 << 8 | DATA2`.
    pub fn rom_images(&self) -> (Vec<u32>, Vec<u32>) {
        let mut rom1 = vec![0u32; ROM_WORDS];
        let mut rom2 = vec![0u32; ROM_WORDS];
        for (i, instr) in self.instructions.iter().take(ROM_WORDS).enumerate() {
            rom1[i] = (instr.data1 as u32) << 8 | instr.opcode as u32;
            rom2[i] = (instr.data3 as u32) << 8 | instr.data2 as u32;
        }
        (rom1, rom2)
    }
}

/// One source statement before addresses are known.
#[derive(Clone, Debug)]
enum Statement {
    Fixed(Instruction),
    Jump {
        target: String,
        condition: JumpCondition,
        key: u8,
    },
    Call(String),
    Return,
}

impl Statement {
    fn size(&self) -> usize {
        match self {
            Statement::Fixed(_) | Statement::Jump { .. } => 1,
            Statement::Call(_) => 3,
            Statement::Return => 2,
        }
    }

    fn is_halt(&self) -> bool {
        matches!(self, Statement::Fixed(i) if i.opcode == Opcode::Halt as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LabelKind {
    Plain,
    Function,
    Fake,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Searched in order, so two-character operators win over their prefixes.
const COMPARISONS: [(&str, Comparison); 6] = [
    ("==", Comparison::Eq),
    ("!=", Comparison::Ne),
    ("<=", Comparison::Le),
    (">=", Comparison::Ge),
    ("<", Comparison::Lt),
    (">", Comparison::Gt),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    Then,
    Else,
}

impl Comparison {
    /// Jumps taken after `COMPARE`, which sets zero on `a == b` and carry
    /// on `a < b`. Falling through all of them lands in the THEN block.
    fn branches(self) -> &'static [(JumpCondition, Branch)] {
        use Branch::{Else, Then};
        use JumpCondition::{Always, Carry, Zero};
        match self {
            Comparison::Eq => &[(Zero, Then), (Always, Else)],
            Comparison::Ne => &[(Zero, Else)],
            Comparison::Lt => &[(Carry, Then), (Always, Else)],
            Comparison::Ge => &[(Carry, Else)],
            Comparison::Gt => &[(Zero, Else), (Carry, Else)],
            Comparison::Le => &[(Zero, Then), (Carry, Then), (Always, Else)],
        }
    }
}

#[derive(Clone, Debug)]
enum Item {
    Label {
        line: usize,
        name: String,
        kind: LabelKind,
    },
    Statement {
        line: usize,
        statement: Statement,
    },
    If {
        line: usize,
        compare: Instruction,
        comparison: Comparison,
    },
    Else {
        line: usize,
    },
    End {
        line: usize,
    },
}

fn error(line: usize, message: impl Into<String>) -> SimError {
    SimError::Assembly {
        line,
        message: message.into(),
    }
}

fn instr(opcode: Opcode, data1: u8, data2: u8, data3: u8) -> Instruction {
    Instruction {
        opcode: opcode as u8,
        data1,
        data2,
        data3,
    }
}

/// Assembles `source` into a program.
///
/// # Errors
///
/// `SimError::Assembly` with the 1-based source line for unknown
/// instructions, registers or labels, out-of-range literals, unbalanced
/// `IF`/`ELSE`/`END`, and programs longer than `ROM_WORDS`.
pub fn assemble(source: &str) -> Result<Program> {
    let items = parse(source)?;
    let (main, fakes) = split_fakes(items)?;

    let mut layout = Layout::new(fakes, source.lines().count());
    for item in main {
        layout.push_item(item, true)?;
    }
    layout.finish()?;
    if layout.address > ROM_WORDS {
        return Err(error(
            layout.last_line,
            format!("program needs {} words, ROM holds {}", layout.address, ROM_WORDS),
        ));
    }

    let mut instructions = Vec::new();
    for (line, statement) in &layout.entries {
        let line = *line;
        let address = instructions.len();
        match statement {
            Statement::Fixed(i) => instructions.push(*i),
            Statement::Jump { target, condition, key } => {
                let addr = layout.resolve_target(target, line)?;
                instructions.push(instr(Opcode::Jump, addr, *condition as u8, key & 0xF));
            }
            Statement::Call(name) => {
                let addr = *layout
                    .functions
                    .get(name)
                    .ok_or_else(|| error(line, format!("unknown function [{}]", name)))?;
                let ret = address + 3;
                instructions.push(instr(Opcode::Set, ret as u8, LINK_REGISTER, 0));
                instructions.push(instr(Opcode::Stack, 0, LINK_REGISTER, (StackOp::Push as u8) << 2));
                instructions.push(instr(Opcode::Jump, addr as u8, JumpCondition::Always as u8, 0));
            }
            Statement::Return => {
                instructions.push(instr(Opcode::Stack, 0, LINK_REGISTER, (StackOp::Pop as u8) << 2));
                instructions.push(instr(
                    Opcode::Jump,
                    0,
                    LINK_REGISTER << 4 | JumpCondition::Always as u8,
                    1 << 4,
                ));
            }
        }
    }
    Ok(Program { instructions })
}

/// Moves every fake function body out of the item stream.
///
/// A body is everything between `name: FAKE` and the next label.
fn split_fakes(items: Vec<Item>) -> Result<(Vec<Item>, HashMap<String, Vec<Item>>)> {
    let mut main = Vec::new();
    let mut fakes: HashMap<String, Vec<Item>> = HashMap::new();
    let mut current: Option<String> = None;

    for item in items {
        if let Item::Label { line, name, kind } = &item {
            current = None;
            if *kind == LabelKind::Fake {
                if fakes.insert(name.clone(), Vec::new()).is_some() {
                    return Err(error(*line, format!("label {} defined twice", name)));
                }
                current = Some(name.clone());
                continue;
            }
        }
        match current.as_ref().and_then(|name| fakes.get_mut(name)) {
            Some(body) => body.push(item),
            None => main.push(item),
        }
    }
    Ok((main, fakes))
}

/// An `IF` whose `END` has not been seen yet.
struct OpenIf {
    id: usize,
    line: usize,
    has_else: bool,
}

/// First pass: places every statement at its address and records labels.
struct Layout {
    entries: Vec<(usize, Statement)>,
    address: usize,
    labels: HashMap<String, usize>,
    functions: HashMap<String, usize>,
    fakes: HashMap<String, Vec<Item>>,
    /// Fake functions being pasted, with the label of each copy's start.
    expanding: Vec<(String, String)>,
    open_ifs: Vec<OpenIf>,
    next_id: usize,
    line_starts: Vec<Option<usize>>,
    in_main: bool,
    last_line: usize,
}

impl Layout {
    fn new(fakes: HashMap<String, Vec<Item>>, source_lines: usize) -> Self {
        Self {
            entries: vec![
                (0, Statement::Fixed(Instruction::default())),
                (0, Statement::Fixed(Instruction::default())),
            ],
            address: 2,
            labels: HashMap::new(),
            functions: HashMap::new(),
            fakes,
            expanding: Vec::new(),
            open_ifs: Vec::new(),
            next_id: 0,
            line_starts: vec![None; source_lines + 1],
            in_main: true,
            last_line: 0,
        }
    }

    fn push(&mut self, line: usize, statement: Statement) {
        self.address += statement.size();
        self.last_line = line;
        self.entries.push((line, statement));
    }

    fn jump(&mut self, line: usize, target: String, condition: JumpCondition) {
        self.push(line, Statement::Jump { target, condition, key: 0 });
    }

    /// Records where code for `line` begins, unless an earlier item on the
    /// same line already did.
    fn mark_line(&mut self, line: usize) {
        let address = self.address;
        if let Some(slot) = self.line_starts.get_mut(line) {
            if slot.is_none() {
                *slot = Some(address);
            }
        }
    }

    fn fresh_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    /// `top` is false for items pasted from a fake function body.
    fn push_item(&mut self, item: Item, top: bool) -> Result<()> {
        match item {
            Item::Label { line, name, kind } => {
                if kind == LabelKind::Function {
                    if let Some(open) = self.open_ifs.last() {
                        return Err(error(open.line, "IF without END"));
                    }
                    if self.in_main {
                        self.close_main();
                    }
                }
                self.define(&name, line)?;
                if kind == LabelKind::Function {
                    self.functions.insert(name, self.address);
                }
                if top {
                    self.mark_line(line);
                }
            }
            Item::Statement { line, statement } => {
                if top {
                    self.mark_line(line);
                }
                self.push_statement(line, statement)?;
            }
            Item::If {
                line,
                compare,
                comparison,
            } => {
                if top {
                    self.mark_line(line);
                }
                let id = self.fresh_id();
                self.push(line, Statement::Fixed(compare));
                for &(condition, branch) in comparison.branches() {
                    let target = match branch {
                        Branch::Then => block_label(id, "THEN"),
                        Branch::Else => block_label(id, "ELSE"),
                    };
                    self.jump(line, target, condition);
                }
                self.labels.insert(block_label(id, "THEN"), self.address);
                self.open_ifs.push(OpenIf {
                    id,
                    line,
                    has_else: false,
                });
            }
            Item::Else { line } => {
                if top {
                    self.mark_line(line);
                }
                let id = match self.open_ifs.last_mut() {
                    Some(open) if !open.has_else => {
                        open.has_else = true;
                        open.id
                    }
                    _ => return Err(error(line, "ELSE without IF")),
                };
                self.jump(line, block_label(id, "END"), JumpCondition::Always);
                self.labels.insert(block_label(id, "ELSE"), self.address);
            }
            Item::End { line } => {
                if top {
                    self.mark_line(line);
                }
                let open = self
                    .open_ifs
                    .pop()
                    .ok_or_else(|| error(line, "END without IF"))?;
                if !open.has_else {
                    self.labels.insert(block_label(open.id, "ELSE"), self.address);
                }
                self.labels.insert(block_label(open.id, "END"), self.address);
            }
        }
        Ok(())
    }

    fn push_statement(&mut self, line: usize, statement: Statement) -> Result<()> {
        let name = match &statement {
            Statement::Call(name) => Some(name.clone()),
            Statement::Jump { target, .. } => Some(target.clone()),
            _ => None,
        };
        let Some(name) = name else {
            self.push(line, statement);
            return Ok(());
        };

        let restart = self
            .expanding
            .iter()
            .find(|(fake, _)| *fake == name)
            .map(|(_, start)| start.clone());
        if let Some(start) = restart {
            let (condition, key) = match statement {
                Statement::Jump { condition, key, .. } => (condition, key),
                _ => (JumpCondition::Always, 0),
            };
            self.push(line, Statement::Jump { target: start, condition, key });
            return Ok(());
        }
        if self.fakes.contains_key(&name) {
            if matches!(statement, Statement::Jump { condition, .. } if condition != JumpCondition::Always) {
                return Err(error(line, format!("fake function {} cannot be called conditionally", name)));
            }
            return self.expand(&name);
        }
        self.push(line, statement);
        Ok(())
    }

    /// Pastes a copy of the fake function `name` at the current address.
    fn expand(&mut self, name: &str) -> Result<()> {
        let body = self.fakes.get(name).cloned().unwrap_or_default();
        let start = format!("{}:{}", name, self.fresh_id());
        self.labels.insert(start.clone(), self.address);
        self.expanding.push((name.to_string(), start));

        let depth = self.open_ifs.len();
        for item in body {
            self.push_item(item, false)?;
        }
        if self.open_ifs.len() > depth {
            let line = self.open_ifs.last().map(|open| open.line).unwrap_or(0);
            return Err(error(line, "IF without END"));
        }
        self.expanding.pop();
        Ok(())
    }

    fn define(&mut self, name: &str, line: usize) -> Result<()> {
        if line_target(name).is_some() {
            return Err(error(line, format!("{} names a source line and cannot be a label", name)));
        }
        if self.fakes.contains_key(name) || self.labels.insert(name.to_string(), self.address).is_some() {
            return Err(error(line, format!("label {} defined twice", name)));
        }
        Ok(())
    }

    /// Appends HALT to the main program unless it already ends in one.
    fn close_main(&mut self) {
        self.in_main = false;
        let ends_in_halt = self.entries.last().map(|(_, s)| s.is_halt()).unwrap_or(false);
        if !ends_in_halt {
            let line = self.last_line;
            self.push(line, Statement::Fixed(instr(Opcode::Halt, 0, 0, 0)));
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(open) = self.open_ifs.last() {
            return Err(error(open.line, "IF without END"));
        }
        if self.in_main {
            self.close_main();
        }
        // Lines without code start where the next line with code does.
        let mut next = self.address;
        for slot in self.line_starts.iter_mut().rev() {
            if let Some(address) = *slot {
                next = address;
            } else {
                *slot = Some(next);
            }
        }
        Ok(())
    }

    fn resolve_target(&self, target: &str, line: usize) -> Result<u8> {
        let address = match (self.labels.get(target), line_target(target)) {
            (Some(&addr), _) => Some(addr),
            (None, Some(n)) => {
                let start = self.line_starts.get(n).copied().flatten();
                if n == 0 || start.is_none() {
                    return Err(error(line, format!("no source line {}", n)));
                }
                start
            }
            (None, None) => parse_number(target).map(|n| n as usize),
        };
        address
            .filter(|&a| a <= 0xFF)
            .map(|a| a as u8)
            .ok_or_else(|| error(line, format!("unknown jump target {}", target)))
    }
}

/// Internal label of one part of an `IF` block. The colon keeps it apart
/// from anything written in source.
fn block_label(id: usize, part: &str) -> String {
    format!("IF:{}:{}", id, part)
}

/// The line number of an `L<n>` jump target.
fn line_target(target: &str) -> Option<usize> {
    let digits = target.strip_prefix('L')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ----------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------

fn parse(source: &str) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let mut text = raw.split("//").next().unwrap_or("").trim().to_ascii_uppercase();
        if text.is_empty() {
            continue;
        }

        if let Some((label, rest)) = text.split_once(':') {
            let label = label.trim();
            let (name, function) = match label.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                Some(inner) => (inner.trim(), true),
                None => (label, false),
            };
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(error(line, format!("invalid label {}", label)));
            }
            let rest = rest.trim();
            let kind = match (rest, function) {
                ("FAKE", _) => LabelKind::Fake,
                (_, true) => LabelKind::Function,
                (_, false) => LabelKind::Plain,
            };
            items.push(Item::Label {
                line,
                name: name.to_string(),
                kind,
            });
            if kind == LabelKind::Fake {
                continue;
            }
            text = rest.to_string();
            if text.is_empty() {
                continue;
            }
        }

        let item = match text.as_str() {
            "ELSE" => Item::Else { line },
            "END" => Item::End { line },
            t if t.starts_with("IF ") => parse_if(t, line)?,
            t => Item::Statement {
                line,
                statement: parse_statement(t, line)?,
            },
        };
        items.push(item);
    }
    Ok(items)
}

/// Parses `IF a <cmp> b THEN`.
fn parse_if(text: &str, line: usize) -> Result<Item> {
    let condition = text
        .strip_prefix("IF ")
        .and_then(|t| t.strip_suffix(" THEN"))
        .ok_or_else(|| error(line, "expected IF <a> <comparison> <b> THEN"))?;
    let (a, comparison, b) = COMPARISONS
        .iter()
        .find_map(|&(symbol, comparison)| {
            condition
                .split_once(symbol)
                .map(|(a, b)| (a.trim(), comparison, b.trim()))
        })
        .ok_or_else(|| error(line, format!("no comparison in IF {}", condition.trim())))?;
    if [a, b].iter().any(|t| t.is_empty() || t.contains(char::is_whitespace)) {
        return Err(error(line, format!("malformed condition {}", condition.trim())));
    }
    let compare = alu_instruction(COMPARE_REGISTER, a, AluOp::Compare, Some(b), line)?;
    Ok(Item::If {
        line,
        compare,
        comparison,
    })
}

/// Splits a statement into tokens, separating ALU operators and `=` from
/// their operands.
fn tokenize(text: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if matches!(c, '=' | '+' | '-' | '*' | '/') {
            spaced.push(' ');
            spaced.push(c);
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }
    spaced.split_whitespace().map(str::to_string).collect()
}

fn parse_statement(text: &str, line: usize) -> Result<Statement> {
    let tokens = tokenize(text);
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

    if words.contains(&"=") {
        return parse_alu(&words, line).map(Statement::Fixed);
    }

    let fixed = |i: Instruction| Ok(Statement::Fixed(i));
    match words.as_slice() {
        ["NOP"] => fixed(Instruction::default()),
        ["HALT"] => fixed(instr(Opcode::Halt, 0, 0, 0)),
        ["CLEARSCREEN"] => fixed(instr(Opcode::ClearScreen, 0, 0, 0)),
        ["REFRESHSCREEN"] => fixed(instr(Opcode::RefreshScreen, 0, 0, 0)),
        ["RETURN"] => Ok(Statement::Return),
        ["RANDOM", r] => fixed(instr(Opcode::Random, 0, register(r, line)?, 0)),
        ["SET", r, "TO", n] => fixed(instr(Opcode::Set, byte(n, line)?, register(r, line)?, 0)),
        ["STORE", a, "INTO", b] => {
            if is_register(a) {
                fixed(instr(Opcode::Store, byte(b, line)?, register(a, line)?, 0))
            } else {
                fixed(instr(Opcode::Load, byte(a, line)?, register(b, line)?, 0))
            }
        }
        ["LOAD", a, "INTO", r] => fixed(instr(Opcode::Load, byte(a, line)?, register(r, line)?, 0)),
        ["DRAW", x, y, r, g, b] => {
            let (x, y) = (nibble(x, line)?, nibble(y, line)?);
            let (r, g, b) = (nibble(r, line)?, nibble(g, line)?, nibble(b, line)?);
            fixed(instr(Opcode::Draw, y << 4 | x, r << 4 | g, b))
        }
        ["PUSH", rest @ ..] => {
            let (stack, value) = stack_operands(rest, line)?;
            let (reg, literal) = if is_register(value) {
                (register(value, line)?, 0)
            } else {
                (LITERAL_OPERAND, byte(value, line)?)
            };
            fixed(instr(Opcode::Stack, literal, reg, (StackOp::Push as u8) << 2 | stack))
        }
        ["POP", rest @ ..] => {
            let (stack, reg) = stack_operands(rest, line)?;
            let reg = register(reg, line)?;
            fixed(instr(Opcode::Stack, 0, reg, (StackOp::Pop as u8) << 2 | stack))
        }
        ["JUMP", target, rest @ ..] => parse_jump(target, rest, line),
        _ => Err(error(line, format!("unknown instruction {}", text))),
    }
}

fn parse_jump(target: &str, rest: &[&str], line: usize) -> Result<Statement> {
    let condition = match rest.first() {
        Some(&"IF") => &rest[1..],
        _ => rest,
    };
    let (condition, key) = match condition {
        [] => (JumpCondition::Always, 0),
        ["ZERO"] => (JumpCondition::Zero, 0),
        ["CARRY"] => (JumpCondition::Carry, 0),
        ["ANY", "KEY"] | ["KEY", "ANY"] => (JumpCondition::Key, ANY_KEY),
        ["KEY", k] => (JumpCondition::Key, key_index(k, line)?),
        _ => return Err(error(line, format!("unknown jump condition {}", condition.join(" ")))),
    };

    if let Some(name) = target.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        if condition != JumpCondition::Always {
            return Err(error(line, "function calls cannot be conditional"));
        }
        return Ok(Statement::Call(name.to_string()));
    }
    Ok(Statement::Jump {
        target: target.to_string(),
        condition,
        key,
    })
}

/// Parses the ALU forms `a op b = r`, `r = a op b`, `NOT a = r` and
/// `r = NOT a`.
fn parse_alu(words: &[&str], line: usize) -> Result<Instruction> {
    let (out, a, op, b) = match words {
        [a, op, b, "=", r] => (r, *a, *op, Some(*b)),
        [r, "=", a, op, b] => (r, *a, *op, Some(*b)),
        ["NOT", a, "=", r] => (r, *a, "NOT", None),
        [r, "=", "NOT", a] => (r, *a, "NOT", None),
        _ => return Err(error(line, format!("malformed ALU statement {}", words.join(" ")))),
    };
    let op = alu_op(op).ok_or_else(|| error(line, format!("unknown ALU operation {}", op)))?;
    if (op == AluOp::Not) != b.is_none() {
        return Err(error(line, "NOT takes one operand, other operations two"));
    }
    alu_instruction(register(out, line)?, a, op, b, line)
}

fn alu_instruction(out: u8, a: &str, op: AluOp, b: Option<&str>, line: usize) -> Result<Instruction> {
    let (t1, v1) = operand(a, line)?;
    let (t2, v2) = match b {
        Some(b) => operand(b, line)?,
        None => (OperandKind::Register, 0),
    };
    if t1 == OperandKind::Ram && t2 == OperandKind::Ram {
        return Err(error(line, "at most one operand may come from RAM"));
    }

    Ok(instr(
        Opcode::Alu,
        v2 << 4 | v1,
        (t2 as u8) << 6 | (t1 as u8) << 4 | out,
        v1 << 4 | op as u8,
    ))
}

fn alu_op(token: &str) -> Option<AluOp> {
    Some(match token {
        "+" => AluOp::Add,
        "-" => AluOp::Sub,
        "*" => AluOp::Mul,
        "/" => AluOp::Div,
        "NAND" => AluOp::Nand,
        "AND" => AluOp::And,
        "NOT" => AluOp::Not,
        "OR" => AluOp::Or,
        "NOR" => AluOp::Nor,
        "XOR" => AluOp::Xor,
        "XNOR" => AluOp::Xnor,
        "COMPARE" => AluOp::Compare,
        "COMPARE_SIGNED" => AluOp::CompareSigned,
        _ => return None,
    })
}

/// ALU operand: a register, `[n]` for RAM cell n, or a literal. RAM
/// addresses and literals must fit in a nibble.
fn operand(token: &str, line: usize) -> Result<(OperandKind, u8)> {
    if is_register(token) {
        return Ok((OperandKind::Register, register(token, line)?));
    }
    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return Ok((OperandKind::Ram, nibble(inner, line)?));
    }
    Ok((OperandKind::Literal, nibble(token, line)?))
}

fn stack_operands<'t>(rest: &[&'t str], line: usize) -> Result<(u8, &'t str)> {
    match rest {
        [value] => Ok((DEFAULT_STACK, *value)),
        [stack, value] => {
            let index = STACKS
                .iter()
                .position(|s| s == stack)
                .ok_or_else(|| error(line, format!("unknown stack {}", stack)))?;
            Ok((index as u8, *value))
        }
        _ => Err(error(line, "expected [stack] value")),
    }
}

fn is_register(token: &str) -> bool {
    REGISTERS.contains(&token)
}

fn register(token: &str, line: usize) -> Result<u8> {
    REGISTERS
        .iter()
        .position(|r| *r == token)
        .map(|i| i as u8)
        .ok_or_else(|| error(line, format!("unknown register {}", token)))
}

fn key_index(token: &str, line: usize) -> Result<u8> {
    match token {
        "W" => Ok(0),
        "A" => Ok(1),
        "S" => Ok(2),
        "D" => Ok(3),
        "ANY" => Ok(ANY_KEY),
        _ => Err(error(line, format!("unknown key {}", token))),
    }
}

/// Parses decimal, `0x` hexadecimal and `0b` binary numbers.
pub fn parse_number(token: &str) -> Option<u32> {
    let t = token.to_ascii_uppercase();
    if let Some(hex) = t.strip_prefix("0X") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = t.strip_prefix("0B") {
        u32::from_str_radix(bin, 2).ok()
    } else {
        t.parse().ok()
    }
}

fn byte(token: &str, line: usize) -> Result<u8> {
    parse_number(token)
        .filter(|&n| n <= 0xFF)
        .map(|n| n as u8)
        .ok_or_else(|| error(line, format!("expected a byte value, got {}", token)))
}

fn nibble(token: &str, line: usize) -> Result<u8> {
    parse_number(token)
        .filter(|&n| n <= 0xF)
        .map(|n| n as u8)
        .ok_or_else(|| error(line, format!("expected a value from 0 to 15, got {}", token)))
}
