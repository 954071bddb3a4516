//! Chip Kinds.
//!
//! Every chip instance carries a `ChipKind` tag. `Custom` chips are pure
//! evaluation scopes built from a library description; every other kind is a
//! built-in leaf whose behaviour lives in `crate::builtin`. This module owns
//! the name table used by chip descriptions, the pin layout of each built-in,
//! and the size of its internal-state buffer.

use std::fmt;

/// Bit widths available for gates and tri-state buffers.
pub const GATE_WIDTHS: [u8; 5] = [1, 4, 8, 16, 32];

/// Bit widths available for bus origins and termini.
pub const BUS_WIDTHS: [u8; 3] = [1, 4, 8];

/// Bit widths available for counters.
pub const COUNTER_WIDTHS: [u8; 3] = [4, 8, 16];

/// `(narrow, wide)` pairs supported by merge and split chips.
pub const WIDTH_CONVERSIONS: [(u8, u8); 6] = [(1, 4), (1, 8), (4, 8), (8, 16), (16, 32), (32, 64)];

/// Combinational gate operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOp {
    And,
    Or,
    Xor,
    Xnor,
    Nor,
    Not,
    Nand,
}

impl GateOp {
    const ALL: [GateOp; 7] = [
        GateOp::And,
        GateOp::Or,
        GateOp::Xor,
        GateOp::Xnor,
        GateOp::Nor,
        GateOp::Not,
        GateOp::Nand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GateOp::And => "AND",
            GateOp::Or => "OR",
            GateOp::Xor => "XOR",
            GateOp::Xnor => "XNOR",
            GateOp::Nor => "NOR",
            GateOp::Not => "NOT",
            GateOp::Nand => "NAND",
        }
    }
}

/// Type tag of a chip instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChipKind {
    /// Composite chip built from a library description.
    Custom,
    Gate { op: GateOp, width: u8 },
    TriStateBuffer { width: u8 },
    Clock,
    Pulse,
    FirstTick,
    Counter { width: u8 },
    Stack,
    Ram,
    Rom,
    /// Several narrow inputs joined into one wide output.
    Merge { narrow: u8, wide: u8 },
    /// One wide input broken into several narrow outputs.
    Split { wide: u8, narrow: u8 },
    RgbDisplay,
    LargeRgbDisplay,
    DotDisplay,
    Led,
    SevenSegment,
    Ssd,
    Cpu,
    Key,
    Keyboard,
    Mouse,
    BusOrigin { width: u8 },
    BusTerminus { width: u8 },
}

/// Name and width of one built-in pin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinSpec {
    pub name: String,
    pub bit_count: u8,
}

fn pins(specs: &[(&str, u8)]) -> Vec<PinSpec> {
    specs
        .iter()
        .map(|(name, bit_count)| PinSpec {
            name: (*name).to_string(),
            bit_count: *bit_count,
        })
        .collect()
}

fn numbered(prefix: &str, count: u8, bit_count: u8) -> Vec<PinSpec> {
    (0..count)
        .map(|i| PinSpec {
            name: format!("{}{}", prefix, i),
            bit_count,
        })
        .collect()
}

fn parse_width(suffix: Option<&str>, allowed: &[u8], default: u8) -> Option<u8> {
    match suffix {
        None => Some(default),
        Some(s) => s.parse::<u8>().ok().filter(|w| allowed.contains(w)),
    }
}

impl ChipKind {
    /// Resolves a built-in chip name such as `"AND-8"` or `"RAM-8"`.
    ///
    /// # Returns
    ///
    /// `None` for names that are not built in; the caller then looks the
    /// name up in the chip library.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let fixed = match upper.as_str() {
            "CLOCK" => Some(ChipKind::Clock),
            "PULSE" => Some(ChipKind::Pulse),
            "FIRST-TICK" => Some(ChipKind::FirstTick),
            "STACK" => Some(ChipKind::Stack),
            "RAM-8" => Some(ChipKind::Ram),
            "ROM-256X16" => Some(ChipKind::Rom),
            "RGB-DISPLAY" => Some(ChipKind::RgbDisplay),
            "LARGE-RGB-DISPLAY" => Some(ChipKind::LargeRgbDisplay),
            "DOT-DISPLAY" => Some(ChipKind::DotDisplay),
            "LED" => Some(ChipKind::Led),
            "7-SEGMENT" => Some(ChipKind::SevenSegment),
            "SSD" => Some(ChipKind::Ssd),
            "CPU" => Some(ChipKind::Cpu),
            "KEY" => Some(ChipKind::Key),
            "KEYBOARD" => Some(ChipKind::Keyboard),
            "MOUSE" => Some(ChipKind::Mouse),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        let mut parts = upper.splitn(2, '-');
        let head = parts.next()?;
        let tail = parts.next();

        if let Some(op) = GateOp::ALL.iter().copied().find(|op| op.name() == head) {
            let width = parse_width(tail, &GATE_WIDTHS, 1)?;
            return Some(ChipKind::Gate { op, width });
        }

        match head {
            "COUNTER" => {
                let width = parse_width(tail, &COUNTER_WIDTHS, 8)?;
                Some(ChipKind::Counter { width })
            }
            "MERGE" | "SPLIT" => {
                let (a, b) = tail?.split_once('-')?;
                let a: u8 = a.parse().ok()?;
                let b: u8 = b.parse().ok()?;
                if head == "MERGE" && WIDTH_CONVERSIONS.contains(&(a, b)) {
                    Some(ChipKind::Merge { narrow: a, wide: b })
                } else if head == "SPLIT" && WIDTH_CONVERSIONS.contains(&(b, a)) {
                    Some(ChipKind::Split { wide: a, narrow: b })
                } else {
                    None
                }
            }
            _ => {
                if let Some(rest) = upper.strip_prefix("TRI-STATE") {
                    let width = parse_width(rest.strip_prefix('-'), &GATE_WIDTHS, 1)?;
                    if !rest.is_empty() && !rest.starts_with('-') {
                        return None;
                    }
                    return Some(ChipKind::TriStateBuffer { width });
                }
                if let Some(rest) = upper.strip_prefix("BUS-ORIGIN") {
                    if !rest.is_empty() && !rest.starts_with('-') {
                        return None;
                    }
                    let width = parse_width(rest.strip_prefix('-'), &BUS_WIDTHS, 1)?;
                    return Some(ChipKind::BusOrigin { width });
                }
                if let Some(rest) = upper.strip_prefix("BUS-TERMINUS") {
                    if !rest.is_empty() && !rest.starts_with('-') {
                        return None;
                    }
                    let width = parse_width(rest.strip_prefix('-'), &BUS_WIDTHS, 1)?;
                    return Some(ChipKind::BusTerminus { width });
                }
                None
            }
        }
    }

    pub fn is_builtin(self) -> bool {
        self != ChipKind::Custom
    }

    pub fn is_bus_origin(self) -> bool {
        matches!(self, ChipKind::BusOrigin { .. })
    }

    /// True for kinds whose outputs can change while their inputs stay put.
    ///
    /// Chips containing one of these are never auto-frozen.
    pub fn changes_spontaneously(self) -> bool {
        matches!(
            self,
            ChipKind::Clock
                | ChipKind::Pulse
                | ChipKind::Key
                | ChipKind::Keyboard
                | ChipKind::Mouse
                | ChipKind::Cpu
        )
    }

    /// Input and output pins of a built-in, in declaration order.
    ///
    /// Built-in pin ids are assigned from this order: inputs take ids
    /// `0..n`, outputs continue from `n`. Custom chips return empty lists.
    pub fn pin_layout(self) -> (Vec<PinSpec>, Vec<PinSpec>) {
        match self {
            ChipKind::Custom => (Vec::new(), Vec::new()),
            ChipKind::Gate { op: GateOp::Not, width } => {
                (pins(&[("IN", width)]), pins(&[("OUT", width)]))
            }
            ChipKind::Gate { width, .. } => {
                (pins(&[("A", width), ("B", width)]), pins(&[("OUT", width)]))
            }
            ChipKind::TriStateBuffer { width } => (
                pins(&[("DATA", width), ("ENABLE", 1)]),
                pins(&[("OUT", width)]),
            ),
            ChipKind::Clock => (Vec::new(), pins(&[("CLOCK", 1)])),
            ChipKind::Pulse => (pins(&[("IN", 1)]), pins(&[("OUT", 1)])),
            ChipKind::FirstTick => (pins(&[("CLOCK", 1)]), pins(&[("OUT", 1)])),
            ChipKind::Counter { width } => (
                pins(&[("CLOCK", 1), ("RESET", 1)]),
                pins(&[("COUNT", width)]),
            ),
            ChipKind::Stack => (
                pins(&[
                    ("DATA", 8),
                    ("PUSH", 1),
                    ("POP", 1),
                    ("RESET", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("TOP", 8), ("EMPTY", 1), ("FULL", 1)]),
            ),
            ChipKind::Ram => (
                pins(&[
                    ("ADDRESS", 8),
                    ("DATA", 8),
                    ("WRITE", 1),
                    ("RESET", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("OUT", 8)]),
            ),
            ChipKind::Rom => (pins(&[("ADDRESS", 8)]), pins(&[("HIGH", 8), ("LOW", 8)])),
            ChipKind::Merge { narrow, wide } => {
                (numbered("IN", wide / narrow, narrow), pins(&[("OUT", wide)]))
            }
            ChipKind::Split { wide, narrow } => {
                (pins(&[("IN", wide)]), numbered("OUT", wide / narrow, narrow))
            }
            ChipKind::RgbDisplay => (
                pins(&[
                    ("ADDRESS", 8),
                    ("RED", 4),
                    ("GREEN", 4),
                    ("BLUE", 4),
                    ("RESET", 1),
                    ("WRITE", 1),
                    ("REFRESH", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("RED", 4), ("GREEN", 4), ("BLUE", 4)]),
            ),
            ChipKind::LargeRgbDisplay => (
                pins(&[
                    ("X", 8),
                    ("Y", 8),
                    ("RED", 8),
                    ("GREEN", 8),
                    ("BLUE", 8),
                    ("RESET", 1),
                    ("WRITE", 1),
                    ("REFRESH", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("RED", 8), ("GREEN", 8), ("BLUE", 8)]),
            ),
            ChipKind::DotDisplay => (
                pins(&[
                    ("ADDRESS", 8),
                    ("PIXEL", 1),
                    ("RESET", 1),
                    ("WRITE", 1),
                    ("REFRESH", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("PIXEL", 1)]),
            ),
            ChipKind::Led => (pins(&[("IN", 1)]), Vec::new()),
            ChipKind::SevenSegment => (
                pins(&[
                    ("A", 1),
                    ("B", 1),
                    ("C", 1),
                    ("D", 1),
                    ("E", 1),
                    ("F", 1),
                    ("G", 1),
                    ("DP", 1),
                ]),
                Vec::new(),
            ),
            ChipKind::Ssd => (
                pins(&[
                    ("BANK", 4),
                    ("ADDRESS", 8),
                    ("DATA", 8),
                    ("RESET", 1),
                    ("WRITE", 1),
                    ("REFRESH", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[("OUT", 8)]),
            ),
            ChipKind::Cpu => (
                pins(&[
                    ("OPCODE", 8),
                    ("DATA1", 8),
                    ("DATA2", 8),
                    ("DATA3", 8),
                    ("KEYS", 4),
                    ("RUN", 1),
                    ("STEP", 1),
                    ("RESET", 1),
                    ("CLOCK", 1),
                ]),
                pins(&[
                    ("PC", 8),
                    ("SCREEN_ADDRESS", 8),
                    ("SCREEN_RED", 4),
                    ("SCREEN_GREEN", 4),
                    ("SCREEN_BLUE", 4),
                    ("SCREEN_WRITE", 1),
                    ("SCREEN_CLEAR", 1),
                    ("SCREEN_REFRESH", 1),
                    ("HALTED", 1),
                ]),
            ),
            ChipKind::Key => (Vec::new(), pins(&[("OUT", 1)])),
            ChipKind::Keyboard => (Vec::new(), pins(&[("KEY", 8), ("ANY", 1)])),
            ChipKind::Mouse => (
                Vec::new(),
                pins(&[("X", 8), ("Y", 8), ("LEFT", 1), ("RIGHT", 1)]),
            ),
            ChipKind::BusOrigin { width } | ChipKind::BusTerminus { width } => {
                (pins(&[("IN", width)]), pins(&[("OUT", width)]))
            }
        }
    }
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChipKind::Custom => write!(f, "CUSTOM"),
            ChipKind::Gate { op, width: 1 } => write!(f, "{}", op.name()),
            ChipKind::Gate { op, width } => write!(f, "{}-{}", op.name(), width),
            ChipKind::TriStateBuffer { width: 1 } => write!(f, "TRI-STATE"),
            ChipKind::TriStateBuffer { width } => write!(f, "TRI-STATE-{}", width),
            ChipKind::Clock => write!(f, "CLOCK"),
            ChipKind::Pulse => write!(f, "PULSE"),
            ChipKind::FirstTick => write!(f, "FIRST-TICK"),
            ChipKind::Counter { width } => write!(f, "COUNTER-{}", width),
            ChipKind::Stack => write!(f, "STACK"),
            ChipKind::Ram => write!(f, "RAM-8"),
            ChipKind::Rom => write!(f, "ROM-256X16"),
            ChipKind::Merge { narrow, wide } => write!(f, "MERGE-{}-{}", narrow, wide),
            ChipKind::Split { wide, narrow } => write!(f, "SPLIT-{}-{}", wide, narrow),
            ChipKind::RgbDisplay => write!(f, "RGB-DISPLAY"),
            ChipKind::LargeRgbDisplay => write!(f, "LARGE-RGB-DISPLAY"),
            ChipKind::DotDisplay => write!(f, "DOT-DISPLAY"),
            ChipKind::Led => write!(f, "LED"),
            ChipKind::SevenSegment => write!(f, "7-SEGMENT"),
            ChipKind::Ssd => write!(f, "SSD"),
            ChipKind::Cpu => write!(f, "CPU"),
            ChipKind::Key => write!(f, "KEY"),
            ChipKind::Keyboard => write!(f, "KEYBOARD"),
            ChipKind::Mouse => write!(f, "MOUSE"),
            ChipKind::BusOrigin { width } => write!(f, "BUS-ORIGIN-{}", width),
            ChipKind::BusTerminus { width } => write!(f, "BUS-TERMINUS-{}", width),
        }
    }
}
