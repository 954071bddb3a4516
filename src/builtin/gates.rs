//! Combinational built-ins: logic gates, tri-state buffers, width
//! conversion and bus pass-through.

use super::{input, input_high, input_value, set_output};
use crate::chip::GateOp;
use crate::common::{width_mask, PinState};

/// Largest number of narrow pins a merge or split chip can have.
const MAX_FIELDS: usize = 8;

/// Evaluates a logic gate.
///
/// Floating input lines count as logic low, so a gate always produces a
/// fully driven output.
pub fn gate(op: GateOp, width: u8, inputs: &[PinState], outputs: &mut [PinState]) {
    let a = input_value(inputs, 0);
    let b = input_value(inputs, 1);
    let result = match op {
        GateOp::And => a & b,
        GateOp::Or => a | b,
        GateOp::Xor => a ^ b,
        GateOp::Xnor => !(a ^ b),
        GateOp::Nor => !(a | b),
        GateOp::Not => !a,
        GateOp::Nand => !(a & b),
    };
    set_output(outputs, 0, PinState::from_value(result & width_mask(width)));
}

/// Passes DATA through while ENABLE is high, otherwise floats every line.
pub fn tri_state(width: u8, inputs: &[PinState], outputs: &mut [PinState]) {
    let out = if input_high(inputs, 1) {
        input(inputs, 0).masked(width)
    } else {
        PinState::DISCONNECTED.masked(width)
    };
    set_output(outputs, 0, out);
}

/// Joins narrow inputs into one wide output; input 0 is most significant.
pub fn merge(narrow: u8, wide: u8, inputs: &[PinState], outputs: &mut [PinState]) {
    let count = field_count(narrow, wide);
    let mut fields = [PinState::DISCONNECTED; MAX_FIELDS];
    for (i, field) in fields.iter_mut().enumerate().take(count) {
        *field = input(inputs, i);
    }
    set_output(outputs, 0, PinState::combine(&fields[..count], narrow));
}

/// Breaks one wide input into narrow outputs; output 0 is most significant.
pub fn split(wide: u8, narrow: u8, inputs: &[PinState], outputs: &mut [PinState]) {
    let source = input(inputs, 0);
    for i in 0..field_count(narrow, wide) {
        set_output(outputs, i, source.field(wide, narrow, i as u8));
    }
}

/// Bus origin and terminus forward their single input unchanged.
pub fn bus(inputs: &[PinState], outputs: &mut [PinState]) {
    set_output(outputs, 0, input(inputs, 0));
}

fn field_count(narrow: u8, wide: u8) -> usize {
    if narrow == 0 {
        return 0;
    }
    ((wide / narrow) as usize).min(MAX_FIELDS)
}
