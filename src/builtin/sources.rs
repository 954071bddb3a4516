//! Player input sources: single keys, the keyboard and the mouse.
//!
//! These read the input snapshot taken at the start of the frame, never the
//! live shared state.

use super::{set_output, word};
use crate::common::PinState;
use crate::sim::input::{InputState, MOUSE_LEFT, MOUSE_RIGHT};

/// Character code of the bound key.
pub const KEY_CODE: usize = 0;
pub const KEY_STATE_LEN: usize = 1;

/// High while the bound key is held. An unbound key (code 0) stays low.
pub fn key(state: &mut [u32], outputs: &mut [PinState], input: &InputState) {
    let held = char::from_u32(word(state, KEY_CODE))
        .filter(|&c| c != '\0')
        .map(|c| input.is_key_held(&c.to_string()))
        .unwrap_or(false);
    set_output(outputs, 0, PinState::from_bool(held));
}

/// KEY carries the first held single-character ASCII key in sorted order,
/// ANY is high while any keyboard key is held.
pub fn keyboard(outputs: &mut [PinState], input: &InputState) {
    let code = input
        .held_keys()
        .filter_map(|k| {
            let mut chars = k.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Some(c as u64),
                _ => None,
            }
        })
        .next()
        .unwrap_or(0);
    set_output(outputs, 0, PinState::from_value(code));
    let any = input
        .held_keys()
        .any(|k| k != MOUSE_LEFT && k != MOUSE_RIGHT);
    set_output(outputs, 1, PinState::from_bool(any));
}

pub fn mouse(outputs: &mut [PinState], input: &InputState) {
    set_output(outputs, 0, PinState::from_value(input.mouse_x() as u64));
    set_output(outputs, 1, PinState::from_value(input.mouse_y() as u64));
    set_output(outputs, 2, PinState::from_bool(input.is_key_held(MOUSE_LEFT)));
    set_output(outputs, 3, PinState::from_bool(input.is_key_held(MOUSE_RIGHT)));
}
