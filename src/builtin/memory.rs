//! RAM and ROM.

use super::{input_high, input_value, region, rising_edge, set_output, word};
use crate::common::PinState;

pub const MEMORY_WORDS: usize = 256;

const RAM_PREV_CLOCK: usize = 0;
pub const RAM_CELLS: usize = 1;
pub const RAM_STATE_LEN: usize = RAM_CELLS + MEMORY_WORDS;

pub const ROM_STATE_LEN: usize = MEMORY_WORDS;

/// 256 x 8-bit RAM.
///
/// Writes and resets happen on a rising clock edge, reset winning over
/// write. Reading is combinational: OUT always shows the cell at the
/// current ADDRESS.
pub fn ram(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let address = (input_value(inputs, 0) & 0xFF) as usize;
    let data = (input_value(inputs, 1) & 0xFF) as u32;
    let write = input_high(inputs, 2);
    let reset = input_high(inputs, 3);

    if rising_edge(state, RAM_PREV_CLOCK, input_high(inputs, 4)) {
        let cells = region(state, RAM_CELLS, MEMORY_WORDS);
        if reset {
            cells.fill(0);
        } else if write {
            if let Some(cell) = cells.get_mut(address) {
                *cell = data;
            }
        }
    }

    let value = word(state, RAM_CELLS + address) & 0xFF;
    set_output(outputs, 0, PinState::from_value(value as u64));
}

/// 256 x 16-bit ROM split into HIGH and LOW bytes.
pub fn rom(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let address = (input_value(inputs, 0) & 0xFF) as usize;
    let value = word(state, address);
    set_output(outputs, 0, PinState::from_value(((value >> 8) & 0xFF) as u64));
    set_output(outputs, 1, PinState::from_value((value & 0xFF) as u64));
}
