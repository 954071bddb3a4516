//! Stateful timing and storage built-ins: clock, pulse, first-tick latch,
//! counters and the 256-deep stack.
//!
//! Edge-triggered chips keep the previous level of their CLOCK input in
//! their buffer and act only on a low-to-high transition.

use super::{input_high, input_value, put, region, rising_edge, set_output, word};
use crate::common::{width_mask, PinState};

pub const CLOCK_HALF_PERIOD: usize = 0;
const CLOCK_COUNTER: usize = 1;
pub const CLOCK_STATE_LEN: usize = 2;

pub const PULSE_WIDTH: usize = 0;
const PULSE_REMAINING: usize = 1;
const PULSE_PREV_IN: usize = 2;
pub const PULSE_STATE_LEN: usize = 3;

const FIRST_TICK_PREV_CLOCK: usize = 0;
const FIRST_TICK_FIRED: usize = 1;
pub const FIRST_TICK_STATE_LEN: usize = 2;

pub const COUNTER_VALUE: usize = 0;
const COUNTER_PREV_CLOCK: usize = 1;
pub const COUNTER_STATE_LEN: usize = 2;

pub const STACK_DEPTH: usize = 256;
const STACK_PREV_CLOCK: usize = 0;
pub const STACK_POINTER: usize = 1;
const STACK_ENTRIES: usize = 2;
pub const STACK_STATE_LEN: usize = STACK_ENTRIES + STACK_DEPTH;

/// Free-running square wave.
///
/// High for `half_period` evaluations, then low for as many. A half period
/// of zero is treated as one.
pub fn clock(state: &mut [u32], outputs: &mut [PinState]) {
    let half = word(state, CLOCK_HALF_PERIOD).max(1);
    let counter = word(state, CLOCK_COUNTER);
    set_output(outputs, 0, PinState::from_bool(counter < half));
    let period = half.saturating_mul(2);
    put(state, CLOCK_COUNTER, (counter + 1) % period);
}

/// One-shot pulse generator.
///
/// A rising edge on IN starts a pulse of `width` evaluations unless one is
/// already running.
pub fn pulse(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let triggered = rising_edge(state, PULSE_PREV_IN, input_high(inputs, 0));
    let mut remaining = word(state, PULSE_REMAINING);
    if triggered && remaining == 0 {
        remaining = word(state, PULSE_WIDTH);
    }
    set_output(outputs, 0, PinState::from_bool(remaining > 0));
    put(state, PULSE_REMAINING, remaining.saturating_sub(1));
}

/// High only while the first rising clock edge is seen, low forever after.
pub fn first_tick(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let rising = rising_edge(state, FIRST_TICK_PREV_CLOCK, input_high(inputs, 0));
    let fire = rising && word(state, FIRST_TICK_FIRED) == 0;
    if fire {
        put(state, FIRST_TICK_FIRED, 1);
    }
    set_output(outputs, 0, PinState::from_bool(fire));
}

/// Counts rising clock edges modulo `2^width`; RESET zeroes on the edge.
pub fn counter(width: u8, inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let mask = width_mask(width) as u32;
    if rising_edge(state, COUNTER_PREV_CLOCK, input_high(inputs, 0)) {
        let next = if input_high(inputs, 1) {
            0
        } else {
            word(state, COUNTER_VALUE).wrapping_add(1) & mask
        };
        put(state, COUNTER_VALUE, next);
    }
    set_output(outputs, 0, PinState::from_value((word(state, COUNTER_VALUE) & mask) as u64));
}

/// 256-deep byte stack.
///
/// On a rising clock edge RESET empties the stack, otherwise PUSH stores
/// DATA and POP discards the top entry. Pushing onto a full stack and
/// popping an empty one are ignored.
pub fn stack(inputs: &[PinState], state: &mut [u32], outputs: &mut [PinState]) {
    let data = (input_value(inputs, 0) & 0xFF) as u32;
    let push = input_high(inputs, 1);
    let pop = input_high(inputs, 2);
    let reset = input_high(inputs, 3);
    let clock = input_high(inputs, 4);

    let mut sp = (word(state, STACK_POINTER) as usize).min(STACK_DEPTH);
    if rising_edge(state, STACK_PREV_CLOCK, clock) {
        if reset {
            sp = 0;
        } else if push {
            if sp < STACK_DEPTH {
                put(state, STACK_ENTRIES + sp, data);
                sp += 1;
            }
        } else if pop && sp > 0 {
            sp -= 1;
        }
        put(state, STACK_POINTER, sp as u32);
    }

    let entries = region(state, STACK_ENTRIES, STACK_DEPTH);
    let top = match sp {
        0 => 0,
        n => entries.get(n - 1).copied().unwrap_or(0),
    };
    set_output(outputs, 0, PinState::from_value(top as u64 & 0xFF));
    set_output(outputs, 1, PinState::from_bool(sp == 0));
    set_output(outputs, 2, PinState::from_bool(sp == STACK_DEPTH));
}
