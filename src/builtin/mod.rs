//! Built-in Chip Behaviour.
//!
//! Every built-in kind is evaluated by a function with the same shape:
//! current input states and the chip's internal-state buffer go in, output
//! states come out and the buffer may be updated in place. `process` picks
//! the function for a `ChipKind`.
//!
//! All buffer access goes through `word`/`put` and friends, which treat
//! out-of-range indices as zero or as a no-op, so a malformed seed or a
//! resized buffer can never fault the evaluator.

use rand::RngCore;

use crate::chip::ChipKind;
use crate::common::PinState;
use crate::sim::input::InputState;

pub mod cpu;
pub mod display;
pub mod gates;
pub mod memory;
pub mod sequential;
pub mod sources;

/// Per-evaluation context shared by all built-ins.
pub struct EvalContext<'a> {
    pub frame: u64,
    pub rng: &'a mut dyn RngCore,
    pub input: &'a InputState,
}

/// Values used to seed built-ins whose description carries no state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinDefaults {
    pub clock_half_period: u32,
    pub pulse_width: u32,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            clock_half_period: 1,
            pulse_width: 1,
        }
    }
}

/// Size of the internal-state buffer of `kind`, in words.
pub fn state_len(kind: ChipKind) -> usize {
    match kind {
        ChipKind::Custom
        | ChipKind::Gate { .. }
        | ChipKind::TriStateBuffer { .. }
        | ChipKind::Merge { .. }
        | ChipKind::Split { .. }
        | ChipKind::Keyboard
        | ChipKind::Mouse
        | ChipKind::BusOrigin { .. }
        | ChipKind::BusTerminus { .. } => 0,
        ChipKind::Clock => sequential::CLOCK_STATE_LEN,
        ChipKind::Pulse => sequential::PULSE_STATE_LEN,
        ChipKind::FirstTick => sequential::FIRST_TICK_STATE_LEN,
        ChipKind::Counter { .. } => sequential::COUNTER_STATE_LEN,
        ChipKind::Stack => sequential::STACK_STATE_LEN,
        ChipKind::Ram => memory::RAM_STATE_LEN,
        ChipKind::Rom => memory::ROM_STATE_LEN,
        ChipKind::RgbDisplay => display::RGB_STATE_LEN,
        ChipKind::LargeRgbDisplay => display::LARGE_RGB_STATE_LEN,
        ChipKind::DotDisplay => display::DOT_STATE_LEN,
        ChipKind::Led => display::LED_STATE_LEN,
        ChipKind::SevenSegment => display::SEVEN_SEGMENT_STATE_LEN,
        ChipKind::Ssd => display::SSD_STATE_LEN,
        ChipKind::Cpu => cpu::STATE_LEN,
        ChipKind::Key => sources::KEY_STATE_LEN,
    }
}

/// Builds the internal-state buffer of a new chip.
///
/// The kind's defaults are laid down first, then `seed` (persisted state from
/// a chip description) overwrites the leading words. Extra seed words are
/// dropped.
pub fn initial_state(kind: ChipKind, defaults: &BuiltinDefaults, seed: Option<&[u32]>) -> Vec<u32> {
    let mut state = vec![0u32; state_len(kind)];
    match kind {
        ChipKind::Clock => put(&mut state, sequential::CLOCK_HALF_PERIOD, defaults.clock_half_period),
        ChipKind::Pulse => put(&mut state, sequential::PULSE_WIDTH, defaults.pulse_width),
        _ => {}
    }
    if let Some(seed) = seed {
        let n = seed.len().min(state.len());
        state[..n].copy_from_slice(&seed[..n]);
    }
    state
}

/// Evaluates one built-in chip.
///
/// `outputs` arrives holding the chip's current output states; functions
/// overwrite the entries they drive.
pub fn process(
    kind: ChipKind,
    inputs: &[PinState],
    state: &mut [u32],
    outputs: &mut [PinState],
    ctx: &mut EvalContext<'_>,
) {
    match kind {
        ChipKind::Custom => {}
        ChipKind::Gate { op, width } => gates::gate(op, width, inputs, outputs),
        ChipKind::TriStateBuffer { width } => gates::tri_state(width, inputs, outputs),
        ChipKind::Merge { narrow, wide } => gates::merge(narrow, wide, inputs, outputs),
        ChipKind::Split { wide, narrow } => gates::split(wide, narrow, inputs, outputs),
        ChipKind::BusOrigin { .. } | ChipKind::BusTerminus { .. } => gates::bus(inputs, outputs),
        ChipKind::Clock => sequential::clock(state, outputs),
        ChipKind::Pulse => sequential::pulse(inputs, state, outputs),
        ChipKind::FirstTick => sequential::first_tick(inputs, state, outputs),
        ChipKind::Counter { width } => sequential::counter(width, inputs, state, outputs),
        ChipKind::Stack => sequential::stack(inputs, state, outputs),
        ChipKind::Ram => memory::ram(inputs, state, outputs),
        ChipKind::Rom => memory::rom(inputs, state, outputs),
        ChipKind::RgbDisplay => display::rgb(inputs, state, outputs),
        ChipKind::LargeRgbDisplay => display::large_rgb(inputs, state, outputs),
        ChipKind::DotDisplay => display::dot(inputs, state, outputs),
        ChipKind::Led => display::led(inputs, state),
        ChipKind::SevenSegment => display::seven_segment(inputs, state),
        ChipKind::Ssd => display::ssd(inputs, state, outputs),
        ChipKind::Cpu => cpu::process(inputs, state, outputs, ctx.rng),
        ChipKind::Key => sources::key(state, outputs, ctx.input),
        ChipKind::Keyboard => sources::keyboard(outputs, ctx.input),
        ChipKind::Mouse => sources::mouse(outputs, ctx.input),
    }
}

/// Input `index`, or a floating word if the chip lost that pin.
pub(crate) fn input(inputs: &[PinState], index: usize) -> PinState {
    inputs.get(index).copied().unwrap_or(PinState::DISCONNECTED)
}

/// Driven value of input `index` with floating lines read as low.
pub(crate) fn input_value(inputs: &[PinState], index: usize) -> u64 {
    input(inputs, index).driven_value()
}

pub(crate) fn input_high(inputs: &[PinState], index: usize) -> bool {
    input(inputs, index).first_bit_high()
}

pub(crate) fn set_output(outputs: &mut [PinState], index: usize, state: PinState) {
    if let Some(slot) = outputs.get_mut(index) {
        *slot = state;
    }
}

pub(crate) fn word(state: &[u32], index: usize) -> u32 {
    state.get(index).copied().unwrap_or(0)
}

pub(crate) fn put(state: &mut [u32], index: usize, value: u32) {
    if let Some(slot) = state.get_mut(index) {
        *slot = value;
    }
}

/// Stores the new level of an edge-sensitive input.
///
/// # Returns
///
/// `true` when the input went from low (as last stored) to high.
pub(crate) fn rising_edge(state: &mut [u32], prev_index: usize, level: bool) -> bool {
    let was_high = word(state, prev_index) != 0;
    put(state, prev_index, level as u32);
    level && !was_high
}

/// Mutable view of `len` words starting at `start`, clipped to the buffer.
pub(crate) fn region(state: &mut [u32], start: usize, len: usize) -> &mut [u32] {
    let start = start.min(state.len());
    let end = start.saturating_add(len).min(state.len());
    &mut state[start..end]
}
