//! Signal Pins.
//!
//! A pin is one endpoint of the wiring graph. Output pins (and the input pins
//! of a custom chip, which drive its children) forward their state to a list
//! of target pins; target pins resolve whatever arrives during a frame. When
//! several drivers reach the same pin in one frame the conflict is resolved
//! bit by bit, with genuinely contested bit-lines decided by the evaluator's
//! seeded random generator.

use rand::RngCore;

use super::circuit::{ChipHandle, PinHandle};
use crate::common::{PinId, PinState};

/// Outcome of delivering one driver's state to a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reception {
    /// The pin has now received every expected driver this frame.
    pub completed: bool,
    /// At least one bit-line had two connected drivers that disagreed.
    pub contested: bool,
}

/// One wire endpoint.
#[derive(Clone, Debug)]
pub struct SimPin {
    pub id: PinId,
    pub is_input: bool,
    pub bit_count: u8,
    pub owner: ChipHandle,
    pub state: PinState,

    /// Pins this pin drives. The pin does not own them.
    pub targets: Vec<PinHandle>,

    /// Number of connections that drive this pin.
    pub num_input_connections: u32,

    last_updated_frame: u64,
    num_inputs_received_this_frame: u32,
    last_driver: Option<PinHandle>,
}

impl SimPin {
    /// Creates an unconnected pin owned by `owner`.
    ///
    /// Input pins start disconnected; output pins start driven low.
    pub fn new(id: PinId, is_input: bool, bit_count: u8, owner: ChipHandle) -> Self {
        let state = if is_input {
            PinState::DISCONNECTED
        } else {
            PinState::LOW
        };
        Self {
            id,
            is_input,
            bit_count,
            owner,
            state,
            targets: Vec::new(),
            num_input_connections: 0,
            last_updated_frame: 0,
            num_inputs_received_this_frame: 0,
            last_driver: None,
        }
    }

    /// A pin with no expected drivers never waits for anything.
    pub fn is_ready(&self, frame: u64) -> bool {
        self.num_input_connections == 0
            || (self.last_updated_frame == frame
                && self.num_inputs_received_this_frame >= self.num_input_connections)
    }

    pub fn last_driver(&self) -> Option<PinHandle> {
        self.last_driver
    }

    pub fn num_inputs_received(&self, frame: u64) -> u32 {
        if self.last_updated_frame == frame {
            self.num_inputs_received_this_frame
        } else {
            0
        }
    }

    /// Accepts one driver's state for the current frame.
    ///
    /// The first driver of a frame is taken as-is. Later drivers are merged
    /// bit by bit: floating lines yield to connected ones, agreeing lines are
    /// kept, and disagreeing connected lines are picked at random.
    pub fn receive(
        &mut self,
        incoming: PinState,
        source: PinHandle,
        frame: u64,
        rng: &mut dyn RngCore,
    ) -> Reception {
        let mut contested = false;

        if self.last_updated_frame != frame {
            self.last_updated_frame = frame;
            self.num_inputs_received_this_frame = 0;
        }

        if self.num_inputs_received_this_frame == 0 {
            self.state = incoming;
        } else {
            let (resolved, had_conflict) = resolve_conflict(self.state, incoming, rng);
            self.state = resolved;
            contested = had_conflict;
        }

        self.last_driver = Some(source);
        self.num_inputs_received_this_frame += 1;

        Reception {
            completed: self.is_input
                && self.num_inputs_received_this_frame == self.num_input_connections,
            contested,
        }
    }
}

/// Merges two drivers of the same pin.
///
/// # Returns
///
/// The resolved state and whether any bit-line was contested.
pub fn resolve_conflict(
    existing: PinState,
    incoming: PinState,
    rng: &mut dyn RngCore,
) -> (PinState, bool) {
    let (a_val, a_tri) = existing.unpack();
    let (b_val, b_tri) = incoming.unpack();

    let both_floating = a_tri & b_tri;
    let only_a = !a_tri & b_tri;
    let only_b = a_tri & !b_tri;
    let both_driven = !a_tri & !b_tri;
    let disagree = both_driven & (a_val ^ b_val);

    if disagree == 0 {
        let value = (a_val & (only_a | both_driven)) | (b_val & only_b);
        return (PinState::pack(value, both_floating), false);
    }

    // One random bit per line: set picks the incoming driver.
    let pick_incoming = rng.next_u64();
    let from_a = only_a | (both_driven & !pick_incoming);
    let from_b = only_b | (both_driven & pick_incoming);
    let value = (a_val & from_a) | (b_val & from_b);

    (PinState::pack(value, both_floating), true)
}
