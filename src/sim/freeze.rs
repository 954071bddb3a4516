//! Freeze Policy.
//!
//! A chip is frozen while its reserved freeze pin is high: neither it nor any
//! of its descendants is recomputed, and its pins keep their last states.
//!
//! Auto-freeze is an opt-in optimisation. Each custom chip keeps a short
//! history of its input states; once the inputs have been bit-for-bit
//! identical for the configured number of consecutive frames the chip's
//! children are no longer re-evaluated (their outputs are still forwarded).
//! Chips that contain something able to change on its own (clocks, pulses,
//! key and mouse sources, the CPU) are exempt.

use crate::chip::{ChipHandle, Circuit};
use crate::common::PinState;

/// Rolling record of a chip's recent input states.
#[derive(Clone, Debug, Default)]
pub struct InputHistory {
    last_inputs: Vec<PinState>,
    unchanged_frames: u32,
    last_frame: u64,
}

impl InputHistory {
    /// Records this frame's inputs.
    ///
    /// # Returns
    ///
    /// How many consecutive frames, this one included, saw identical inputs.
    pub fn record(&mut self, inputs: &[PinState], frame: u64) -> u32 {
        if self.last_frame == frame {
            return self.unchanged_frames;
        }
        let consecutive = self.last_frame + 1 == frame;
        self.last_frame = frame;
        if consecutive && self.last_inputs.as_slice() == inputs {
            self.unchanged_frames = self.unchanged_frames.saturating_add(1);
        } else {
            self.last_inputs.clear();
            self.last_inputs.extend_from_slice(inputs);
            self.unchanged_frames = 1;
        }
        self.unchanged_frames
    }

    pub fn unchanged_frames(&self) -> u32 {
        self.unchanged_frames
    }

    /// Forgets recorded inputs, e.g. after a structural edit.
    pub fn reset(&mut self) {
        self.last_inputs.clear();
        self.unchanged_frames = 0;
        self.last_frame = 0;
    }
}

/// True when the chip's freeze pin is driven high.
pub fn is_frozen(circuit: &Circuit, chip: ChipHandle) -> bool {
    circuit[chip]
        .freeze_pin
        .map(|pin| circuit[pin].state.first_bit_high())
        .unwrap_or(false)
}

/// Auto-freeze settings taken from the simulation configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoFreeze {
    pub enabled: bool,
    /// Consecutive unchanged frames required before a chip is skipped.
    pub threshold: u32,
}

impl AutoFreeze {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: u32::MAX,
        }
    }

    /// Updates the chip's input history and decides whether to skip its
    /// children this frame.
    pub fn check(
        &self,
        circuit: &mut Circuit,
        chip: ChipHandle,
        frame: u64,
        scratch: &mut Vec<PinState>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        let node = &circuit[chip];
        if node.is_builtin() || node.changes_spontaneously {
            return false;
        }
        circuit.read_inputs(chip, scratch);
        let unchanged = circuit[chip].input_history.record(scratch, frame);
        unchanged > self.threshold
    }
}
