//! Chip Instances.
//!
//! A `SimChip` is one node of the circuit tree. It lists its pins and children
//! by arena handle and carries a flat internal-state buffer whose layout
//! depends on its kind. Custom chips leave the buffer empty; they only scope
//! the evaluation of their children.

use super::circuit::{ChipHandle, PinHandle};
use super::kind::ChipKind;
use crate::common::ChipId;
use crate::sim::freeze::InputHistory;

/// One component instance in the circuit tree.
#[derive(Clone, Debug)]
pub struct SimChip {
    pub id: ChipId,
    pub kind: ChipKind,
    /// Library name for custom chips, built-in name otherwise.
    pub name: String,
    pub parent: Option<ChipHandle>,

    pub inputs: Vec<PinHandle>,
    pub outputs: Vec<PinHandle>,

    /// Evaluation order of the children, stored reversed: the fast pass
    /// visits this list from the back.
    pub children: Vec<ChipHandle>,

    /// Reserved freeze control input, if one has been added.
    pub freeze_pin: Option<PinHandle>,

    pub internal_state: Vec<u32>,

    /// Input pins that completed their expected drivers in `ready_frame`.
    pub num_inputs_ready: u32,
    pub(crate) ready_frame: u64,
    /// Input pins (freeze pin included) with at least one driver.
    pub num_connected_inputs: u32,

    /// This chip or one of its descendants changes without input changes.
    pub changes_spontaneously: bool,

    pub(crate) input_history: InputHistory,
}

impl SimChip {
    pub fn new(id: ChipId, kind: ChipKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            parent: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            children: Vec::new(),
            freeze_pin: None,
            internal_state: Vec::new(),
            num_inputs_ready: 0,
            ready_frame: 0,
            num_connected_inputs: 0,
            changes_spontaneously: kind.changes_spontaneously(),
            input_history: InputHistory::default(),
        }
    }

    /// True once every connected input has heard from all of its drivers
    /// during `frame`.
    ///
    /// A chip without connected inputs is always ready. Counts left over
    /// from an earlier frame are ignored.
    pub fn is_ready(&self, frame: u64) -> bool {
        let ready = if self.ready_frame == frame {
            self.num_inputs_ready
        } else {
            0
        };
        ready == self.num_connected_inputs
    }

    pub fn is_builtin(&self) -> bool {
        self.kind.is_builtin()
    }

    pub fn is_bus_origin(&self) -> bool {
        self.kind.is_bus_origin()
    }

    /// Consecutive frames the auto-freeze check has seen identical inputs.
    pub fn settled_frames(&self) -> u32 {
        self.input_history.unchanged_frames()
    }

    /// All input pins, data inputs first and the freeze pin last.
    pub fn all_inputs(&self) -> impl Iterator<Item = PinHandle> + '_ {
        self.inputs.iter().copied().chain(self.freeze_pin)
    }
}
