//! Chip Builder.
//!
//! Turns library descriptions into live chip trees inside a `Circuit`.
//! Built-ins get their fixed pin layout and a state buffer sized and seeded
//! for their kind; custom chips get the pins their description declares,
//! one instance per sub-chip (recursively) and every wire.
//!
//! A description that cannot be built (duplicate pin ids, unknown chip
//! names, wires to missing or wrong-direction pins, a chip that contains
//! itself) is rejected as a whole: nothing it created stays in the arena.

use log::debug;

use super::circuit::{ChipHandle, Circuit, PinHandle};
use super::kind::ChipKind;
use super::sim_chip::SimChip;
use crate::builtin::{self, BuiltinDefaults};
use crate::common::{ChipId, PinId, Result, SimError};
use crate::library::{ChipDescription, ChipLibrary, WireEnd};

/// Id given to the root chip.
pub const ROOT_CHIP_ID: ChipId = 0;

/// Instantiates chips from a library.
pub struct ChipBuilder<'a> {
    library: &'a ChipLibrary,
    defaults: BuiltinDefaults,
}

impl<'a> ChipBuilder<'a> {
    pub fn new(library: &'a ChipLibrary, defaults: BuiltinDefaults) -> Self {
        Self { library, defaults }
    }

    /// Builds the chip named `name` and installs it as the circuit's root.
    pub fn build_root(&self, circuit: &mut Circuit, name: &str) -> Result<ChipHandle> {
        let root = self.instantiate(circuit, ROOT_CHIP_ID, name, None)?;
        circuit.set_root(root);
        Ok(root)
    }

    /// Builds a detached chip instance.
    ///
    /// # Arguments
    ///
    /// * `circuit` - Arena receiving the new chips and pins
    /// * `id` - Id of the instance among its future siblings
    /// * `name` - Built-in or library name
    /// * `seed` - Internal-state seed; ignored for custom chips
    ///
    /// # Returns
    ///
    /// The handle of the new chip, not yet attached to a parent.
    pub fn instantiate(
        &self,
        circuit: &mut Circuit,
        id: ChipId,
        name: &str,
        seed: Option<&[u32]>,
    ) -> Result<ChipHandle> {
        let mut stack = Vec::new();
        self.instantiate_inner(circuit, id, name, seed, &mut stack)
    }

    fn instantiate_inner(
        &self,
        circuit: &mut Circuit,
        id: ChipId,
        name: &str,
        seed: Option<&[u32]>,
        stack: &mut Vec<String>,
    ) -> Result<ChipHandle> {
        if let Some(kind) = ChipKind::from_name(name) {
            return Ok(instantiate_builtin(circuit, id, kind, &self.defaults, seed));
        }
        let description = self
            .library
            .get(name)
            .ok_or_else(|| SimError::UnknownChip(name.to_string()))?;
        if stack.iter().any(|n| n.eq_ignore_ascii_case(&description.name)) {
            return Err(SimError::RecursiveChip(description.name.clone()));
        }

        let handle = circuit.insert_chip(SimChip::new(id, ChipKind::Custom, &description.name));
        stack.push(description.name.clone());
        let result = self.populate(circuit, handle, description, stack);
        stack.pop();
        if let Err(e) = result {
            circuit.remove_child(handle);
            return Err(e);
        }
        debug!(
            "built {} (id {}) with {} sub-chips and {} wires",
            description.name,
            id,
            description.sub_chips.len(),
            description.wires.len()
        );
        Ok(handle)
    }

    fn populate(
        &self,
        circuit: &mut Circuit,
        handle: ChipHandle,
        description: &ChipDescription,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        for pin in &description.input_pins {
            circuit.add_pin(handle, pin.id, true, pin.bit_count)?;
        }
        for pin in &description.output_pins {
            circuit.add_pin(handle, pin.id, false, pin.bit_count)?;
        }

        for sub in &description.sub_chips {
            if circuit.child_by_id(handle, sub.id).is_some() {
                return Err(SimError::InvalidWire {
                    chip: description.name.clone(),
                    detail: format!("sub-chip id {} used twice", sub.id),
                });
            }
            let child =
                self.instantiate_inner(circuit, sub.id, &sub.name, sub.internal_data.as_deref(), stack)?;
            circuit.add_child(handle, child);
        }

        for wire in &description.wires {
            let source = resolve_end(circuit, handle, &description.name, wire.source, End::Source)?;
            let target = resolve_end(circuit, handle, &description.name, wire.target, End::Target)?;
            circuit.connect(source, target);
        }
        Ok(())
    }
}

/// Builds a detached built-in chip with its standard pins and seeded state.
pub fn instantiate_builtin(
    circuit: &mut Circuit,
    id: ChipId,
    kind: ChipKind,
    defaults: &BuiltinDefaults,
    seed: Option<&[u32]>,
) -> ChipHandle {
    let mut chip = SimChip::new(id, kind, kind.to_string());
    chip.internal_state = builtin::initial_state(kind, defaults, seed);
    let handle = circuit.insert_chip(chip);

    let (inputs, outputs) = kind.pin_layout();
    let specs = inputs
        .iter()
        .map(|s| (true, s.bit_count))
        .chain(outputs.iter().map(|s| (false, s.bit_count)));
    for (index, (is_input, bit_count)) in specs.enumerate() {
        // Fresh chip, sequential ids: no duplicates possible.
        let _ = circuit.add_pin(handle, index as PinId, is_input, bit_count);
    }
    handle
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum End {
    Source,
    Target,
}

/// Resolves one wire end inside `parent`, checking direction.
///
/// A source is one of the parent's inputs or a child's output; a target is
/// one of the parent's outputs or a child's input.
fn resolve_end(
    circuit: &Circuit,
    parent: ChipHandle,
    parent_name: &str,
    end: WireEnd,
    role: End,
) -> Result<PinHandle> {
    let invalid = |detail: String| SimError::InvalidWire {
        chip: parent_name.to_string(),
        detail,
    };
    let owner = match end.chip {
        None => parent,
        Some(id) => circuit
            .child_by_id(parent, id)
            .ok_or_else(|| invalid(format!("no sub-chip with id {}", id)))?,
    };
    let pin = circuit
        .pin_by_id(owner, end.pin)
        .ok_or_else(|| invalid(format!("no pin {} on {}", end.pin, circuit[owner].name)))?;

    let own = end.chip.is_none();
    let is_input = circuit[pin].is_input;
    let wants_input = match role {
        End::Source => own,
        End::Target => !own,
    };
    if is_input != wants_input {
        let side = if role == End::Source { "source" } else { "target" };
        return Err(invalid(format!(
            "pin {} on {} cannot be a wire {}",
            end.pin, circuit[owner].name, side
        )));
    }
    Ok(pin)
}
