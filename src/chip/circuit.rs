//! Circuit Arena.
//!
//! The `Circuit` owns every chip and pin of a simulation in two slabs and
//! hands out copyable handles into them. Pins reference their targets and
//! owners by handle, which keeps the wiring graph free of shared ownership
//! and lets the whole circuit move onto the evaluator thread.
//!
//! The structural helpers here (pins, children, connections) are only called
//! on the evaluation thread: at build time by the builder and afterwards by
//! the command queue drain.

use std::ops::{Index, IndexMut};

use log::trace;
use rand::RngCore;

use super::kind::ChipKind;
use super::pin::SimPin;
use super::sim_chip::SimChip;
use crate::common::{ChipId, ChipPath, PinAddress, PinId, PinState, Result, SimError, FREEZE_PIN_ID};

/// Handle of a pin inside a `Circuit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinHandle(pub usize);

/// Handle of a chip inside a `Circuit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChipHandle(pub usize);

/// Counters produced while forwarding signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub deliveries: u64,
    pub contested: u64,
}

impl PropagationReport {
    fn absorb(&mut self, other: PropagationReport) {
        self.deliveries += other.deliveries;
        self.contested += other.contested;
    }
}

/// Slab storage for the chips and pins of one circuit.
#[derive(Debug, Default)]
pub struct Circuit {
    chips: Vec<Option<SimChip>>,
    pins: Vec<Option<SimPin>>,
    free_chips: Vec<usize>,
    free_pins: Vec<usize>,
    root: Option<ChipHandle>,
}

impl Index<PinHandle> for Circuit {
    type Output = SimPin;

    fn index(&self, handle: PinHandle) -> &SimPin {
        self.pins[handle.0].as_ref().expect("stale pin handle")
    }
}

impl IndexMut<PinHandle> for Circuit {
    fn index_mut(&mut self, handle: PinHandle) -> &mut SimPin {
        self.pins[handle.0].as_mut().expect("stale pin handle")
    }
}

impl Index<ChipHandle> for Circuit {
    type Output = SimChip;

    fn index(&self, handle: ChipHandle) -> &SimChip {
        self.chips[handle.0].as_ref().expect("stale chip handle")
    }
}

impl IndexMut<ChipHandle> for Circuit {
    fn index_mut(&mut self, handle: ChipHandle) -> &mut SimChip {
        self.chips[handle.0].as_mut().expect("stale chip handle")
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<ChipHandle> {
        self.root
    }

    pub fn set_root(&mut self, root: ChipHandle) {
        self.root = Some(root);
    }

    pub fn get_chip(&self, handle: ChipHandle) -> Option<&SimChip> {
        self.chips.get(handle.0).and_then(|c| c.as_ref())
    }

    pub fn get_pin(&self, handle: PinHandle) -> Option<&SimPin> {
        self.pins.get(handle.0).and_then(|p| p.as_ref())
    }

    /// Number of live chips, root included.
    pub fn chip_count(&self) -> usize {
        self.chips.len() - self.free_chips.len()
    }

    /// Number of live pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len() - self.free_pins.len()
    }

    /// Stores a detached chip and returns its handle.
    pub fn insert_chip(&mut self, chip: SimChip) -> ChipHandle {
        if let Some(slot) = self.free_chips.pop() {
            self.chips[slot] = Some(chip);
            ChipHandle(slot)
        } else {
            self.chips.push(Some(chip));
            ChipHandle(self.chips.len() - 1)
        }
    }

    fn insert_pin(&mut self, pin: SimPin) -> PinHandle {
        if let Some(slot) = self.free_pins.pop() {
            self.pins[slot] = Some(pin);
            PinHandle(slot)
        } else {
            self.pins.push(Some(pin));
            PinHandle(self.pins.len() - 1)
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Finds the child of `parent` with the given id.
    pub fn child_by_id(&self, parent: ChipHandle, id: ChipId) -> Option<ChipHandle> {
        self[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self[c].id == id)
    }

    /// Finds a pin of `chip` by id, freeze pin included.
    pub fn pin_by_id(&self, chip: ChipHandle, id: PinId) -> Option<PinHandle> {
        let c = &self[chip];
        c.inputs
            .iter()
            .chain(c.outputs.iter())
            .chain(c.freeze_pin.iter())
            .copied()
            .find(|&p| self[p].id == id)
    }

    /// Resolves a path from the root chip.
    pub fn find_chip(&self, path: &ChipPath) -> Result<ChipHandle> {
        let mut current = self.root.ok_or_else(|| SimError::ChipNotFound {
            path: ChipPath::root().to_string(),
            chip: path.0.first().copied().unwrap_or_default(),
        })?;
        for (depth, &id) in path.0.iter().enumerate() {
            current = self
                .child_by_id(current, id)
                .ok_or_else(|| SimError::ChipNotFound {
                    path: ChipPath(path.0[..depth].to_vec()).to_string(),
                    chip: id,
                })?;
        }
        Ok(current)
    }

    /// Resolves a pin address from the root chip.
    pub fn find_pin(&self, address: &PinAddress) -> Result<PinHandle> {
        let chip = self.find_chip(&address.chip)?;
        self.pin_by_id(chip, address.pin)
            .ok_or_else(|| SimError::PinNotFound {
                path: address.chip.to_string(),
                pin: address.pin,
            })
    }

    /// Current state of the pin at `address`, if it exists.
    pub fn pin_state(&self, address: &PinAddress) -> Option<PinState> {
        self.find_pin(address).ok().map(|p| self[p].state)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Adds a pin to `chip`.
    ///
    /// An input pin with id `FREEZE_PIN_ID` becomes the chip's freeze pin
    /// rather than a data input.
    ///
    /// # Errors
    ///
    /// `DuplicatePinId` if the chip already has a pin with this id.
    pub fn add_pin(
        &mut self,
        chip: ChipHandle,
        id: PinId,
        is_input: bool,
        bit_count: u8,
    ) -> Result<PinHandle> {
        if self.pin_by_id(chip, id).is_some() {
            return Err(SimError::DuplicatePinId {
                chip: self[chip].name.clone(),
                pin: id,
            });
        }
        let handle = self.insert_pin(SimPin::new(id, is_input, bit_count, chip));
        let owner = &mut self[chip];
        if is_input && id == FREEZE_PIN_ID {
            owner.freeze_pin = Some(handle);
        } else if is_input {
            owner.inputs.push(handle);
        } else {
            owner.outputs.push(handle);
        }
        Ok(handle)
    }

    /// Removes a pin together with every connection into or out of it.
    pub fn remove_pin(&mut self, pin: PinHandle) {
        self.disconnect_all(pin);
        let owner = self[pin].owner;
        let chip = &mut self[owner];
        chip.inputs.retain(|&p| p != pin);
        chip.outputs.retain(|&p| p != pin);
        if chip.freeze_pin == Some(pin) {
            chip.freeze_pin = None;
        }
        self.pins[pin.0] = None;
        self.free_pins.push(pin.0);
    }

    /// Attaches `child` under `parent`.
    ///
    /// The child is placed at the front of the stored order, so the fast
    /// pass visits it last until the next reorder pass.
    pub fn add_child(&mut self, parent: ChipHandle, child: ChipHandle) {
        self[child].parent = Some(parent);
        self[parent].children.insert(0, child);
        if self[child].changes_spontaneously {
            self.mark_spontaneous(parent);
        }
    }

    /// Detaches `child` from its parent and frees its whole subtree.
    pub fn remove_child(&mut self, child: ChipHandle) {
        if let Some(parent) = self[child].parent {
            self[parent].children.retain(|&c| c != child);
            self.refresh_spontaneous(parent);
        }
        self.free_subtree(child);
    }

    fn free_subtree(&mut self, chip: ChipHandle) {
        let children = std::mem::take(&mut self[chip].children);
        for child in children {
            self.free_subtree(child);
        }
        let pins: Vec<PinHandle> = self[chip]
            .all_inputs()
            .chain(self[chip].outputs.iter().copied())
            .collect();
        for pin in pins {
            self.remove_pin(pin);
        }
        self.chips[chip.0] = None;
        self.free_chips.push(chip.0);
        if self.root == Some(chip) {
            self.root = None;
        }
    }

    /// Wires `source` to drive `target`. Parallel wires are allowed.
    pub fn connect(&mut self, source: PinHandle, target: PinHandle) {
        self[source].targets.push(target);
        let target_pin = &mut self[target];
        target_pin.num_input_connections += 1;
        if target_pin.is_input && target_pin.num_input_connections == 1 {
            let owner = target_pin.owner;
            self[owner].num_connected_inputs += 1;
        }
        trace!("connect pin {:?} -> {:?}", source, target);
    }

    /// Removes one wire from `source` to `target`.
    ///
    /// # Returns
    ///
    /// `false` if no such wire existed.
    pub fn disconnect(&mut self, source: PinHandle, target: PinHandle) -> bool {
        let targets = &mut self[source].targets;
        let Some(index) = targets.iter().position(|&t| t == target) else {
            return false;
        };
        targets.remove(index);
        self.drop_driver(target);
        true
    }

    fn drop_driver(&mut self, target: PinHandle) {
        let target_pin = &mut self[target];
        target_pin.num_input_connections = target_pin.num_input_connections.saturating_sub(1);
        if target_pin.num_input_connections == 0 {
            target_pin.state.set_all_disconnected();
            if target_pin.is_input {
                let owner = target_pin.owner;
                let chip = &mut self[owner];
                chip.num_connected_inputs = chip.num_connected_inputs.saturating_sub(1);
            }
        }
    }

    fn disconnect_all(&mut self, pin: PinHandle) {
        let targets = std::mem::take(&mut self[pin].targets);
        for target in targets {
            if self.get_pin(target).is_some() {
                self.drop_driver(target);
            }
        }
        if self[pin].num_input_connections == 0 {
            return;
        }
        for slot in 0..self.pins.len() {
            let Some(source) = self.pins[slot].as_mut() else {
                continue;
            };
            let before = source.targets.len();
            source.targets.retain(|&t| t != pin);
            let removed = before - source.targets.len();
            for _ in 0..removed {
                self.drop_driver(pin);
            }
        }
    }

    /// Marks `chip` and its ancestors as containing a spontaneous chip.
    fn mark_spontaneous(&mut self, chip: ChipHandle) {
        let mut current = Some(chip);
        while let Some(handle) = current {
            if self[handle].changes_spontaneously {
                break;
            }
            self[handle].changes_spontaneously = true;
            current = self[handle].parent;
        }
    }

    /// Recomputes the spontaneous flag of `chip` and its ancestors after a
    /// child was removed.
    fn refresh_spontaneous(&mut self, chip: ChipHandle) {
        let mut current = Some(chip);
        while let Some(handle) = current {
            let own = self[handle].kind.changes_spontaneously();
            let from_children = self[handle]
                .children
                .iter()
                .any(|&c| self[c].changes_spontaneously);
            self[handle].changes_spontaneously = own || from_children;
            current = self[handle].parent;
        }
    }

    // ------------------------------------------------------------------
    // Signal flow
    // ------------------------------------------------------------------

    /// Forwards a pin's state to every pin it drives.
    pub fn propagate_pin(
        &mut self,
        pin: PinHandle,
        frame: u64,
        rng: &mut dyn RngCore,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        let state = self[pin].state;
        let count = self[pin].targets.len();
        for i in 0..count {
            let target = self[pin].targets[i];
            let reception = self[target].receive(state, pin, frame, rng);
            report.deliveries += 1;
            if reception.contested {
                report.contested += 1;
            }
            if reception.completed {
                let owner = self[target].owner;
                let chip = &mut self[owner];
                if chip.ready_frame != frame {
                    chip.ready_frame = frame;
                    chip.num_inputs_ready = 0;
                }
                chip.num_inputs_ready += 1;
            }
        }
        report
    }

    /// Forwards every data input of `chip` to the pins it drives.
    pub fn propagate_inputs(
        &mut self,
        chip: ChipHandle,
        frame: u64,
        rng: &mut dyn RngCore,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        for i in 0..self[chip].inputs.len() {
            let pin = self[chip].inputs[i];
            report.absorb(self.propagate_pin(pin, frame, rng));
        }
        report
    }

    /// Forwards every output of `chip` and resets its ready counter for the
    /// next frame.
    pub fn propagate_outputs(
        &mut self,
        chip: ChipHandle,
        frame: u64,
        rng: &mut dyn RngCore,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        for i in 0..self[chip].outputs.len() {
            let pin = self[chip].outputs[i];
            report.absorb(self.propagate_pin(pin, frame, rng));
        }
        self[chip].num_inputs_ready = 0;
        report
    }

    /// Input states of `chip` in declaration order, written into `buf`.
    pub fn read_inputs(&self, chip: ChipHandle, buf: &mut Vec<PinState>) {
        buf.clear();
        buf.extend(self[chip].inputs.iter().map(|&p| self[p].state));
    }

    /// Writes built-in results to the outputs of `chip`, masked to each
    /// pin's width.
    pub fn write_outputs(&mut self, chip: ChipHandle, states: &[PinState]) {
        for i in 0..self[chip].outputs.len().min(states.len()) {
            let pin = self[chip].outputs[i];
            let bits = self[pin].bit_count;
            self[pin].state = states[i].masked(bits);
        }
    }

    /// Kind of the chip behind `handle`.
    pub fn kind(&self, handle: ChipHandle) -> ChipKind {
        self[handle].kind
    }
}
