//! Structural Mutation Queue.
//!
//! Editors never touch the live circuit. They send `SimCommand`s through a
//! cloneable `CommandSender`; the simulator drains the queue at the start of
//! each frame on its own thread, applies commands in arrival order and then
//! forces a reorder pass.
//!
//! Addresses in commands are paths of chip ids from the root, so they stay
//! meaningful across threads. A command whose target has disappeared (the
//! editor raced a removal) is skipped with a log line rather than treated as
//! fatal.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::chip::{ChipBuilder, Circuit};
use crate::common::{ChipId, ChipPath, PinAddress, PinId, Result, SimError};

/// One structural edit of the live circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimCommand {
    AddPin {
        chip: ChipPath,
        pin_id: PinId,
        is_input: bool,
        bit_count: u8,
    },
    RemovePin {
        pin: PinAddress,
    },
    AddSubChip {
        parent: ChipPath,
        id: ChipId,
        name: String,
        internal_data: Option<Vec<u32>>,
    },
    RemoveSubChip {
        path: ChipPath,
    },
    AddConnection {
        source: PinAddress,
        target: PinAddress,
    },
    RemoveConnection {
        source: PinAddress,
        target: PinAddress,
    },
}

/// Producer side of the queue. Cheap to clone; one per editor.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: Sender<SimCommand>,
}

impl CommandSender {
    /// Enqueues a command.
    ///
    /// # Returns
    ///
    /// `false` if the simulator has been dropped.
    pub fn send(&self, command: SimCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Consumer side, owned by the simulator.
#[derive(Debug)]
pub struct CommandQueue {
    rx: Receiver<SimCommand>,
}

impl CommandQueue {
    /// Takes every command queued so far without blocking.
    pub fn drain(&self) -> impl Iterator<Item = SimCommand> + '_ {
        self.rx.try_iter()
    }
}

/// Creates a connected sender and queue.
pub fn channel() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::channel();
    (CommandSender { tx }, CommandQueue { rx })
}

impl SimCommand {
    /// Applies the command to `circuit`.
    ///
    /// # Errors
    ///
    /// `ChipNotFound`/`PinNotFound` when an address no longer resolves;
    /// `DuplicatePinId`, `UnknownChip`, `RecursiveChip` or `InvalidWire`
    /// when the edit itself is malformed. The circuit is unchanged on error.
    pub fn apply(&self, circuit: &mut Circuit, builder: &ChipBuilder<'_>) -> Result<()> {
        match self {
            SimCommand::AddPin {
                chip,
                pin_id,
                is_input,
                bit_count,
            } => {
                let handle = circuit.find_chip(chip)?;
                circuit.add_pin(handle, *pin_id, *is_input, *bit_count)?;
            }
            SimCommand::RemovePin { pin } => {
                let handle = circuit.find_pin(pin)?;
                circuit.remove_pin(handle);
            }
            SimCommand::AddSubChip {
                parent,
                id,
                name,
                internal_data,
            } => {
                let parent_handle = circuit.find_chip(parent)?;
                if circuit.child_by_id(parent_handle, *id).is_some() {
                    return Err(SimError::InvalidWire {
                        chip: parent.to_string(),
                        detail: format!("sub-chip id {} already in use", id),
                    });
                }
                let child = builder.instantiate(circuit, *id, name, internal_data.as_deref())?;
                circuit.add_child(parent_handle, child);
            }
            SimCommand::RemoveSubChip { path } => {
                if path.is_root() {
                    return Err(SimError::InvalidWire {
                        chip: path.to_string(),
                        detail: "the root chip cannot be removed".to_string(),
                    });
                }
                let handle = circuit.find_chip(path)?;
                circuit.remove_child(handle);
            }
            SimCommand::AddConnection { source, target } => {
                let src = circuit.find_pin(source)?;
                let tgt = circuit.find_pin(target)?;
                let src_scope = wire_scope(source, circuit[src].is_input, End::Source);
                let tgt_scope = wire_scope(target, circuit[tgt].is_input, End::Target);
                match (src_scope, tgt_scope) {
                    (Some(a), Some(b)) if a == b => circuit.connect(src, tgt),
                    _ => {
                        return Err(SimError::InvalidWire {
                            chip: source.chip.to_string(),
                            detail: format!("{} cannot drive {} inside one chip", source, target),
                        })
                    }
                }
            }
            SimCommand::RemoveConnection { source, target } => {
                let src = circuit.find_pin(source)?;
                let tgt = circuit.find_pin(target)?;
                if !circuit.disconnect(src, tgt) {
                    return Err(SimError::InvalidWire {
                        chip: source.chip.to_string(),
                        detail: format!("no wire from {} to {}", source, target),
                    });
                }
            }
        }
        Ok(())
    }

    /// Chips whose structure the command changes.
    ///
    /// Their input histories and those of every ancestor no longer describe
    /// the circuit once the command applies.
    pub fn affected_chips(&self) -> Vec<&ChipPath> {
        match self {
            SimCommand::AddPin { chip, .. } => vec![chip],
            SimCommand::RemovePin { pin } => vec![&pin.chip],
            SimCommand::AddSubChip { parent, .. } => vec![parent],
            SimCommand::RemoveSubChip { path } => vec![path],
            SimCommand::AddConnection { source, target }
            | SimCommand::RemoveConnection { source, target } => vec![&source.chip, &target.chip],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum End {
    Source,
    Target,
}

/// The chip whose wiring a wire end belongs to.
///
/// A source is that chip's own input or a sub-chip's output; a target is
/// its own output or a sub-chip's input. `None` when the end names a pin of
/// the root from outside.
fn wire_scope(end: &PinAddress, is_input: bool, role: End) -> Option<ChipPath> {
    let own = match role {
        End::Source => is_input,
        End::Target => !is_input,
    };
    if own {
        Some(end.chip.clone())
    } else {
        end.chip.parent()
    }
}
