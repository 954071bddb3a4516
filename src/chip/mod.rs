//! Circuit structure: pins, chip instances, the arena that owns them, and
//! the builder that instantiates chip trees from library descriptions.

/// Chip-tree construction from descriptions.
pub mod builder;

/// Arena owning every pin and chip of a circuit.
pub mod circuit;

/// Chip kind tags, built-in names and pin layouts.
pub mod kind;

/// Wire endpoints and multi-driver resolution.
pub mod pin;

/// Chip instance nodes.
pub mod sim_chip;

pub use builder::ChipBuilder;
pub use circuit::{ChipHandle, Circuit, PinHandle, PropagationReport};
pub use kind::{ChipKind, GateOp, PinSpec};
pub use pin::{Reception, SimPin};
pub use sim_chip::SimChip;
