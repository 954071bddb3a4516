//! Common types used throughout the circuit simulator.
//!
//! This module provides the signal word codec, chip and pin identifiers,
//! and the error type shared by the builder, the evaluator, and the
//! assembler.

/// Chip and pin identifiers and path-based addresses.
pub mod ids;

/// Error taxonomy and result alias.
pub mod error;

/// Tri-state signal word codec.
pub mod pin_state;

pub use error::{Result, SimError};
pub use ids::{ChipId, ChipPath, PinAddress, PinId, FREEZE_PIN_ID};
pub use pin_state::{width_mask, PinState, FIRST_BIT_MASK, MAX_BIT_COUNT};
