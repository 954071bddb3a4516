//! Simulator Error Types.
//!
//! Errors fall into four groups. Transient structural desync (`PinNotFound`,
//! `ChipNotFound`) is skipped for the current frame by its callers.
//! Configuration errors (`DuplicatePinId`, `InvalidWire`, `RecursiveChip`,
//! `UnknownChip`) reject a chip description at construction. Arithmetic edge
//! cases never surface here; they resolve to defined fallback values inside
//! the built-in components.

use thiserror::Error;

use super::ids::{ChipId, PinId};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Every failure the simulator reports.
#[derive(Debug, Error)]
pub enum SimError {
    /// Two pins in one chip description share an identifier.
    #[error("chip '{chip}' declares pin id {pin} more than once")]
    DuplicatePinId { chip: String, pin: PinId },

    /// A sub-chip references a name that is neither built in nor in the library.
    #[error("unknown chip '{0}'")]
    UnknownChip(String),

    /// A custom chip contains itself, directly or through descendants.
    #[error("chip '{0}' contains itself")]
    RecursiveChip(String),

    /// A wire in a chip description points at a pin that does not exist.
    #[error("chip '{chip}' has a wire with a missing endpoint: {detail}")]
    InvalidWire { chip: String, detail: String },

    /// A pin lookup failed, usually because the circuit is mid-edit.
    #[error("pin {pin} not found on chip at {path}")]
    PinNotFound { path: String, pin: PinId },

    /// A chip lookup failed, usually because the circuit is mid-edit.
    #[error("chip {chip} not found under {path}")]
    ChipNotFound { path: String, chip: ChipId },

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A chip library document could not be parsed.
    #[error("invalid chip library: {0}")]
    Library(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Assembly source was rejected.
    #[error("line {line}: {message}")]
    Assembly { line: usize, message: String },
}

impl SimError {
    /// True for lookup failures caused by a concurrent structural edit.
    ///
    /// These are skipped for one frame instead of aborting the simulation.
    pub fn is_transient(&self) -> bool {
        matches!(self, SimError::PinNotFound { .. } | SimError::ChipNotFound { .. })
    }
}
