//! Identifiers and Addresses.
//!
//! Chips and pins carry numeric identifiers that are unique within their
//! parent chip. Code outside the evaluator (editors, input samplers, tests)
//! names things by path from the root chip, since arena handles are private
//! to the evaluation thread.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a pin, unique within its owning chip.
pub type PinId = u32;

/// Identifier of a chip, unique among its siblings.
pub type ChipId = u32;

/// Reserved pin identity of the freeze control input.
///
/// It never appears in a chip's declared data pins.
pub const FREEZE_PIN_ID: PinId = u32::MAX;

/// Route from the root chip to a descendant, as a list of child ids.
///
/// An empty path names the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChipPath(pub Vec<ChipId>);

impl ChipPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns the path of the child `id` below this chip.
    pub fn child(&self, id: ChipId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the enclosing chip, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }
}

impl fmt::Display for ChipPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", parts.join("/"))
    }
}

impl From<Vec<ChipId>> for ChipPath {
    fn from(ids: Vec<ChipId>) -> Self {
        Self(ids)
    }
}

/// Full address of a pin: the owning chip's path plus the pin id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinAddress {
    pub chip: ChipPath,
    pub pin: PinId,
}

impl PinAddress {
    pub fn new(chip: impl Into<ChipPath>, pin: PinId) -> Self {
        Self {
            chip: chip.into(),
            pin,
        }
    }

    /// Address of a pin on the root chip.
    pub fn root(pin: PinId) -> Self {
        Self::new(ChipPath::root(), pin)
    }
}

impl fmt::Display for PinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.chip, self.pin)
    }
}
