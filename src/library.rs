//! Chip Library.
//!
//! Declarative descriptions of custom chips, as handed over by an editor or
//! loaded from a JSON file. A description lists the chip's own pins, the
//! sub-chips it contains (by library or built-in name, with an optional
//! internal-state seed) and the wires between them.
//!
//! ```json
//! {
//!   "chips": [{
//!     "name": "BUFFER",
//!     "input_pins":  [{ "id": 0, "name": "IN" }],
//!     "output_pins": [{ "id": 1, "name": "OUT" }],
//!     "sub_chips":   [{ "id": 1, "name": "AND" }],
//!     "wires": [
//!       { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 0 } },
//!       { "source": { "pin": 0 }, "target": { "chip": 1, "pin": 1 } },
//!       { "source": { "chip": 1, "pin": 2 }, "target": { "pin": 1 } }
//!     ]
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{ChipId, PinId, Result};

fn default_bit_count() -> u8 {
    1
}

/// One pin of a custom chip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDescription {
    pub id: PinId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_bit_count")]
    pub bit_count: u8,
}

/// One chip placed inside a custom chip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubChipDescription {
    /// Unique among the siblings.
    pub id: ChipId,
    /// Built-in name (`"AND-8"`, `"RAM-8"`, ...) or library name.
    pub name: String,
    /// Persisted internal state, e.g. ROM contents or a key binding.
    #[serde(default)]
    pub internal_data: Option<Vec<u32>>,
}

/// One end of a wire. Without `chip` the pin belongs to the described chip
/// itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnd {
    #[serde(default)]
    pub chip: Option<ChipId>,
    pub pin: PinId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDescription {
    pub source: WireEnd,
    pub target: WireEnd,
}

/// Blueprint of a custom chip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipDescription {
    pub name: String,
    #[serde(default)]
    pub input_pins: Vec<PinDescription>,
    #[serde(default)]
    pub output_pins: Vec<PinDescription>,
    #[serde(default)]
    pub sub_chips: Vec<SubChipDescription>,
    #[serde(default)]
    pub wires: Vec<WireDescription>,
}

#[derive(Deserialize)]
struct LibraryFile {
    chips: Vec<ChipDescription>,
}

/// Custom chip descriptions by name. Names are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct ChipLibrary {
    chips: BTreeMap<String, ChipDescription>,
}

fn library_key(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

impl ChipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a library document of the form `{ "chips": [...] }`.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: LibraryFile = serde_json::from_str(text)?;
        let mut library = Self::new();
        for chip in file.chips {
            library.insert(chip);
        }
        Ok(library)
    }

    /// Reads and parses a library file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Adds or replaces a description.
    pub fn insert(&mut self, description: ChipDescription) {
        self.chips.insert(library_key(&description.name), description);
    }

    pub fn get(&self, name: &str) -> Option<&ChipDescription> {
        self.chips.get(&library_key(name))
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.chips.values().map(|c| c.name.as_str())
    }
}
