//! Player Input.
//!
//! A front end writes key, mouse and pin values into a shared `InputState`
//! through an `InputHandle`. The evaluator copies the whole state once at
//! the start of every frame and reads only that snapshot, so input changes
//! made mid-frame show up on the next frame.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common::{PinId, PinState};

/// Held-key name of the left mouse button.
pub const MOUSE_LEFT: &str = "MOUSE_LEFT";
/// Held-key name of the right mouse button.
pub const MOUSE_RIGHT: &str = "MOUSE_RIGHT";

/// Snapshot of everything the player is doing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    held_keys: BTreeSet<String>,
    mouse_x: u8,
    mouse_y: u8,
    /// Values the player drives onto the root chip's input pins.
    pin_values: BTreeMap<PinId, PinState>,
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as held or released. Key names are case-insensitive.
    pub fn set_key(&mut self, key: &str, held: bool) {
        let key = normalize_key(key);
        if held {
            self.held_keys.insert(key);
        } else {
            self.held_keys.remove(&key);
        }
    }

    pub fn is_key_held(&self, key: &str) -> bool {
        self.held_keys.contains(&normalize_key(key))
    }

    /// Held key names in sorted order.
    pub fn held_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.held_keys.iter().map(String::as_str)
    }

    pub fn set_mouse(&mut self, x: u8, y: u8) {
        self.mouse_x = x;
        self.mouse_y = y;
    }

    pub fn mouse_x(&self) -> u8 {
        self.mouse_x
    }

    pub fn mouse_y(&self) -> u8 {
        self.mouse_y
    }

    /// Sets the value driven onto root input pin `pin`.
    pub fn set_pin(&mut self, pin: PinId, state: PinState) {
        self.pin_values.insert(pin, state);
    }

    /// Stops driving root input pin `pin`; it keeps its last value.
    pub fn clear_pin(&mut self, pin: PinId) {
        self.pin_values.remove(&pin);
    }

    /// Flips one bit of a driven root input, starting from low if the pin
    /// was not driven yet.
    pub fn toggle_pin_bit(&mut self, pin: PinId, bit: u8) {
        self.pin_values
            .entry(pin)
            .or_insert(PinState::LOW)
            .toggle_bit(bit);
    }

    pub fn pin_values(&self) -> impl Iterator<Item = (PinId, PinState)> + '_ {
        self.pin_values.iter().map(|(&id, &state)| (id, state))
    }
}

/// Shared, thread-safe access to the live input state.
#[derive(Clone, Debug, Default)]
pub struct InputHandle {
    inner: Arc<Mutex<InputState>>,
}

impl InputHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InputState> {
        // Poisoned locks are taken over as-is.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `f` to the live state under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut InputState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copies the live state into `snapshot`.
    pub fn snapshot_into(&self, snapshot: &mut InputState) {
        snapshot.clone_from(&self.lock());
    }

    pub fn snapshot(&self) -> InputState {
        self.lock().clone()
    }
}
