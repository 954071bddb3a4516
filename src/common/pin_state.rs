//! Tri-State Signal Words.
//!
//! A `PinState` is the value carried by one pin: a value plane holding one bit
//! per bit-line and a tristate plane marking bit-lines that are disconnected
//! (floating). A bit-line only carries a valid 0/1 when its tristate bit is 0.
//!
//! Both planes are 64 bits wide, so every supported pin width (1 to 64 bits)
//! can represent per-bit disconnection.

/// Maximum number of bit-lines a single pin can carry.
pub const MAX_BIT_COUNT: u8 = 64;

/// Mask isolating bit-line 0 of either plane, used by single-bit pins.
pub const FIRST_BIT_MASK: u64 = 1;

/// Packed value and tristate planes of a single pin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PinState {
    value: u64,
    tristate: u64,
}

impl PinState {
    /// All bit-lines driven low.
    pub const LOW: PinState = PinState::pack(0, 0);

    /// Bit-line 0 driven high, every other line low.
    pub const HIGH: PinState = PinState::pack(1, 0);

    /// Every bit-line floating.
    pub const DISCONNECTED: PinState = PinState::pack(0, u64::MAX);

    /// Combines a value plane and a tristate plane into a signal word.
    ///
    /// Value bits under a set tristate bit are cleared so that equal
    /// signals always compare equal.
    pub const fn pack(value: u64, tristate: u64) -> Self {
        Self {
            value: value & !tristate,
            tristate,
        }
    }

    /// Splits the signal word into `(value, tristate)` planes.
    pub const fn unpack(self) -> (u64, u64) {
        (self.value, self.tristate)
    }

    /// Creates a fully driven word holding `value`.
    pub const fn from_value(value: u64) -> Self {
        Self::pack(value, 0)
    }

    /// Creates a single-bit word.
    pub const fn from_bool(high: bool) -> Self {
        if high {
            Self::HIGH
        } else {
            Self::LOW
        }
    }

    pub const fn value(self) -> u64 {
        self.value
    }

    pub const fn tristate(self) -> u64 {
        self.tristate
    }

    /// Value plane with floating lines read as logic low.
    ///
    /// Gates and arithmetic components use this view of their inputs.
    pub const fn driven_value(self) -> u64 {
        self.value & !self.tristate
    }

    /// Marks every bit-line as floating.
    pub fn set_all_disconnected(&mut self) {
        *self = Self::DISCONNECTED;
    }

    /// Flips one bit-line and marks it as driven.
    ///
    /// Only player-driven input pins are toggled, and toggling always
    /// connects the line. Indices at or above 64 are ignored.
    pub fn toggle_bit(&mut self, bit: u8) {
        if bit >= MAX_BIT_COUNT {
            return;
        }
        let mask = 1u64 << bit;
        let was_high = self.bit(bit) == Some(true);
        self.tristate &= !mask;
        if was_high {
            self.value &= !mask;
        } else {
            self.value |= mask;
        }
    }

    /// Reads one bit-line.
    ///
    /// # Returns
    ///
    /// `None` if the line is disconnected or the index is out of range.
    pub fn bit(self, bit: u8) -> Option<bool> {
        if bit >= MAX_BIT_COUNT {
            return None;
        }
        let mask = 1u64 << bit;
        if self.tristate & mask != 0 {
            None
        } else {
            Some(self.value & mask != 0)
        }
    }

    /// True when bit-line 0 is driven high.
    pub const fn first_bit_high(self) -> bool {
        (self.value & FIRST_BIT_MASK) != 0 && (self.tristate & FIRST_BIT_MASK) == 0
    }

    /// True when all of the lowest `bit_count` lines are floating.
    pub fn is_fully_disconnected(self, bit_count: u8) -> bool {
        let mask = width_mask(bit_count);
        self.tristate & mask == mask
    }

    /// Clears every bit-line above `bit_count` in both planes.
    pub fn masked(self, bit_count: u8) -> Self {
        let mask = width_mask(bit_count);
        Self::pack(self.value & mask, self.tristate & mask)
    }

    /// Extracts sub-field `index` of width `field_bits` from a word of
    /// `total_bits`, counting from the most-significant field.
    ///
    /// Out-of-range fields come back fully disconnected.
    pub fn field(self, total_bits: u8, field_bits: u8, index: u8) -> Self {
        if field_bits == 0 || total_bits > MAX_BIT_COUNT {
            return Self::DISCONNECTED;
        }
        let count = total_bits / field_bits;
        if index >= count {
            return Self::DISCONNECTED;
        }
        let shift = (count - 1 - index) as u32 * field_bits as u32;
        let mask = width_mask(field_bits);
        Self::pack(
            (self.value >> shift) & mask,
            (self.tristate >> shift) & mask,
        )
    }

    /// Concatenates narrow words into one wide word, most-significant first.
    pub fn combine(fields: &[PinState], field_bits: u8) -> Self {
        let mask = width_mask(field_bits);
        let mut value = 0u64;
        let mut tristate = 0u64;
        for field in fields {
            value = value.checked_shl(field_bits as u32).unwrap_or(0) | (field.value & mask);
            tristate =
                tristate.checked_shl(field_bits as u32).unwrap_or(0) | (field.tristate & mask);
        }
        Self::pack(value, tristate)
    }
}

/// Mask covering the lowest `bit_count` bit-lines.
pub const fn width_mask(bit_count: u8) -> u64 {
    if bit_count >= MAX_BIT_COUNT {
        u64::MAX
    } else {
        (1u64 << bit_count) - 1
    }
}
