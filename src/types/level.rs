// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analog level type.
//!
//! A [`Level`] is the single analog value a device carries. Its meaning
//! depends on the device kind (brightness, fan speed, temperature set-point)
//! but its range never does: every constructor clamps to 0-100, so a level
//! outside that range cannot exist.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Analog value in the range 0-100.
///
/// # Examples
///
/// ```
/// use hearthlink::types::Level;
///
/// assert_eq!(Level::clamped(-5).value(), 0);
/// assert_eq!(Level::clamped(500).value(), 100);
/// assert_eq!(Level::clamped(42).value(), 42);
///
/// assert!(Level::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Lowest level.
    pub const MIN: Self = Self(0);

    /// Highest level.
    pub const MAX: Self = Self(100);

    /// Creates a level, rejecting values outside 0-100.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is outside 0-100.
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(0..=100).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: value,
            });
        }
        Ok(Self::clamped(value))
    }

    /// Creates a level, clamping to the valid range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamped(value: i64) -> Self {
        // Safe: clamp guarantees 0..=100
        Self(value.clamp(0, 100) as u8)
    }

    /// Creates a level from a fractional reading, rounding to the nearest
    /// integer before clamping. Non-finite readings become 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_reading(reading: f64) -> Self {
        if !reading.is_finite() {
            return Self::MIN;
        }
        // Safe: value is clamped right after the conversion
        Self::clamped(reading.round().clamp(-1.0, 101.0) as i64)
    }

    /// Returns the level value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}
