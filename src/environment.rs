// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ambient environment reading.
//!
//! Temperature arrives from short-range hardware as `T:<celsius>` lines.
//! While demo mode is on, an optional drift task nudges both values so the
//! reading looks alive without hardware.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix of temperature report lines.
const TEMPERATURE_PREFIX: &str = "T:";

/// Ambient temperature and humidity.
///
/// # Examples
///
/// ```
/// use hearthlink::environment::Environment;
///
/// let env = Environment::default();
/// assert_eq!(env.temperature, 24.5);
///
/// assert_eq!(Environment::parse_temperature_line(" T:21.75 "), Some(21.75));
/// assert_eq!(Environment::parse_temperature_line("L1:ON"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature: 24.5,
            humidity: 45.0,
        }
    }
}

impl Environment {
    /// Maximum temperature change per drift step.
    pub const TEMPERATURE_DRIFT: f32 = 0.2;

    /// Maximum humidity change per drift step.
    pub const HUMIDITY_DRIFT: f32 = 1.0;

    /// Default period of the demo drift task.
    pub const DEFAULT_DRIFT_INTERVAL: Duration = Duration::from_secs(5);

    /// Parses a `T:<float>` temperature report.
    ///
    /// Returns `None` for any other line and for unparsable or non-finite
    /// numbers.
    #[must_use]
    pub fn parse_temperature_line(line: &str) -> Option<f32> {
        line.trim()
            .strip_prefix(TEMPERATURE_PREFIX)?
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite())
    }

    /// Returns a copy with a new temperature.
    #[must_use]
    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature,
            ..self
        }
    }

    /// Returns the next simulated reading.
    ///
    /// Temperature moves by at most [`TEMPERATURE_DRIFT`](Self::TEMPERATURE_DRIFT)
    /// and is rounded to one decimal; humidity moves by at most
    /// [`HUMIDITY_DRIFT`](Self::HUMIDITY_DRIFT), is floored and stays within
    /// 0-100.
    #[must_use]
    pub fn drifted<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let temperature = self.temperature
            + rng.gen_range(-Self::TEMPERATURE_DRIFT..=Self::TEMPERATURE_DRIFT);
        let humidity =
            self.humidity + rng.gen_range(-Self::HUMIDITY_DRIFT..=Self::HUMIDITY_DRIFT);

        Self {
            temperature: (temperature * 10.0).round() / 10.0,
            humidity: humidity.floor().clamp(0.0, 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn temperature_lines() {
        assert_eq!(Environment::parse_temperature_line("T:19"), Some(19.0));
        assert_eq!(Environment::parse_temperature_line("T: -3.5"), Some(-3.5));
        assert_eq!(Environment::parse_temperature_line("T:abc"), None);
        assert_eq!(Environment::parse_temperature_line("T:NaN"), None);
        assert_eq!(Environment::parse_temperature_line("H:40"), None);
        assert_eq!(Environment::parse_temperature_line(""), None);
    }

    #[test]
    fn with_temperature_keeps_humidity() {
        let env = Environment::default().with_temperature(30.0);
        assert_eq!(env.temperature, 30.0);
        assert_eq!(env.humidity, 45.0);
    }

    #[test]
    fn drift_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut env = Environment::default();

        for _ in 0..200 {
            let next = env.drifted(&mut rng);
            assert!((next.temperature - env.temperature).abs() <= 0.25);
            assert!((next.humidity - env.humidity).abs() <= 2.0);
            assert!((0.0..=100.0).contains(&next.humidity));
            assert_eq!((next.temperature * 10.0).round() / 10.0, next.temperature);
            env = next;
        }
    }
}
