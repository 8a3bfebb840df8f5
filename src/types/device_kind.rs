// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Closed set of appliance categories.
///
/// The category decides what the analog [`Level`](super::Level) means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// A light with adjustable brightness.
    #[serde(rename = "LIGHT")]
    DimmableLight,
    /// A fan with adjustable speed.
    #[serde(rename = "FAN")]
    VariableFan,
    /// An AC unit; the level is the temperature set-point.
    #[serde(rename = "AC")]
    Thermostat,
    /// A plain on/off switch.
    #[serde(rename = "SWITCH")]
    Switch,
}

impl DeviceKind {
    /// Returns the wire name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DimmableLight => "LIGHT",
            Self::VariableFan => "FAN",
            Self::Thermostat => "AC",
            Self::Switch => "SWITCH",
        }
    }

    /// Returns what the analog level controls for this category.
    #[must_use]
    pub fn level_meaning(self) -> &'static str {
        match self {
            Self::DimmableLight => "brightness",
            Self::VariableFan => "speed",
            Self::Thermostat => "set-point",
            Self::Switch => "level",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIGHT" => Ok(Self::DimmableLight),
            "FAN" => Ok(Self::VariableFan),
            "AC" => Ok(Self::Thermostat),
            "SWITCH" => Ok(Self::Switch),
            _ => Err(ValueError::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("light".parse::<DeviceKind>().unwrap(), DeviceKind::DimmableLight);
        assert_eq!("Ac".parse::<DeviceKind>().unwrap(), DeviceKind::Thermostat);
        assert!("heater".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&DeviceKind::VariableFan).unwrap();
        assert_eq!(json, "\"FAN\"");
    }
}
