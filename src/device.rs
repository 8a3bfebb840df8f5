// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device definitions.
//!
//! A [`Device`] is the registry's view of one appliance. Devices are created
//! from a [`DeviceSpec`] (off, level 0) or seeded from [`default_devices`];
//! transports never create or destroy them.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::{DeviceId, DeviceKind, Level};

/// Marker inserted between the command prefix and the value in analog
/// text commands (`L1:VAL:75`).
const VALUE_MARKER: &str = "VAL";

/// An appliance tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable identifier.
    pub id: DeviceId,
    /// Display name.
    pub name: String,
    /// Category.
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Room the device belongs to.
    #[serde(rename = "roomId")]
    pub room: String,
    /// Current power state.
    pub is_on: bool,
    /// Current analog level.
    pub value: Level,
    /// Text sent over byte-stream transports to switch the device on.
    pub on_command: String,
    /// Text sent over byte-stream transports to switch the device off.
    pub off_command: String,
}

impl Device {
    /// Returns the text command for the given power state.
    #[must_use]
    pub fn power_command(&self, on: bool) -> &str {
        if on { &self.on_command } else { &self.off_command }
    }

    /// Returns the prefix token of the on-command (`L1` for `L1:ON`).
    #[must_use]
    pub fn command_prefix(&self) -> &str {
        self.on_command
            .split(':')
            .next()
            .unwrap_or(self.on_command.as_str())
    }

    /// Returns the text command that sets the analog level.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearthlink::{DeviceSpec, DeviceKind};
    /// use hearthlink::types::Level;
    ///
    /// let device = DeviceSpec::new("Desk", DeviceKind::DimmableLight, "office")
    ///     .with_commands("D1:ON", "D1:OFF")
    ///     .into_device()
    ///     .unwrap();
    /// assert_eq!(device.value_command(Level::clamped(40)), "D1:VAL:40");
    /// ```
    #[must_use]
    pub fn value_command(&self, value: Level) -> String {
        format!("{}:{VALUE_MARKER}:{value}", self.command_prefix())
    }
}

/// Parameters for adding a device.
///
/// # Examples
///
/// ```
/// use hearthlink::{DeviceKind, DeviceSpec};
///
/// let spec = DeviceSpec::new("Lamp", DeviceKind::DimmableLight, "office")
///     .with_commands("LP:ON", "LP:OFF");
/// assert_eq!(spec.name(), "Lamp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    name: String,
    kind: DeviceKind,
    room: String,
    on_command: String,
    off_command: String,
}

impl DeviceSpec {
    /// Creates a spec with empty command strings.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeviceKind, room: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            room: room.into(),
            on_command: String::new(),
            off_command: String::new(),
        }
    }

    /// Sets the on/off text commands.
    #[must_use]
    pub fn with_commands(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.on_command = on.into();
        self.off_command = off.into();
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds a new device with a generated id, powered off at level 0.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::EmptyName` if the name is blank.
    pub fn into_device(self) -> Result<Device, ValueError> {
        self.into_device_with(DeviceId::generate(), false, Level::MIN)
    }

    fn into_device_with(self, id: DeviceId, is_on: bool, value: Level) -> Result<Device, ValueError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValueError::EmptyName);
        }
        Ok(Device {
            id,
            name,
            kind: self.kind,
            room: self.room,
            is_on,
            value,
            on_command: self.on_command,
            off_command: self.off_command,
        })
    }
}

/// Returns the devices every registry starts with.
#[must_use]
pub fn default_devices() -> Vec<Device> {
    let seed = |id: &str, name: &str, kind, room: &str, prefix: &str, value| Device {
        id: DeviceId::from(id),
        name: name.to_string(),
        kind,
        room: room.to_string(),
        is_on: false,
        value: Level::clamped(value),
        on_command: format!("{prefix}:ON"),
        off_command: format!("{prefix}:OFF"),
    };

    vec![
        seed("1", "Living Room Light", DeviceKind::DimmableLight, "living-room", "L1", 80),
        seed("2", "Ceiling Fan", DeviceKind::VariableFan, "living-room", "F1", 30),
        seed("3", "Kitchen Strip", DeviceKind::DimmableLight, "kitchen", "L2", 100),
        seed("4", "Master AC", DeviceKind::Thermostat, "bedroom", "A1", 24),
    ]
}
