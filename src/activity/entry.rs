// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Log entry types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::DeviceId;

/// Display name used for entries that do not concern a device.
pub(crate) const SYSTEM_NAME: &str = "System";

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    /// A device was switched on.
    #[serde(rename = "TURNED_ON")]
    PowerOn,
    /// A device was switched off.
    #[serde(rename = "TURNED_OFF")]
    PowerOff,
    /// An analog value or the device list changed.
    ValueChange,
    /// A command or connection failed.
    Error,
    /// A transport connected.
    Connected,
    /// A transport disconnected.
    Disconnected,
    /// A voice command was captured.
    VoiceCommand,
    /// Hardware reported a change made outside the application.
    PhysicalSwitch,
    /// The assistant answered.
    AiResponse,
    /// A user signed in.
    Login,
    /// A user signed out.
    Logout,
}

impl LogAction {
    /// Returns the wire name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PowerOn => "TURNED_ON",
            Self::PowerOff => "TURNED_OFF",
            Self::ValueChange => "VALUE_CHANGE",
            Self::Error => "ERROR",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::VoiceCommand => "VOICE_COMMAND",
            Self::PhysicalSwitch => "PHYSICAL_SWITCH",
            Self::AiResponse => "AI_RESPONSE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
        }
    }

    /// Returns the power action for a power state.
    #[must_use]
    pub fn for_power(on: bool) -> Self {
        if on { Self::PowerOn } else { Self::PowerOff }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique entry id.
    pub id: Uuid,
    /// Device concerned, or the system sentinel.
    pub device_id: DeviceId,
    /// Device name at the time of the entry.
    pub device_name: String,
    /// What happened.
    pub action: LogAction,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Optional free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        device_name: impl Into<String>,
        action: LogAction,
        details: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            device_name: device_name.into(),
            action,
            timestamp: Utc::now(),
            details,
        }
    }

    /// Creates a system-level entry.
    #[must_use]
    pub fn system(action: LogAction, details: Option<String>) -> Self {
        Self::new(DeviceId::system(), SYSTEM_NAME, action, details)
    }

    /// Returns `true` if this entry concerns the system rather than a device.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.device_id.is_system()
    }
}
