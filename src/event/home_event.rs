// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event types published by the engine.

use serde::Serialize;

use crate::activity::LogEntry;
use crate::command::Origin;
use crate::connection::ConnectionState;
use crate::device::Device;
use crate::environment::Environment;
use crate::types::DeviceId;

/// Events published on the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HomeEvent {
    /// A device was added to the registry.
    DeviceAdded {
        /// Snapshot of the new device.
        device: Device,
    },

    /// A device was removed from the registry.
    DeviceRemoved {
        /// Id of the removed device.
        device_id: DeviceId,
    },

    /// A device's power or level changed.
    DeviceChanged {
        /// Snapshot after the change.
        device: Device,
        /// Who caused the change.
        origin: Origin,
    },

    /// The connection state changed.
    ConnectionChanged {
        /// The new state.
        state: ConnectionState,
    },

    /// An entry was appended to the activity log.
    LogAppended {
        /// The appended entry.
        entry: LogEntry,
    },

    /// The activity log was cleared.
    LogCleared,

    /// The ambient reading changed.
    EnvironmentChanged {
        /// The new reading.
        environment: Environment,
    },

    /// The engine asked for a sentence to be spoken.
    Announcement {
        /// The sentence.
        text: String,
    },
}

impl HomeEvent {
    /// Returns the device this event concerns, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::DeviceAdded { device } | Self::DeviceChanged { device, .. } => Some(&device.id),
            Self::DeviceRemoved { device_id } => Some(device_id),
            Self::LogAppended { entry } if !entry.is_system() => Some(&entry.device_id),
            _ => None,
        }
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }
}
