// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel id used for log entries that do not concern a device.
const SYSTEM_ID: &str = "system";

/// Opaque identifier for a device in the registry.
///
/// Ids are plain strings on the wire because relay frames carry them as
/// `deviceId`. Seeded devices use short numeric ids (`"1"`, `"2"`, ...),
/// devices added at runtime get a generated UUID.
///
/// # Examples
///
/// ```
/// use hearthlink::types::DeviceId;
///
/// let seeded = DeviceId::from("1");
/// assert_eq!(seeded.as_str(), "1");
///
/// let generated = DeviceId::generate();
/// assert_ne!(generated, DeviceId::generate());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a new unique device identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the sentinel id used for system-level log entries.
    #[must_use]
    pub fn system() -> Self {
        Self(SYSTEM_ID.to_string())
    }

    /// Returns `true` if this is the system sentinel.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_ID
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
