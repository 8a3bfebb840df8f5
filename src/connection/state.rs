// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection state snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::TransportKind;

/// Error text recorded when a transport drops unexpectedly.
pub(crate) const LOST_CONNECTION_ERROR: &str = "Device disconnected unexpectedly";

/// Lifecycle phase of the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// No transport.
    #[default]
    Idle,
    /// A connect attempt is running.
    Connecting,
    /// A transport is open.
    Connected,
    /// The last attempt failed or the link was lost.
    Error,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Process-wide connection status.
///
/// # Examples
///
/// ```
/// use hearthlink::connection::{ConnectionPhase, ConnectionState};
///
/// let state = ConnectionState::default();
/// assert_eq!(state.phase, ConnectionPhase::Idle);
/// assert!(!state.connected);
/// assert!(state.transport.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Lifecycle phase.
    pub phase: ConnectionPhase,
    /// `true` while a transport is open.
    pub connected: bool,
    /// `true` while a connect attempt is running.
    pub connecting: bool,
    /// Open transport.
    pub transport: Option<TransportKind>,
    /// Endpoint descriptor of the open transport.
    pub endpoint: Option<String>,
    /// Last connection or write error.
    pub error: Option<String>,
}

impl ConnectionState {
    pub(crate) fn connecting() -> Self {
        Self {
            phase: ConnectionPhase::Connecting,
            connecting: true,
            ..Self::default()
        }
    }

    pub(crate) fn connected(transport: TransportKind, endpoint: impl Into<String>) -> Self {
        Self {
            phase: ConnectionPhase::Connected,
            connected: true,
            connecting: false,
            transport: Some(transport),
            endpoint: Some(endpoint.into()),
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            phase: ConnectionPhase::Error,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Returns `true` while a transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Returns `true` while connected or connecting.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            ConnectionPhase::Connected | ConnectionPhase::Connecting
        )
    }
}
