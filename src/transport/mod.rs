// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport adapters.
//!
//! Three interchangeable transports carry commands to the hardware and
//! notifications back:
//!
//! - [`ShortRangeTransport`]: Bluetooth Low Energy UART service (requires the
//!   `bluetooth` feature)
//! - [`LocalNetworkTransport`]: text commands over HTTP to a LAN address
//! - [`RelayTransport`]: JSON records over a WebSocket, or a built-in
//!   simulation for the address `demo`
//!
//! All three implement [`Transport`] and are composed in [`ActiveTransport`],
//! which is what the connection manager holds.
//!
//! # Listener slots
//!
//! Each connection gets its own [`ListenerSlots`]: exactly one inbound
//! listener and one lost-connection listener. The slots are installed before
//! the adapter connects and cleared when it disconnects, so nothing reaches
//! the engine from a torn-down link.

mod listeners;
mod local_network;
mod relay;
mod short_range;

pub use listeners::{InboundListener, ListenerSlots, LostListener};
pub use local_network::{LocalNetworkConfig, LocalNetworkTransport};
pub use relay::{DEMO_ADDRESS, RelayConfig, RelayTransport};
pub use short_range::{
    DiscoveredPeripheral, FirstPeripheral, NOTIFY_CHARACTERISTIC_UUID, PeripheralChooser,
    SERVICE_UUID, Selection, ShortRangeConfig, ShortRangeTransport, UNKNOWN_DEVICE_NAME,
    WRITE_CHARACTERISTIC_UUID,
};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::RelayMessage;
use crate::error::TransportError;

/// The three transport families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bluetooth Low Energy.
    ShortRange,
    /// HTTP on the local network.
    LocalNetwork,
    /// WebSocket relay.
    Relay,
}

impl TransportKind {
    /// Returns the user-facing name of the transport.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ShortRange => "Bluetooth",
            Self::LocalNetwork => "Wi-Fi",
            Self::Relay => "Relay",
        }
    }

    /// Returns `true` for transports that carry text lines.
    #[must_use]
    pub fn is_byte_stream(self) -> bool {
        !matches!(self, Self::Relay)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outbound data handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A text command such as `L1:ON`.
    Text(String),
    /// A relay record.
    Message(RelayMessage),
}

impl Payload {
    /// Renders the payload as text.
    ///
    /// Relay records become their JSON encoding.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            // Serializing a struct of plain fields cannot fail
            Self::Message(message) => serde_json::to_string(message).unwrap_or_default(),
        }
    }
}

/// Data received from the hardware.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A UTF-8 line from a byte-stream transport.
    Text(String),
    /// A parsed relay record.
    Message(RelayMessage),
}

/// Parameters for opening a transport.
#[derive(Debug, Clone)]
pub enum ConnectParams {
    /// Scan for and pair with a BLE peripheral.
    ShortRange(ShortRangeConfig),
    /// Address a device on the local network.
    LocalNetwork(LocalNetworkConfig),
    /// Open a relay socket, or simulate one.
    Relay(RelayConfig),
}

impl ConnectParams {
    /// Returns the transport these parameters open.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::ShortRange(_) => TransportKind::ShortRange,
            Self::LocalNetwork(_) => TransportKind::LocalNetwork,
            Self::Relay(_) => TransportKind::Relay,
        }
    }

    /// Shorthand for a local-network connection to `address` on port 80.
    #[must_use]
    pub fn local_network(address: impl Into<String>) -> Self {
        Self::LocalNetwork(LocalNetworkConfig::new(address))
    }

    /// Shorthand for a relay connection to `address` (a URL or `demo`).
    #[must_use]
    pub fn relay(address: impl Into<String>) -> Self {
        Self::Relay(RelayConfig::new(address))
    }

    /// Shorthand for the simulated relay.
    #[must_use]
    pub fn demo() -> Self {
        Self::relay(DEMO_ADDRESS)
    }
}

/// Contract shared by the three transport adapters.
#[allow(async_fn_in_trait)]
pub trait Transport: Sized {
    /// Adapter configuration.
    type Config;

    /// Opens the transport.
    ///
    /// Inbound data and loss of the link are reported through `listeners`.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported`, `Cancelled`, `DeviceNotSelected`,
    /// `HandshakeFailed` or `InvalidAddress` depending on the adapter.
    async fn connect(
        config: Self::Config,
        listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError>;

    /// Returns the transport family.
    fn kind(&self) -> TransportKind;

    /// Returns the human-readable endpoint descriptor.
    fn endpoint(&self) -> &str;

    /// Sends one payload.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `Busy` or `WriteFailed`.
    async fn send_command(&self, payload: &Payload) -> Result<(), TransportError>;

    /// Closes the transport. Idempotent, never fails, never fires the
    /// lost-connection listener.
    async fn disconnect(&self);

    /// Returns `true` if commands are accepted without reaching hardware.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// The transport currently held by the connection manager.
#[derive(Debug)]
pub enum ActiveTransport {
    /// Bluetooth Low Energy.
    ShortRange(ShortRangeTransport),
    /// HTTP on the local network.
    LocalNetwork(LocalNetworkTransport),
    /// WebSocket relay.
    Relay(RelayTransport),
}

impl ActiveTransport {
    /// Opens the transport described by `params`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's connect error.
    pub async fn connect(
        params: ConnectParams,
        listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        match params {
            ConnectParams::ShortRange(config) => {
                ShortRangeTransport::connect(config, listeners).await.map(Self::ShortRange)
            }
            ConnectParams::LocalNetwork(config) => {
                LocalNetworkTransport::connect(config, listeners)
                    .await
                    .map(Self::LocalNetwork)
            }
            ConnectParams::Relay(config) => {
                RelayTransport::connect(config, listeners).await.map(Self::Relay)
            }
        }
    }

    /// Returns the transport family.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::ShortRange(t) => t.kind(),
            Self::LocalNetwork(t) => t.kind(),
            Self::Relay(t) => t.kind(),
        }
    }

    /// Returns the endpoint descriptor.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::ShortRange(t) => t.endpoint(),
            Self::LocalNetwork(t) => t.endpoint(),
            Self::Relay(t) => t.endpoint(),
        }
    }

    /// Returns `true` if commands are accepted without reaching hardware.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        match self {
            Self::ShortRange(t) => t.is_simulated(),
            Self::LocalNetwork(t) => t.is_simulated(),
            Self::Relay(t) => t.is_simulated(),
        }
    }

    /// Sends one payload.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `Busy` or `WriteFailed`.
    pub async fn send_command(&self, payload: &Payload) -> Result<(), TransportError> {
        match self {
            Self::ShortRange(t) => t.send_command(payload).await,
            Self::LocalNetwork(t) => t.send_command(payload).await,
            Self::Relay(t) => t.send_command(payload).await,
        }
    }

    /// Closes the transport.
    pub async fn disconnect(&self) {
        match self {
            Self::ShortRange(t) => t.disconnect().await,
            Self::LocalNetwork(t) => t.disconnect().await,
            Self::Relay(t) => t.disconnect().await,
        }
    }
}
