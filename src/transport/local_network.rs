// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local-network transport.
//!
//! The device is addressed by IPv4 dotted quad or `localhost` and receives
//! each text command as `GET /command?q=<text>`. HTTP is stateless: there is
//! no inbound channel and no lost-connection signal.
//!
//! Response bodies are never read. The status line is, though: a non-2xx
//! reply is reported as `WriteFailed`, the same as a request that never got
//! an answer, so the dispatcher rolls the command back.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;

use super::{ListenerSlots, Payload, Transport, TransportKind};
use crate::error::TransportError;

// ============================================================================
// LocalNetworkConfig
// ============================================================================

/// Configuration for a local-network device.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hearthlink::transport::LocalNetworkConfig;
///
/// let config = LocalNetworkConfig::new("192.168.1.50")
///     .with_port(8080)
///     .with_handshake_timeout(Duration::from_millis(500));
///
/// assert_eq!(config.base_url(), "http://192.168.1.50:8080");
/// assert!(config.validate().is_ok());
/// assert!(LocalNetworkConfig::new("garage-door").validate().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct LocalNetworkConfig {
    address: String,
    port: u16,
    handshake_timeout: Duration,
    request_timeout: Duration,
    handshake_path: String,
    command_path: String,
}

impl LocalNetworkConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default handshake timeout.
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1500);
    /// Default timeout for command requests.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    /// Path probed by the handshake.
    pub const DEFAULT_HANDSHAKE_PATH: &'static str = "/";
    /// Path receiving text commands.
    pub const DEFAULT_COMMAND_PATH: &'static str = "/command";

    /// Creates a configuration for the given address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            port: Self::DEFAULT_PORT,
            handshake_timeout: Self::DEFAULT_HANDSHAKE_TIMEOUT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            handshake_path: Self::DEFAULT_HANDSHAKE_PATH.to_string(),
            command_path: Self::DEFAULT_COMMAND_PATH.to_string(),
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the timeout for command requests.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the path probed by the handshake.
    #[must_use]
    pub fn with_handshake_path(mut self, path: impl Into<String>) -> Self {
        self.handshake_path = path.into();
        self
    }

    /// Sets the path receiving text commands.
    #[must_use]
    pub fn with_command_path(mut self, path: impl Into<String>) -> Self {
        self.command_path = path.into();
        self
    }

    /// Returns the address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the handshake timeout.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Checks that the address is an IPv4 dotted quad or `localhost`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidAddress` otherwise.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.address.eq_ignore_ascii_case("localhost")
            || self.address.parse::<Ipv4Addr>().is_ok()
        {
            Ok(())
        } else {
            Err(TransportError::InvalidAddress(self.address.clone()))
        }
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.port == Self::DEFAULT_PORT {
            format!("http://{}", self.address)
        } else {
            format!("http://{}:{}", self.address, self.port)
        }
    }
}

// ============================================================================
// LocalNetworkTransport
// ============================================================================

/// HTTP transport to a device on the local network.
#[derive(Debug)]
pub struct LocalNetworkTransport {
    client: Client,
    base_url: String,
    command_path: String,
    endpoint: String,
    open: AtomicBool,
}

impl LocalNetworkTransport {
    /// Builds the URL for a text command.
    fn build_url(&self, text: &str) -> String {
        format!(
            "{}{}?q={}",
            self.base_url,
            self.command_path,
            urlencoding::encode(text)
        )
    }
}

impl Transport for LocalNetworkTransport {
    type Config = LocalNetworkConfig;

    async fn connect(
        config: LocalNetworkConfig,
        _listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let base_url = config.base_url();
        let probe = format!("{base_url}{}", config.handshake_path);

        tracing::debug!(url = %probe, "Probing local network device");

        // Any HTTP response proves the device is reachable
        let response = client
            .get(&probe)
            .timeout(config.handshake_timeout)
            .send()
            .await
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        tracing::debug!(status = %response.status(), "Local network device reachable");

        Ok(Self {
            client,
            base_url,
            command_path: config.command_path,
            endpoint: config.address,
            open: AtomicBool::new(true),
        })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::LocalNetwork
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_command(&self, payload: &Payload) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }

        let url = self.build_url(&payload.to_text());

        tracing::debug!(url = %url, "Sending local network command");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::WriteFailed(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        Ok(())
    }

    async fn disconnect(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(endpoint = %self.endpoint, "Local network transport closed");
        }
    }
}
