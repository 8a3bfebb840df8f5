// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay transport.
//!
//! The relay is a WebSocket server bridging the application and the
//! hardware. Both directions carry [`RelayMessage`] JSON text frames.
//!
//! The literal address [`DEMO_ADDRESS`] opens a simulated relay instead: it
//! accepts every command without effect and periodically reports a random
//! power change for one of the configured device ids, as if someone had
//! flipped a physical switch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{Inbound, ListenerSlots, Payload, Transport, TransportKind};
use crate::command::RelayMessage;
use crate::error::TransportError;
use crate::types::DeviceId;

/// Address that opens the simulated relay.
pub const DEMO_ADDRESS: &str = "demo";

/// Endpoint descriptor of the simulated relay.
const SIMULATED_ENDPOINT: &str = "Relay (simulated)";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// RelayConfig
// ============================================================================

/// Configuration for the relay transport.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hearthlink::transport::RelayConfig;
///
/// let demo = RelayConfig::new("demo")
///     .with_simulation_interval(Duration::from_secs(2))
///     .with_simulated_ids(["1", "3"]);
/// assert!(demo.is_demo());
///
/// let live = RelayConfig::new("wss://relay.example.net/home");
/// assert!(!live.is_demo());
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    address: String,
    simulation_interval: Duration,
    simulated_ids: Vec<DeviceId>,
}

impl RelayConfig {
    /// Default period between simulated hardware reports.
    pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_secs(8);

    /// Creates a configuration for a relay URL or [`DEMO_ADDRESS`].
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            simulation_interval: Self::DEFAULT_SIMULATION_INTERVAL,
            simulated_ids: ["1", "2", "3", "4"].into_iter().map(DeviceId::from).collect(),
        }
    }

    /// Sets the period between simulated hardware reports.
    #[must_use]
    pub fn with_simulation_interval(mut self, interval: Duration) -> Self {
        self.simulation_interval = interval;
        self
    }

    /// Sets the device ids the simulation picks from.
    #[must_use]
    pub fn with_simulated_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<DeviceId>,
    {
        self.simulated_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` if this configuration opens the simulated relay.
    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.address.eq_ignore_ascii_case(DEMO_ADDRESS)
    }
}

// ============================================================================
// RelayTransport
// ============================================================================

enum Link {
    Simulated,
    Socket(tokio::sync::Mutex<SplitSink<WsStream, Message>>),
}

/// WebSocket relay transport, or its simulation.
pub struct RelayTransport {
    endpoint: String,
    link: Link,
    open: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RelayTransport {
    fn simulated(config: RelayConfig, listeners: Arc<ListenerSlots>) -> Self {
        tracing::info!(
            interval_ms = config.simulation_interval.as_millis(),
            "Starting simulated relay"
        );

        let task = tokio::spawn(simulate(
            config.simulation_interval,
            config.simulated_ids,
            listeners,
        ));

        Self {
            endpoint: SIMULATED_ENDPOINT.to_string(),
            link: Link::Simulated,
            open: Arc::new(AtomicBool::new(true)),
            task: Mutex::new(Some(task)),
        }
    }

    async fn open_socket(
        config: RelayConfig,
        listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        let url = Url::parse(&config.address)
            .map_err(|_| TransportError::InvalidAddress(config.address.clone()))?;

        tracing::debug!(url = %url, "Opening relay socket");

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let (writer, reader) = stream.split();
        let open = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(read_frames(reader, Arc::clone(&open), listeners));

        tracing::info!(url = %url, "Relay socket open");

        Ok(Self {
            endpoint: config.address,
            link: Link::Socket(tokio::sync::Mutex::new(writer)),
            open,
            task: Mutex::new(Some(task)),
        })
    }

    fn stop_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Transport for RelayTransport {
    type Config = RelayConfig;

    async fn connect(
        config: RelayConfig,
        listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        if config.is_demo() {
            Ok(Self::simulated(config, listeners))
        } else {
            Self::open_socket(config, listeners).await
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Relay
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_simulated(&self) -> bool {
        matches!(self.link, Link::Simulated)
    }

    async fn send_command(&self, payload: &Payload) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }

        let text = payload.to_text();
        match &self.link {
            Link::Simulated => {
                tracing::debug!(payload = %text, "Simulated relay accepted command");
                Ok(())
            }
            Link::Socket(writer) => {
                tracing::debug!(payload = %text, "Sending relay frame");
                writer
                    .lock()
                    .await
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| TransportError::WriteFailed(e.to_string()))
            }
        }
    }

    async fn disconnect(&self) {
        // Clearing the flag first keeps the reader from reporting a loss
        if !self.open.swap(false, Ordering::AcqRel) {
            self.stop_task();
            return;
        }

        self.stop_task();

        if let Link::Socket(writer) = &self.link {
            let mut writer = writer.lock().await;
            // Ignore errors: the peer may already be gone
            let _ = writer.send(Message::Close(None)).await;
            let _ = writer.close().await;
        }

        tracing::info!(endpoint = %self.endpoint, "Relay transport closed");
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
        self.stop_task();
    }
}

impl fmt::Debug for RelayTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayTransport")
            .field("endpoint", &self.endpoint)
            .field("simulated", &self.is_simulated())
            .field("open", &self.open.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Reads relay frames until the socket closes.
///
/// Reports the loss to the listeners unless a manual disconnect cleared the
/// `open` flag first.
async fn read_frames(
    mut reader: SplitStream<WsStream>,
    open: Arc<AtomicBool>,
    listeners: Arc<ListenerSlots>,
) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<RelayMessage>(&text) {
                Ok(message) => listeners.deliver(Inbound::Message(message)),
                Err(e) => {
                    tracing::warn!(error = %e, frame = %text, "Ignoring malformed relay frame");
                }
            },
            Ok(Message::Close(frame)) => {
                tracing::debug!(frame = ?frame, "Relay sent close frame");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Relay socket error");
                break;
            }
        }
    }

    if open.swap(false, Ordering::AcqRel) {
        tracing::warn!("Relay socket closed unexpectedly");
        listeners.connection_lost();
    }
}

/// Periodically reports a random power change for a random device.
async fn simulate(interval: Duration, ids: Vec<DeviceId>, listeners: Arc<ListenerSlots>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let message = {
            let mut rng = rand::thread_rng();
            ids.choose(&mut rng)
                .map(|id| RelayMessage::hardware_power(id.clone(), rng.gen_bool(0.5)))
        };

        if let Some(message) = message {
            tracing::debug!(device_id = %message.device_id, state = ?message.state, "Simulated hardware event");
            listeners.deliver(Inbound::Message(message));
        }
    }
}
