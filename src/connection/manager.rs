// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection manager.

use std::sync::Arc;

use parking_lot::Mutex;

use super::state::LOST_CONNECTION_ERROR;
use super::{ConnectionPhase, ConnectionState};
use crate::activity::LogAction;
use crate::error::{Error, TransportError};
use crate::event::{HomeEvent, Notifier};
use crate::transport::{ActiveTransport, ConnectParams, Inbound, ListenerSlots, TransportKind};

/// Announcement after a successful connect.
fn connected_announcement(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::ShortRange => "Bluetooth connected successfully",
        TransportKind::LocalNetwork => "Wi-Fi connected",
        TransportKind::Relay => "Relay connected. Listening for hardware events.",
    }
}

struct Inner {
    state: ConnectionState,
    transport: Option<Arc<ActiveTransport>>,
    slots: Option<Arc<ListenerSlots>>,
    /// Incremented on every connect attempt and every teardown. Callbacks
    /// carrying an older value are stale.
    session: u64,
    /// Set when the link of the current attempt dropped before the attempt
    /// finished.
    lost_while_connecting: bool,
}

/// Owns the active transport and the [`ConnectionState`].
///
/// Every transition happens inside one short critical section; the lock is
/// never held across transport I/O. Each connect attempt gets a session
/// number, so a disconnect issued mid-attempt invalidates the attempt and a
/// lost-connection callback from an earlier link is ignored.
pub struct ConnectionManager {
    inner: Mutex<Inner>,
    notifier: Notifier,
}

impl ConnectionManager {
    pub(crate) fn new(notifier: Notifier) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::default(),
                transport: None,
                slots: None,
                session: 0,
                lost_while_connecting: false,
            }),
            notifier,
        }
    }

    /// Returns a snapshot of the connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state.clone()
    }

    /// Returns the open transport, if any.
    #[must_use]
    pub fn transport(&self) -> Option<Arc<ActiveTransport>> {
        self.inner.lock().transport.clone()
    }

    /// Opens a transport.
    ///
    /// `on_inbound` receives everything the hardware sends until the
    /// transport is closed.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyConnected` while connected or connecting, and
    /// `Error::Transport` if the adapter fails. A user-cancelled discovery
    /// returns `TransportError::Cancelled` and leaves the state idle, as
    /// does an attempt invalidated by [`disconnect`](Self::disconnect). A
    /// link that drops before the attempt finishes is reported as a lost
    /// connection and returns `TransportError::NotConnected`.
    pub async fn connect<F>(
        self: &Arc<Self>,
        params: ConnectParams,
        on_inbound: F,
    ) -> Result<ConnectionState, Error>
    where
        F: Fn(Inbound) + Send + Sync + 'static,
    {
        let kind = params.kind();
        let (session, slots) = self.begin(kind)?;

        slots.set_on_inbound(on_inbound);
        let manager = Arc::downgrade(self);
        slots.set_on_lost(move || {
            if let Some(manager) = manager.upgrade() {
                manager.connection_lost(session);
            }
        });

        let result = ActiveTransport::connect(params, Arc::clone(&slots)).await;
        self.finish(session, kind, &slots, result).await
    }

    fn begin(&self, kind: TransportKind) -> Result<(u64, Arc<ListenerSlots>), Error> {
        let (session, slots, state) = {
            let mut inner = self.inner.lock();
            if inner.state.is_busy() {
                return Err(Error::AlreadyConnected);
            }
            inner.session += 1;
            inner.lost_while_connecting = false;
            inner.state = ConnectionState::connecting();
            let slots = Arc::new(ListenerSlots::new());
            inner.slots = Some(Arc::clone(&slots));
            (inner.session, slots, inner.state.clone())
        };

        tracing::info!(transport = %kind, session, "Connecting");
        self.notifier.publish(HomeEvent::ConnectionChanged { state });
        Ok((session, slots))
    }

    async fn finish(
        &self,
        session: u64,
        kind: TransportKind,
        slots: &Arc<ListenerSlots>,
        result: Result<ActiveTransport, TransportError>,
    ) -> Result<ConnectionState, Error> {
        match result {
            Ok(transport) => {
                let transport = Arc::new(transport);
                let endpoint = transport.endpoint().to_string();

                let accepted = {
                    let mut inner = self.inner.lock();
                    if inner.session != session || inner.state.phase != ConnectionPhase::Connecting {
                        Accepted::Superseded
                    } else if inner.lost_while_connecting {
                        inner.lost_while_connecting = false;
                        inner.session += 1;
                        inner.slots = None;
                        inner.state = ConnectionState::failed(LOST_CONNECTION_ERROR);
                        Accepted::Lost(inner.state.clone())
                    } else {
                        inner.state = ConnectionState::connected(kind, endpoint.clone());
                        inner.transport = Some(Arc::clone(&transport));
                        Accepted::Open(inner.state.clone())
                    }
                };

                let state = match accepted {
                    Accepted::Open(state) => state,
                    Accepted::Superseded => {
                        tracing::info!(transport = %kind, session, "Connect attempt superseded, closing late transport");
                        slots.clear();
                        transport.disconnect().await;
                        return Err(TransportError::Cancelled.into());
                    }
                    Accepted::Lost(state) => {
                        tracing::warn!(transport = %kind, session, "Link dropped while connecting");
                        slots.clear();
                        self.report_lost(state);
                        transport.disconnect().await;
                        return Err(TransportError::NotConnected.into());
                    }
                };

                tracing::info!(transport = %kind, endpoint = %endpoint, "Connected");
                self.notifier.record_system(
                    LogAction::Connected,
                    Some(format!("via {} to {endpoint}", kind.label())),
                );
                self.notifier.announce(connected_announcement(kind));
                self.notifier.publish(HomeEvent::ConnectionChanged {
                    state: state.clone(),
                });
                Ok(state)
            }
            Err(error) => {
                slots.clear();

                let state = {
                    let mut inner = self.inner.lock();
                    if inner.session != session {
                        None
                    } else {
                        inner.slots = None;
                        inner.state = if error.is_cancellation() {
                            ConnectionState::default()
                        } else {
                            ConnectionState::failed(error.to_string())
                        };
                        Some(inner.state.clone())
                    }
                };

                if let Some(state) = state {
                    if error.is_cancellation() {
                        tracing::debug!(transport = %kind, "Discovery cancelled");
                    } else {
                        tracing::warn!(transport = %kind, error = %error, "Connect failed");
                        self.notifier.record_system(
                            LogAction::Error,
                            Some(format!("{} connection failed: {error}", kind.label())),
                        );
                        self.notifier
                            .announce(format!("Failed to connect {}", kind.label()));
                    }
                    self.notifier.publish(HomeEvent::ConnectionChanged { state });
                }

                Err(error.into())
            }
        }
    }

    /// Closes the open transport, or abandons a running connect attempt.
    ///
    /// Returns `true` if an open transport was closed. Closing logs one
    /// `DISCONNECTED` entry and announces it; abandoning an attempt does
    /// neither. Without a transport this is a no-op.
    pub async fn disconnect(&self) -> bool {
        let (transport, slots, state, was_connected) = {
            let mut inner = self.inner.lock();
            let was_connected = match inner.state.phase {
                ConnectionPhase::Connected => true,
                ConnectionPhase::Connecting => false,
                ConnectionPhase::Idle | ConnectionPhase::Error => return false,
            };
            inner.session += 1;
            inner.state = ConnectionState::default();
            (
                inner.transport.take(),
                inner.slots.take(),
                inner.state.clone(),
                was_connected,
            )
        };

        if let Some(slots) = slots {
            slots.clear();
        }

        if was_connected {
            tracing::info!("Disconnected");
            self.notifier.record_system(LogAction::Disconnected, None);
            self.notifier.announce("Disconnected");
        } else {
            tracing::info!("Connect attempt abandoned");
        }
        self.notifier.publish(HomeEvent::ConnectionChanged { state });

        if let Some(transport) = transport {
            transport.disconnect().await;
        }

        was_connected
    }

    /// Records a write failure on the connection state.
    pub(crate) fn report_error(&self, message: impl Into<String>) {
        let state = {
            let mut inner = self.inner.lock();
            inner.state.error = Some(message.into());
            inner.state.clone()
        };
        self.notifier.publish(HomeEvent::ConnectionChanged { state });
    }

    /// Handles the lost-connection signal of session `session`.
    ///
    /// A loss during the attempt itself is only recorded here; the attempt
    /// reports it when it finishes.
    fn connection_lost(&self, session: u64) {
        let (transport, slots, state) = {
            let mut inner = self.inner.lock();
            if inner.session != session {
                tracing::debug!(session, "Ignoring stale connection loss");
                return;
            }
            match inner.state.phase {
                ConnectionPhase::Connected => {}
                ConnectionPhase::Connecting => {
                    tracing::debug!(session, "Connection lost before connect finished");
                    inner.lost_while_connecting = true;
                    return;
                }
                ConnectionPhase::Idle | ConnectionPhase::Error => {
                    tracing::debug!(session, "Ignoring stale connection loss");
                    return;
                }
            }
            inner.session += 1;
            inner.state = ConnectionState::failed(LOST_CONNECTION_ERROR);
            (
                inner.transport.take(),
                inner.slots.take(),
                inner.state.clone(),
            )
        };

        tracing::warn!(session, "Connection lost");
        if let Some(slots) = slots {
            slots.clear();
        }

        self.report_lost(state);

        if let Some(transport) = transport
            && let Ok(runtime) = tokio::runtime::Handle::try_current()
        {
            runtime.spawn(async move { transport.disconnect().await });
        }
    }

    fn report_lost(&self, state: ConnectionState) {
        self.notifier
            .record_system(LogAction::Disconnected, Some("Connection lost".to_string()));
        self.notifier.announce("Device disconnected");
        self.notifier.publish(HomeEvent::ConnectionChanged { state });
    }
}

/// How `finish` resolved a transport that opened.
enum Accepted {
    Open(ConnectionState),
    Superseded,
    Lost(ConnectionState),
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.inner.lock().state)
            .finish_non_exhaustive()
    }
}
