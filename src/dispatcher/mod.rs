// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch.
//!
//! Every application command follows the same path: apply to the registry
//! optimistically, render a payload for the open transport, send, then keep
//! or roll back depending on the outcome.
//!
//! | Send result            | Registry            | Log                 |
//! |------------------------|---------------------|---------------------|
//! | demo mode / no link    | kept                | `TURNED_ON/OFF`     |
//! | sent                   | kept                | `TURNED_ON/OFF`     |
//! | `Busy`                 | kept, command lost  | `TURNED_ON/OFF`     |
//! | `WriteFailed`          | rolled back         | `ERROR`             |
//!
//! Level changes bypass the table: they are applied immediately and written
//! through a throttle without logging or rollback.

mod throttle;

pub use throttle::DEFAULT_THROTTLE_WINDOW;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::activity::LogAction;
use crate::command::{Command, Origin};
use crate::connection::ConnectionManager;
use crate::device::Device;
use crate::error::{Error, TransportError};
use crate::event::{HomeEvent, Notifier};
use crate::registry::{BulkPolicy, DeviceRegistry, PowerIntent};
use crate::types::{DeviceId, Level};

use throttle::Throttle;

/// Details recorded when a power command fails to reach the hardware.
const WRITE_FAILED_DETAILS: &str = "Connection failed";

/// What happened to a power command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The device was already in the requested state; nothing happened.
    Unchanged,
    /// Applied locally without a transmission (demo mode or no transport).
    Applied,
    /// Applied and written to the transport.
    Sent,
    /// Applied, but the transport was busy and the command was dropped.
    Dropped,
    /// The write failed and the optimistic change was undone.
    RolledBack,
    /// The write failed but a later change had already superseded this one.
    Failed,
}

enum Transmission {
    Skipped,
    Sent,
    Busy,
    Failed(String),
}

impl From<Result<(), TransportError>> for Transmission {
    fn from(result: Result<(), TransportError>) -> Self {
        match result {
            Ok(()) => Self::Sent,
            Err(TransportError::NotConnected) => Self::Skipped,
            Err(TransportError::Busy) => Self::Busy,
            Err(TransportError::WriteFailed(reason)) => Self::Failed(reason),
            Err(other) => Self::Failed(other.to_string()),
        }
    }
}

/// Applies commands to the registry and forwards them to the transport.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    connection: Arc<ConnectionManager>,
    notifier: Notifier,
    demo_mode: Arc<AtomicBool>,
    throttle: Arc<Throttle>,
    bulk_policy: BulkPolicy,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<DeviceRegistry>,
        connection: Arc<ConnectionManager>,
        notifier: Notifier,
        demo_mode: Arc<AtomicBool>,
        throttle_window: Duration,
        bulk_policy: BulkPolicy,
    ) -> Self {
        Self {
            registry,
            connection,
            notifier,
            demo_mode,
            throttle: Arc::new(Throttle::new(throttle_window)),
            bulk_policy,
        }
    }

    // ========================================================================
    // Power
    // ========================================================================

    /// Switches a device on or off.
    ///
    /// Does nothing if the device is already in that state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn set_power(&self, id: &DeviceId, on: bool) -> Result<DispatchOutcome, Error> {
        self.power(id, on, false).await
    }

    /// Switches a device on or off even if it is already in that state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn force_power(&self, id: &DeviceId, on: bool) -> Result<DispatchOutcome, Error> {
        self.power(id, on, true).await
    }

    /// Inverts a device's power state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn toggle(&self, id: &DeviceId) -> Result<DispatchOutcome, Error> {
        let intent = self.registry.begin_toggle(id)?;
        Ok(self.complete_power(intent).await)
    }

    /// Switches every device on or off, following the bulk policy.
    ///
    /// Devices removed while the operation runs are skipped.
    pub async fn set_all_power(&self, on: bool) -> Vec<(DeviceId, DispatchOutcome)> {
        let force = self.bulk_policy == BulkPolicy::ForceAll;
        let mut outcomes = Vec::new();

        for id in self.registry.bulk_targets(on, self.bulk_policy) {
            match self.power(&id, on, force).await {
                Ok(outcome) => outcomes.push((id, outcome)),
                Err(e) => tracing::debug!(device_id = %id, error = %e, "Skipping device in bulk power"),
            }
        }

        outcomes
    }

    async fn power(&self, id: &DeviceId, on: bool, force: bool) -> Result<DispatchOutcome, Error> {
        match self.registry.begin_power(id, on, force)? {
            Some(intent) => Ok(self.complete_power(intent).await),
            None => {
                tracing::trace!(device_id = %id, on, "Power unchanged");
                Ok(DispatchOutcome::Unchanged)
            }
        }
    }

    async fn complete_power(&self, intent: PowerIntent) -> DispatchOutcome {
        let device = &intent.device;
        let on = intent.desired();

        self.notifier.publish(HomeEvent::DeviceChanged {
            device: device.clone(),
            origin: Origin::Application,
        });

        let command = Command::power(device.id.clone(), on);
        let transmission = self.transmit(&command, device).await;
        self.settle_power(&intent, transmission)
    }

    /// Keeps or rolls back a power change once its transmission is known.
    fn settle_power(&self, intent: &PowerIntent, transmission: Transmission) -> DispatchOutcome {
        let device = &intent.device;
        let on = intent.desired();

        let outcome = match transmission {
            Transmission::Skipped => DispatchOutcome::Applied,
            Transmission::Sent => DispatchOutcome::Sent,
            Transmission::Busy => {
                tracing::debug!(device_id = %device.id, "Transport busy, command dropped");
                DispatchOutcome::Dropped
            }
            Transmission::Failed(reason) => {
                tracing::error!(device_id = %device.id, error = %reason, "Power command failed");

                let outcome = match self.registry.revert(intent) {
                    Some(reverted) => {
                        self.notifier.publish(HomeEvent::DeviceChanged {
                            device: reverted,
                            origin: Origin::Application,
                        });
                        DispatchOutcome::RolledBack
                    }
                    None => DispatchOutcome::Failed,
                };

                self.notifier.record_device(
                    device,
                    LogAction::Error,
                    Some(WRITE_FAILED_DETAILS.to_string()),
                );
                self.connection.report_error(reason);
                return outcome;
            }
        };

        self.notifier
            .record_device(device, LogAction::for_power(on), None);
        outcome
    }

    // ========================================================================
    // Level
    // ========================================================================

    /// Sets a device's level, clamped to 0-100.
    ///
    /// The registry changes immediately; the write to the transport goes
    /// through the throttle and is never rolled back. Outside a Tokio
    /// runtime the write is skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn set_value(&self, id: &DeviceId, value: i64) -> Result<Device, Error> {
        let level = Level::clamped(value);
        let device = self.registry.set_value(id, level)?;

        self.notifier.publish(HomeEvent::DeviceChanged {
            device: device.clone(),
            origin: Origin::Application,
        });

        let dispatcher = self.clone();
        let command = Command::value(id.clone(), level);
        self.throttle.schedule(async move {
            dispatcher.send_value(command).await;
        });

        Ok(device)
    }

    async fn send_value(&self, command: Command) {
        // Command strings come from the current snapshot
        let Some(device) = self.registry.get(&command.device_id) else {
            tracing::debug!(device_id = %command.device_id, "Device removed before level write");
            return;
        };

        match self.transmit(&command, &device).await {
            Transmission::Failed(reason) => {
                tracing::debug!(device_id = %device.id, error = %reason, "Level write failed");
            }
            Transmission::Busy => {
                tracing::debug!(device_id = %device.id, "Transport busy, level write dropped");
            }
            Transmission::Skipped | Transmission::Sent => {}
        }
    }

    /// Cancels a deferred level write.
    pub(crate) fn cancel_pending(&self) {
        self.throttle.cancel_pending();
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn transmit(&self, command: &Command, device: &Device) -> Transmission {
        if self.demo_mode.load(Ordering::Acquire) {
            return Transmission::Skipped;
        }

        // Clone the Arc so the connection lock is not held across the send
        let Some(transport) = self.connection.transport() else {
            return Transmission::Skipped;
        };

        let Some(payload) = command.payload_for(device, transport.kind()) else {
            return Transmission::Skipped;
        };

        Transmission::from(transport.send_command(&payload).await)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("demo_mode", &self.demo_mode.load(Ordering::Relaxed))
            .field("bulk_policy", &self.bulk_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::default_devices;
    use crate::event::testing::notifier;
    use crate::transport::{ConnectParams, LocalNetworkConfig};

    struct Fixture {
        dispatcher: Dispatcher,
        registry: Arc<DeviceRegistry>,
        connection: Arc<ConnectionManager>,
        notifier: Notifier,
    }

    fn fixture(demo: bool, policy: BulkPolicy) -> Fixture {
        let (notifier, _) = notifier();
        let registry = Arc::new(DeviceRegistry::new(default_devices()));
        let connection = Arc::new(ConnectionManager::new(notifier.clone()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&connection),
            notifier.clone(),
            Arc::new(AtomicBool::new(demo)),
            DEFAULT_THROTTLE_WINDOW,
            policy,
        );
        Fixture {
            dispatcher,
            registry,
            connection,
            notifier,
        }
    }

    fn id(s: &str) -> DeviceId {
        DeviceId::from(s)
    }

    #[tokio::test]
    async fn redundant_power_emits_nothing() {
        let f = fixture(true, BulkPolicy::default());
        let outcome = f.dispatcher.set_power(&id("1"), false).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Unchanged);
        assert!(f.notifier.log().is_empty());
    }

    #[tokio::test]
    async fn demo_mode_applies_and_logs() {
        let f = fixture(true, BulkPolicy::default());
        let outcome = f.dispatcher.set_power(&id("1"), true).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Applied);
        assert!(f.registry.get(&id("1")).unwrap().is_on);
        let entries = f.notifier.log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LogAction::PowerOn);
        assert_eq!(entries[0].device_name, "Living Room Light");
    }

    #[tokio::test]
    async fn no_transport_applies_without_sending() {
        let f = fixture(false, BulkPolicy::default());
        let outcome = f.dispatcher.set_power(&id("2"), true).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Applied);
    }

    #[tokio::test]
    async fn connected_transport_receives_command() {
        let f = fixture(false, BulkPolicy::default());
        f.connection.connect(ConnectParams::demo(), |_| {}).await.unwrap();

        let outcome = f.dispatcher.set_power(&id("2"), true).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(f.notifier.log().entries()[0].action, LogAction::PowerOn);
    }

    #[tokio::test]
    async fn force_power_bypasses_no_op_check() {
        let f = fixture(true, BulkPolicy::default());
        let outcome = f.dispatcher.force_power(&id("1"), false).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Applied);
        assert_eq!(f.notifier.log().entries()[0].action, LogAction::PowerOff);
    }

    #[tokio::test]
    async fn toggle_twice_restores_state() {
        let f = fixture(true, BulkPolicy::default());
        f.dispatcher.toggle(&id("3")).await.unwrap();
        assert!(f.registry.get(&id("3")).unwrap().is_on);
        f.dispatcher.toggle(&id("3")).await.unwrap();
        assert!(!f.registry.get(&id("3")).unwrap().is_on);
        assert_eq!(f.notifier.log().len(), 2);
    }

    #[tokio::test]
    async fn unknown_device_is_reported() {
        let f = fixture(true, BulkPolicy::default());
        assert!(matches!(
            f.dispatcher.set_power(&id("x"), true).await,
            Err(Error::DeviceNotFound(_))
        ));
        assert!(matches!(
            f.dispatcher.set_value(&id("x"), 5),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn bulk_force_all_logs_every_device() {
        let f = fixture(true, BulkPolicy::ForceAll);
        f.dispatcher.set_power(&id("1"), true).await.unwrap();

        let outcomes = f.dispatcher.set_all_power(true).await;
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|(_, o)| *o == DispatchOutcome::Applied));
        assert_eq!(f.notifier.log().len(), 5);
    }

    #[tokio::test]
    async fn bulk_skip_unchanged_leaves_matching_devices() {
        let f = fixture(true, BulkPolicy::SkipUnchanged);
        f.dispatcher.set_power(&id("1"), true).await.unwrap();

        let outcomes = f.dispatcher.set_all_power(true).await;
        let ids: Vec<&str> = outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["2", "3", "4"]);
        assert!(f.registry.list().iter().all(|d| d.is_on));
    }

    #[tokio::test]
    async fn busy_transport_drops_power_command() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/command"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let f = fixture(false, BulkPolicy::default());
        let address = server.address();
        let params = ConnectParams::LocalNetwork(
            LocalNetworkConfig::new(address.ip().to_string()).with_port(address.port()),
        );
        f.connection.connect(params, |_| {}).await.unwrap();

        let intent = f.registry.begin_power(&id("2"), true, false).unwrap().unwrap();
        let outcome = f
            .dispatcher
            .settle_power(&intent, Transmission::from(Err(TransportError::Busy)));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(outcome, DispatchOutcome::Dropped);
        assert!(f.registry.get(&id("2")).unwrap().is_on);
        let entries = f.notifier.log().entries();
        assert!(entries.iter().all(|e| e.action != LogAction::Error));
        assert_eq!(entries[0].action, LogAction::PowerOn);
        assert_eq!(entries[0].device_name, "Ceiling Fan");
        let state = f.connection.state();
        assert!(state.is_connected());
        assert_eq!(state.error, None);
        server.verify().await;
    }

    #[test]
    fn transport_results_map_to_transmissions() {
        assert!(matches!(Transmission::from(Ok(())), Transmission::Sent));
        assert!(matches!(
            Transmission::from(Err(TransportError::Busy)),
            Transmission::Busy
        ));
        assert!(matches!(
            Transmission::from(Err(TransportError::NotConnected)),
            Transmission::Skipped
        ));
        assert!(matches!(
            Transmission::from(Err(TransportError::WriteFailed("timeout".into()))),
            Transmission::Failed(reason) if reason == "timeout"
        ));
    }

    #[test]
    fn set_value_outside_runtime_updates_registry_only() {
        let f = fixture(false, BulkPolicy::default());

        let device = f.dispatcher.set_value(&id("2"), 65).unwrap();

        assert_eq!(device.value.value(), 65);
        assert_eq!(f.registry.get(&id("2")).unwrap().value.value(), 65);
        assert!(f.notifier.log().is_empty());
    }

    #[tokio::test]
    async fn set_value_clamps() {
        let f = fixture(true, BulkPolicy::default());
        assert_eq!(f.dispatcher.set_value(&id("1"), -5).unwrap().value, Level::MIN);
        assert_eq!(f.dispatcher.set_value(&id("1"), 500).unwrap().value, Level::MAX);
        assert_eq!(f.registry.get(&id("1")).unwrap().value.value(), 100);
        assert!(f.notifier.log().is_empty());
    }
}
