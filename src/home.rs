// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The engine facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::activity::{ActivityLog, LogAction, LogEntry};
use crate::config::HomeConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::device::{Device, DeviceSpec};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::event::{EventBus, HomeEvent, Notifier};
use crate::reconciler::Reconciler;
use crate::registry::DeviceRegistry;
use crate::transport::ConnectParams;
use crate::types::DeviceId;

/// Appliance control engine.
///
/// `Home` composes the device registry, the connection manager, the command
/// dispatcher, the reconciler and the activity log. It owns no business logic
/// of its own: every call is forwarded to the component responsible for it.
///
/// # Examples
///
/// ```
/// use hearthlink::{DeviceKind, DeviceSpec, Home, HomeConfig};
/// use hearthlink::transport::ConnectParams;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> hearthlink::Result<()> {
/// let home = Home::new(HomeConfig::new());
///
/// let lamp = home.add_device(
///     DeviceSpec::new("Lamp", DeviceKind::DimmableLight, "office")
///         .with_commands("LP:ON", "LP:OFF"),
/// )?;
///
/// home.connect(ConnectParams::demo()).await?;
/// home.set_power(&lamp.id, true).await?;
/// home.set_value(&lamp.id, 60)?;
///
/// assert!(home.device(&lamp.id).unwrap().is_on);
/// home.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct Home {
    registry: Arc<DeviceRegistry>,
    connection: Arc<ConnectionManager>,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    notifier: Notifier,
    environment: Arc<RwLock<Environment>>,
    demo_mode: Arc<AtomicBool>,
    drift_interval: Option<Duration>,
    drift: Mutex<Option<JoinHandle<()>>>,
}

impl Home {
    /// Creates an engine seeded with the configured devices.
    ///
    /// If environment drift is configured and demo mode starts enabled, the
    /// drift task is spawned on the current Tokio runtime.
    #[must_use]
    pub fn new(config: HomeConfig) -> Self {
        let log = Arc::new(ActivityLog::with_capacity(config.log_capacity()));
        let notifier = Notifier::new(log, config.announcer(), EventBus::new());

        let registry = Arc::new(DeviceRegistry::new(config.devices().to_vec()));
        let connection = Arc::new(ConnectionManager::new(notifier.clone()));
        let environment = Arc::new(RwLock::new(Environment::default()));
        let demo_mode = Arc::new(AtomicBool::new(config.demo_mode()));

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&connection),
            notifier.clone(),
            Arc::clone(&demo_mode),
            config.throttle_window(),
            config.bulk_policy(),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&registry),
            Arc::clone(&environment),
            notifier.clone(),
        );

        let home = Self {
            registry,
            connection,
            dispatcher,
            reconciler,
            notifier,
            environment,
            demo_mode,
            drift_interval: config.drift_interval(),
            drift: Mutex::new(None),
        };

        if config.demo_mode() {
            home.start_drift();
        }

        tracing::debug!(
            devices = home.registry.len(),
            demo_mode = config.demo_mode(),
            "Home created"
        );
        home
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Opens a transport. On success demo mode is turned off.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyConnected` while connected or connecting, and
    /// `Error::Transport` if the transport fails to open (including
    /// `TransportError::Cancelled` for a dismissed discovery).
    pub async fn connect(&self, params: ConnectParams) -> Result<ConnectionState> {
        let reconciler = self.reconciler.clone();
        let state = self
            .connection
            .connect(params, move |inbound| reconciler.handle(inbound))
            .await?;

        self.set_demo_mode(false);
        Ok(state)
    }

    /// Closes the transport. Returns `true` if one was open.
    pub async fn disconnect(&self) -> bool {
        self.dispatcher.cancel_pending();
        self.connection.disconnect().await
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection.state()
    }

    // ========================================================================
    // Devices
    // ========================================================================

    /// Adds a device, powered off at level 0.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if the device name is blank.
    pub fn add_device(&self, spec: DeviceSpec) -> Result<Device> {
        let device = spec.into_device()?;
        self.registry.add(device.clone());

        tracing::info!(device_id = %device.id, name = %device.name, "Device added");
        self.notifier.record_system(
            LogAction::ValueChange,
            Some(format!("Added device: {}", device.name)),
        );
        self.notifier.announce(format!("Added {}", device.name));
        self.notifier.publish(HomeEvent::DeviceAdded {
            device: device.clone(),
        });
        Ok(device)
    }

    /// Removes a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn remove_device(&self, id: &DeviceId) -> Result<Device> {
        let device = self
            .registry
            .remove(id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;

        tracing::info!(device_id = %device.id, name = %device.name, "Device removed");
        self.notifier.record_system(
            LogAction::ValueChange,
            Some(format!("Removed device: {}", device.name)),
        );
        self.notifier.publish(HomeEvent::DeviceRemoved {
            device_id: device.id.clone(),
        });
        Ok(device)
    }

    /// Returns all devices.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.registry.list()
    }

    /// Returns one device.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.registry.get(id)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Switches a device on or off; a no-op if already in that state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn set_power(&self, id: &DeviceId, on: bool) -> Result<DispatchOutcome> {
        self.dispatcher.set_power(id, on).await
    }

    /// Switches a device on or off, resending even if already in that state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn force_power(&self, id: &DeviceId, on: bool) -> Result<DispatchOutcome> {
        self.dispatcher.force_power(id, on).await
    }

    /// Inverts a device's power state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub async fn toggle(&self, id: &DeviceId) -> Result<DispatchOutcome> {
        self.dispatcher.toggle(id).await
    }

    /// Switches every device on or off.
    pub async fn set_all_power(&self, on: bool) -> Vec<(DeviceId, DispatchOutcome)> {
        self.dispatcher.set_all_power(on).await
    }

    /// Sets a device's level, clamped to 0-100.
    ///
    /// The transport write is scheduled as a task. Outside a Tokio runtime
    /// only the registry changes.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn set_value(&self, id: &DeviceId, value: i64) -> Result<Device> {
        self.dispatcher.set_value(id, value)
    }

    // ========================================================================
    // Demo mode and environment
    // ========================================================================

    /// Enables or disables demo mode.
    ///
    /// While enabled, commands change the registry but are never sent.
    pub fn set_demo_mode(&self, enabled: bool) {
        if self.demo_mode.swap(enabled, Ordering::AcqRel) == enabled {
            return;
        }

        tracing::info!(enabled, "Demo mode changed");
        if enabled {
            self.start_drift();
        } else {
            self.stop_drift();
        }
    }

    /// Returns `true` while demo mode is enabled.
    #[must_use]
    pub fn is_demo_mode(&self) -> bool {
        self.demo_mode.load(Ordering::Acquire)
    }

    /// Returns the ambient reading.
    #[must_use]
    pub fn environment(&self) -> Environment {
        *self.environment.read()
    }

    fn start_drift(&self) {
        let Some(period) = self.drift_interval else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime, environment drift disabled");
            return;
        };

        let mut drift = self.drift.lock();
        if drift.is_some() {
            return;
        }

        let environment = Arc::clone(&self.environment);
        let notifier = self.notifier.clone();
        *drift = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let next = {
                    let mut environment = environment.write();
                    *environment = environment.drifted(&mut rand::thread_rng());
                    *environment
                };
                notifier.publish(HomeEvent::EnvironmentChanged { environment: next });
            }
        }));
    }

    fn stop_drift(&self) {
        if let Some(task) = self.drift.lock().take() {
            task.abort();
        }
    }

    // ========================================================================
    // Activity and collaborators
    // ========================================================================

    /// Returns the activity log, newest entry first.
    #[must_use]
    pub fn activity(&self) -> Vec<LogEntry> {
        self.notifier.log().entries()
    }

    /// Empties the activity log.
    pub fn clear_log(&self) {
        self.notifier.clear_log();
    }

    /// Records an entry on behalf of a collaborator such as the voice
    /// capture or the assistant.
    pub fn record_activity(
        &self,
        action: LogAction,
        source: impl Into<String>,
        details: Option<String>,
    ) -> LogEntry {
        let entry = LogEntry::new(DeviceId::system(), source, action, details);
        self.notifier.record(entry.clone());
        entry
    }

    /// Records a sign-in.
    pub fn begin_session(&self, user: &str) {
        tracing::info!(user = %user, "Session started");
        self.notifier
            .record_system(LogAction::Login, Some(format!("User {user} logged in")));
    }

    /// Records a sign-out, disconnecting first if a transport is open.
    pub async fn end_session(&self, user: &str) {
        self.disconnect().await;
        tracing::info!(user = %user, "Session ended");
        self.notifier
            .record_system(LogAction::Logout, Some(format!("User {user} logged out")));
    }

    /// Subscribes to engine events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HomeEvent> {
        self.notifier.bus().subscribe()
    }
}

impl Drop for Home {
    fn drop(&mut self) {
        self.stop_drift();
        self.dispatcher.cancel_pending();
    }
}

impl std::fmt::Debug for Home {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Home")
            .field("devices", &self.registry.len())
            .field("connection", &self.connection.state())
            .field("demo_mode", &self.is_demo_mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceKind;

    #[test]
    fn starts_with_seed_devices_in_demo_mode() {
        let home = Home::new(HomeConfig::new());
        assert_eq!(home.devices().len(), 4);
        assert!(home.is_demo_mode());
        assert!(home.activity().is_empty());
        assert_eq!(home.environment(), Environment::default());
    }

    #[test]
    fn add_and_remove_log_system_entries() {
        let home = Home::new(HomeConfig::new());
        let device = home
            .add_device(DeviceSpec::new("Heater", DeviceKind::Switch, "garage"))
            .unwrap();

        home.remove_device(&device.id).unwrap();

        let details: Vec<_> = home
            .activity()
            .into_iter()
            .map(|e| e.details.unwrap_or_default())
            .collect();
        assert_eq!(details, ["Removed device: Heater", "Added device: Heater"]);
        assert!(matches!(
            home.remove_device(&device.id),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn invalid_spec_is_rejected() {
        let home = Home::new(HomeConfig::new());
        assert!(matches!(
            home.add_device(DeviceSpec::new("", DeviceKind::Switch, "hall")),
            Err(Error::Value(_))
        ));
        assert_eq!(home.devices().len(), 4);
    }

    #[test]
    fn set_value_without_runtime_does_not_panic() {
        let home = Home::new(HomeConfig::new());
        let id = DeviceId::from("1");

        assert_eq!(home.set_value(&id, 30).unwrap().value.value(), 30);
        assert_eq!(home.device(&id).unwrap().value.value(), 30);
    }

    #[test]
    fn record_activity_uses_source_name() {
        let home = Home::new(HomeConfig::new());
        let entry = home.record_activity(
            LogAction::VoiceCommand,
            "Voice",
            Some("turn on the fan".into()),
        );
        assert_eq!(entry.device_name, "Voice");
        assert_eq!(home.activity()[0], entry);
    }

    #[tokio::test]
    async fn session_hooks() {
        let home = Home::new(HomeConfig::new());
        home.begin_session("ada");
        home.connect(ConnectParams::demo()).await.unwrap();
        home.end_session("ada").await;

        let actions: Vec<_> = home.activity().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            [
                LogAction::Logout,
                LogAction::Disconnected,
                LogAction::Connected,
                LogAction::Login
            ]
        );
        assert!(!home.connection().connected);
    }

    #[tokio::test]
    async fn connect_turns_demo_mode_off() {
        let home = Home::new(HomeConfig::new());
        home.connect(ConnectParams::demo()).await.unwrap();
        assert!(!home.is_demo_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn drift_runs_only_in_demo_mode() {
        let home = Home::new(
            HomeConfig::new().with_environment_drift(Duration::from_secs(5)),
        );
        let mut events = home.subscribe();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(matches!(
            events.try_recv(),
            Ok(HomeEvent::EnvironmentChanged { .. })
        ));

        home.set_demo_mode(false);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(events.try_recv().is_err());
    }
}
