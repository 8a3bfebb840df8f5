// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::activity::DEFAULT_LOG_CAPACITY;
use crate::device::{Device, default_devices};
use crate::dispatcher::DEFAULT_THROTTLE_WINDOW;
use crate::event::{Announcer, TracingAnnouncer};
use crate::registry::BulkPolicy;

/// Configuration for a [`Home`](crate::Home).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hearthlink::HomeConfig;
/// use hearthlink::registry::BulkPolicy;
///
/// // Defaults: demo mode on, four seed devices, 100 log entries
/// let config = HomeConfig::new();
/// assert!(config.demo_mode());
/// assert_eq!(config.devices().len(), 4);
///
/// // Tuned for a live installation
/// let config = HomeConfig::new()
///     .with_demo_mode(false)
///     .with_log_capacity(500)
///     .with_throttle_window(Duration::from_millis(100))
///     .with_bulk_policy(BulkPolicy::SkipUnchanged)
///     .with_announcer(|text: &str| println!("{text}"));
/// ```
#[derive(Clone)]
pub struct HomeConfig {
    log_capacity: usize,
    throttle_window: Duration,
    demo_mode: bool,
    bulk_policy: BulkPolicy,
    devices: Vec<Device>,
    drift_interval: Option<Duration>,
    announcer: Arc<dyn Announcer>,
}

impl HomeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            demo_mode: true,
            bulk_policy: BulkPolicy::default(),
            devices: default_devices(),
            drift_interval: None,
            announcer: Arc::new(TracingAnnouncer),
        }
    }

    /// Sets how many activity entries are kept.
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Sets the minimum spacing between level writes.
    #[must_use]
    pub fn with_throttle_window(mut self, window: Duration) -> Self {
        self.throttle_window = window;
        self
    }

    /// Sets whether the engine starts in demo mode.
    #[must_use]
    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    /// Sets which devices bulk power operations address.
    #[must_use]
    pub fn with_bulk_policy(mut self, policy: BulkPolicy) -> Self {
        self.bulk_policy = policy;
        self
    }

    /// Replaces the seed devices.
    #[must_use]
    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    /// Enables the demo-mode environment drift with the given period.
    #[must_use]
    pub fn with_environment_drift(mut self, interval: Duration) -> Self {
        self.drift_interval = Some(interval);
        self
    }

    /// Sets the announcer.
    #[must_use]
    pub fn with_announcer(mut self, announcer: impl Announcer + 'static) -> Self {
        self.announcer = Arc::new(announcer);
        self
    }

    /// Returns the activity log capacity.
    #[must_use]
    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    /// Returns the throttle window.
    #[must_use]
    pub fn throttle_window(&self) -> Duration {
        self.throttle_window
    }

    /// Returns whether demo mode starts enabled.
    #[must_use]
    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// Returns the bulk policy.
    #[must_use]
    pub fn bulk_policy(&self) -> BulkPolicy {
        self.bulk_policy
    }

    /// Returns the seed devices.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns the environment drift period, if enabled.
    #[must_use]
    pub fn drift_interval(&self) -> Option<Duration> {
        self.drift_interval
    }

    pub(crate) fn announcer(&self) -> Arc<dyn Announcer> {
        Arc::clone(&self.announcer)
    }
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HomeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeConfig")
            .field("log_capacity", &self.log_capacity)
            .field("throttle_window", &self.throttle_window)
            .field("demo_mode", &self.demo_mode)
            .field("bulk_policy", &self.bulk_policy)
            .field("devices", &self.devices.len())
            .field("drift_interval", &self.drift_interval)
            .finish_non_exhaustive()
    }
}
