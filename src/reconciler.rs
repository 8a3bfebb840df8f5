// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging of unsolicited hardware data.
//!
//! Two inbound shapes reach the reconciler:
//!
//! - text lines from byte-stream transports, of which only `T:<celsius>`
//!   temperature reports are understood;
//! - relay records, merged into the registry when they change something.
//!
//! A hardware-origin change produces exactly one `PHYSICAL_SWITCH` entry and
//! one announcement; a report that matches the registry produces nothing.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::activity::LogAction;
use crate::command::RelayMessage;
use crate::environment::Environment;
use crate::event::{HomeEvent, Notifier};
use crate::registry::{DeviceRegistry, ReportedChange};
use crate::transport::Inbound;

/// Applies inbound hardware data to the registry and the environment.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Arc<DeviceRegistry>,
    environment: Arc<RwLock<Environment>>,
    notifier: Notifier,
}

impl Reconciler {
    pub(crate) fn new(
        registry: Arc<DeviceRegistry>,
        environment: Arc<RwLock<Environment>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            registry,
            environment,
            notifier,
        }
    }

    /// Handles one inbound item.
    pub fn handle(&self, inbound: Inbound) {
        match inbound {
            Inbound::Text(line) => {
                self.handle_line(&line);
            }
            Inbound::Message(message) => {
                self.handle_message(&message);
            }
        }
    }

    /// Handles a text line. Returns the new temperature if the line was a
    /// temperature report.
    pub fn handle_line(&self, line: &str) -> Option<f32> {
        let Some(temperature) = Environment::parse_temperature_line(line) else {
            tracing::trace!(line = %line, "Ignoring inbound line");
            return None;
        };

        let environment = {
            let mut environment = self.environment.write();
            *environment = environment.with_temperature(temperature);
            *environment
        };

        tracing::debug!(temperature, "Temperature report");
        self.notifier
            .publish(HomeEvent::EnvironmentChanged { environment });
        Some(temperature)
    }

    /// Handles a relay record. Returns the change it caused, if any.
    pub fn handle_message(&self, message: &RelayMessage) -> Option<ReportedChange> {
        let Some(change) = self.registry.apply_report(message) else {
            tracing::trace!(device_id = %message.device_id, "Report changes nothing");
            return None;
        };

        let device = &change.device;
        tracing::debug!(
            device_id = %device.id,
            power = ?change.power,
            value = ?change.value,
            source = ?message.source,
            "Device reported change"
        );

        self.notifier.publish(HomeEvent::DeviceChanged {
            device: device.clone(),
            origin: message.source,
        });

        if message.source.is_hardware() {
            let details = match change.power {
                Some(true) => "On (hardware)".to_string(),
                Some(false) => "Off (hardware)".to_string(),
                None => format!("Value {}", device.value),
            };
            self.notifier
                .record_device(device, LogAction::PhysicalSwitch, Some(details));

            let state = if device.is_on { "on" } else { "off" };
            self.notifier
                .announce(format!("{} turned {state} manually", device.name));
        }

        Some(change)
    }
}
