// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device registry.
//!
//! The registry is the single authority on device state. Every mutation is a
//! short critical section under one lock and returns a snapshot, so callers
//! never observe a half-applied change.
//!
//! Power changes are two-phase: [`DeviceRegistry::begin_power`] applies the
//! new state optimistically and hands back a [`PowerIntent`];
//! [`DeviceRegistry::revert`] undoes it only if nothing else touched that
//! device's power in between.

use parking_lot::Mutex;

use crate::command::RelayMessage;
use crate::device::Device;
use crate::error::Error;
use crate::types::{DeviceId, Level};

struct Entry {
    device: Device,
    /// Incremented by every power mutation of this device.
    power_revision: u64,
}

/// An optimistically applied power change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerIntent {
    /// Snapshot of the device after the change.
    pub device: Device,
    /// Power state before the change.
    pub previous: bool,
    revision: u64,
}

impl PowerIntent {
    /// Returns the requested power state.
    #[must_use]
    pub fn desired(&self) -> bool {
        self.device.is_on
    }
}

/// Result of merging a hardware report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedChange {
    /// Snapshot after the change.
    pub device: Device,
    /// New power state, if it changed.
    pub power: Option<bool>,
    /// New level, if it changed.
    pub value: Option<Level>,
}

/// Which devices a bulk power operation addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPolicy {
    /// Every device receives the command, even if already in that state.
    #[default]
    ForceAll,
    /// Devices already in the desired state are skipped.
    SkipUnchanged,
}

/// Authoritative list of devices.
///
/// # Examples
///
/// ```
/// use hearthlink::registry::DeviceRegistry;
/// use hearthlink::device::default_devices;
/// use hearthlink::types::DeviceId;
///
/// let registry = DeviceRegistry::new(default_devices());
/// let id = DeviceId::from("1");
///
/// let intent = registry.begin_power(&id, true, false).unwrap().unwrap();
/// assert!(registry.get(&id).unwrap().is_on);
///
/// registry.revert(&intent);
/// assert!(!registry.get(&id).unwrap().is_on);
/// ```
pub struct DeviceRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl DeviceRegistry {
    /// Creates a registry holding `devices`, in order.
    #[must_use]
    pub fn new(devices: Vec<Device>) -> Self {
        let entries = devices
            .into_iter()
            .map(|device| Entry {
                device,
                power_revision: 0,
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Returns snapshots of all devices, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Device> {
        self.entries.lock().iter().map(|e| e.device.clone()).collect()
    }

    /// Returns a snapshot of one device.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.entries
            .lock()
            .iter()
            .find(|e| &e.device.id == id)
            .map(|e| e.device.clone())
    }

    /// Returns the number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the registry holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Appends a device.
    pub fn add(&self, device: Device) {
        self.entries.lock().push(Entry {
            device,
            power_revision: 0,
        });
    }

    /// Removes a device, returning its last snapshot.
    pub fn remove(&self, id: &DeviceId) -> Option<Device> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|e| &e.device.id == id)?;
        Some(entries.remove(index).device)
    }

    /// Applies a power change optimistically.
    ///
    /// Returns `Ok(None)` if the device is already in the desired state and
    /// `force` is `false`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn begin_power(
        &self,
        id: &DeviceId,
        desired: bool,
        force: bool,
    ) -> Result<Option<PowerIntent>, Error> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| &e.device.id == id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;

        if entry.device.is_on == desired && !force {
            return Ok(None);
        }

        let previous = entry.device.is_on;
        entry.device.is_on = desired;
        entry.power_revision += 1;

        Ok(Some(PowerIntent {
            device: entry.device.clone(),
            previous,
            revision: entry.power_revision,
        }))
    }

    /// Inverts a device's power state.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn begin_toggle(&self, id: &DeviceId) -> Result<PowerIntent, Error> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| &e.device.id == id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;

        let previous = entry.device.is_on;
        entry.device.is_on = !previous;
        entry.power_revision += 1;

        Ok(PowerIntent {
            device: entry.device.clone(),
            previous,
            revision: entry.power_revision,
        })
    }

    /// Undoes an optimistic power change.
    ///
    /// Does nothing and returns `None` if the device was removed or its power
    /// was mutated again after `intent` was applied.
    pub fn revert(&self, intent: &PowerIntent) -> Option<Device> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.device.id == intent.device.id)?;

        if entry.power_revision != intent.revision {
            return None;
        }

        entry.device.is_on = intent.previous;
        entry.power_revision += 1;
        Some(entry.device.clone())
    }

    /// Sets a device's level.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown id.
    pub fn set_value(&self, id: &DeviceId, value: Level) -> Result<Device, Error> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| &e.device.id == id)
            .ok_or_else(|| Error::DeviceNotFound(id.clone()))?;

        entry.device.value = value;
        Ok(entry.device.clone())
    }

    /// Merges a hardware report.
    ///
    /// Returns `None` for unknown devices and for reports that match the
    /// current state.
    pub fn apply_report(&self, report: &RelayMessage) -> Option<ReportedChange> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.device.id == report.device_id)?;

        let power = report.state.filter(|&on| on != entry.device.is_on);
        let value = report
            .value
            .map(Level::from_reading)
            .filter(|&v| v != entry.device.value);

        if power.is_none() && value.is_none() {
            return None;
        }

        if let Some(on) = power {
            entry.device.is_on = on;
            entry.power_revision += 1;
        }
        if let Some(value) = value {
            entry.device.value = value;
        }

        Some(ReportedChange {
            device: entry.device.clone(),
            power,
            value,
        })
    }

    /// Returns the ids a bulk power operation addresses.
    #[must_use]
    pub fn bulk_targets(&self, desired: bool, policy: BulkPolicy) -> Vec<DeviceId> {
        self.entries
            .lock()
            .iter()
            .filter(|e| policy == BulkPolicy::ForceAll || e.device.is_on != desired)
            .map(|e| e.device.id.clone())
            .collect()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Origin;
    use crate::device::default_devices;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(default_devices())
    }

    fn id(s: &str) -> DeviceId {
        DeviceId::from(s)
    }

    fn report(device: &str, state: Option<bool>, value: Option<f64>) -> RelayMessage {
        RelayMessage {
            device_id: id(device),
            state,
            value,
            source: Origin::Hardware,
        }
    }

    // ========================================================================
    // Power intents
    // ========================================================================

    #[test]
    fn unchanged_power_is_a_no_op() {
        let registry = registry();
        assert_eq!(registry.begin_power(&id("1"), false, false).unwrap(), None);
    }

    #[test]
    fn forced_power_applies_even_when_unchanged() {
        let registry = registry();
        let intent = registry.begin_power(&id("1"), false, true).unwrap().unwrap();
        assert!(!intent.previous);
        assert!(!intent.desired());
    }

    #[test]
    fn unknown_device_is_an_error() {
        let registry = registry();
        assert!(matches!(
            registry.begin_power(&id("nope"), true, false),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn revert_restores_previous_state() {
        let registry = registry();
        let intent = registry.begin_power(&id("2"), true, false).unwrap().unwrap();

        let reverted = registry.revert(&intent).unwrap();
        assert!(!reverted.is_on);
        assert!(!registry.get(&id("2")).unwrap().is_on);
    }

    #[test]
    fn revert_is_skipped_after_later_mutation() {
        let registry = registry();
        let first = registry.begin_power(&id("2"), true, false).unwrap().unwrap();
        let _second = registry.begin_power(&id("2"), false, false).unwrap().unwrap();
        registry.begin_power(&id("2"), true, false).unwrap().unwrap();

        assert_eq!(registry.revert(&first), None);
        assert!(registry.get(&id("2")).unwrap().is_on);
    }

    #[test]
    fn hardware_report_invalidates_pending_intent() {
        let registry = registry();
        let intent = registry.begin_power(&id("3"), true, false).unwrap().unwrap();
        registry.apply_report(&report("3", Some(false), None)).unwrap();

        assert_eq!(registry.revert(&intent), None);
    }

    #[test]
    fn toggle_inverts() {
        let registry = registry();
        assert!(registry.begin_toggle(&id("4")).unwrap().desired());
        assert!(!registry.begin_toggle(&id("4")).unwrap().desired());
    }

    // ========================================================================
    // Values and reports
    // ========================================================================

    #[test]
    fn set_value_stores_level() {
        let registry = registry();
        let device = registry.set_value(&id("1"), Level::clamped(500)).unwrap();
        assert_eq!(device.value, Level::MAX);
    }

    #[test]
    fn report_without_change_is_discarded() {
        let registry = registry();
        assert_eq!(registry.apply_report(&report("1", Some(false), Some(80.0))), None);
        assert_eq!(registry.apply_report(&report("1", None, None)), None);
    }

    #[test]
    fn report_for_unknown_device_is_discarded() {
        let registry = registry();
        assert_eq!(registry.apply_report(&report("99", Some(true), None)), None);
    }

    #[test]
    fn report_values_are_clamped() {
        let registry = registry();
        let change = registry
            .apply_report(&report("2", None, Some(250.0)))
            .unwrap();
        assert_eq!(change.value, Some(Level::MAX));
        assert_eq!(change.power, None);
    }

    #[test]
    fn report_applies_only_changed_fields() {
        let registry = registry();
        let change = registry
            .apply_report(&report("1", Some(true), Some(80.0)))
            .unwrap();
        assert_eq!(change.power, Some(true));
        assert_eq!(change.value, None);
        assert!(change.device.is_on);
    }

    // ========================================================================
    // Membership
    // ========================================================================

    #[test]
    fn add_and_remove() {
        let registry = registry();
        let mut device = default_devices().remove(0);
        device.id = id("5");
        registry.add(device);
        assert_eq!(registry.len(), 5);

        assert_eq!(registry.remove(&id("5")).unwrap().id, id("5"));
        assert_eq!(registry.remove(&id("5")), None);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn bulk_targets_follow_policy() {
        let registry = registry();
        registry.begin_power(&id("1"), true, false).unwrap();

        assert_eq!(registry.bulk_targets(true, BulkPolicy::ForceAll).len(), 4);
        assert_eq!(
            registry.bulk_targets(true, BulkPolicy::SkipUnchanged),
            vec![id("2"), id("3"), id("4")]
        );
    }
}
