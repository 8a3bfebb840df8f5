// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Short-range transport over a Bluetooth Low Energy UART service.
//!
//! The peripheral exposes a Nordic-style UART service: one characteristic
//! receives text commands, another notifies text lines back. Connecting is
//! user-mediated: the adapter scans, then a [`PeripheralChooser`] picks one
//! of the candidates or cancels.
//!
//! The radio implementation requires the `bluetooth` feature. Without it,
//! connecting fails with `TransportError::Unsupported`.

#[cfg(feature = "bluetooth")]
mod ble;
#[cfg(not(feature = "bluetooth"))]
mod unsupported;

#[cfg(feature = "bluetooth")]
pub use ble::ShortRangeTransport;
#[cfg(not(feature = "bluetooth"))]
pub use unsupported::ShortRangeTransport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

#[cfg(any(feature = "bluetooth", test))]
use crate::error::TransportError;

/// UART service advertised by compatible peripherals.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Characteristic receiving text commands.
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Characteristic notifying text lines.
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Endpoint descriptor for peripherals without an advertised name.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// A peripheral found while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeripheral {
    /// Advertised local name.
    pub name: Option<String>,
    /// Hardware address.
    pub address: String,
}

impl DiscoveredPeripheral {
    /// Returns the advertised name, or [`UNKNOWN_DEVICE_NAME`].
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_DEVICE_NAME)
    }
}

/// Outcome of the user-mediated discovery step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the candidate list.
    Selected(usize),
    /// The user dismissed the chooser.
    Cancelled,
}

/// Picks one peripheral among the scan results.
///
/// # Examples
///
/// ```
/// use hearthlink::transport::{DiscoveredPeripheral, Selection, ShortRangeConfig};
///
/// // Prefer the peripheral called "HomeHub", otherwise cancel.
/// let config = ShortRangeConfig::new().with_chooser(|candidates: &[DiscoveredPeripheral]| {
///     candidates
///         .iter()
///         .position(|p| p.name.as_deref() == Some("HomeHub"))
///         .map_or(Selection::Cancelled, Selection::Selected)
/// });
/// ```
pub trait PeripheralChooser: Send + Sync {
    /// Chooses a candidate or cancels.
    fn choose(&self, candidates: &[DiscoveredPeripheral]) -> Selection;
}

impl<F> PeripheralChooser for F
where
    F: Fn(&[DiscoveredPeripheral]) -> Selection + Send + Sync,
{
    fn choose(&self, candidates: &[DiscoveredPeripheral]) -> Selection {
        self(candidates)
    }
}

/// Chooser that takes the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPeripheral;

impl PeripheralChooser for FirstPeripheral {
    fn choose(&self, _candidates: &[DiscoveredPeripheral]) -> Selection {
        Selection::Selected(0)
    }
}

/// Configuration for the short-range transport.
#[derive(Clone)]
pub struct ShortRangeConfig {
    scan_duration: Duration,
    chooser: Arc<dyn PeripheralChooser>,
}

impl ShortRangeConfig {
    /// Default scan duration.
    pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(3);

    /// Creates a configuration that scans for the default duration and picks
    /// the first peripheral found.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scan_duration: Self::DEFAULT_SCAN_DURATION,
            chooser: Arc::new(FirstPeripheral),
        }
    }

    /// Sets how long to scan before choosing.
    #[must_use]
    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Sets the chooser.
    #[must_use]
    pub fn with_chooser(mut self, chooser: impl PeripheralChooser + 'static) -> Self {
        self.chooser = Arc::new(chooser);
        self
    }

    /// Returns the scan duration.
    #[must_use]
    pub fn scan_duration(&self) -> Duration {
        self.scan_duration
    }

    /// Returns the chooser.
    #[must_use]
    pub fn chooser(&self) -> &dyn PeripheralChooser {
        self.chooser.as_ref()
    }
}

impl Default for ShortRangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShortRangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortRangeConfig")
            .field("scan_duration", &self.scan_duration)
            .finish_non_exhaustive()
    }
}

/// Maps a chooser outcome onto the candidate list.
#[cfg(any(feature = "bluetooth", test))]
fn resolve_selection(selection: Selection, candidates: usize) -> Result<usize, TransportError> {
    match selection {
        Selection::Cancelled => Err(TransportError::Cancelled),
        Selection::Selected(index) if index < candidates => Ok(index),
        Selection::Selected(_) => Err(TransportError::DeviceNotSelected),
    }
}

/// Admits one write at a time.
#[cfg(any(feature = "bluetooth", test))]
#[derive(Debug, Default)]
struct WriteGate {
    busy: std::sync::atomic::AtomicBool,
}

#[cfg(any(feature = "bluetooth", test))]
impl WriteGate {
    /// Claims the gate, or returns `None` while a write is in flight.
    fn try_acquire(&self) -> Option<WriteGuard<'_>> {
        use std::sync::atomic::Ordering;

        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| WriteGuard { gate: self })
    }
}

/// Releases the gate on drop.
#[cfg(any(feature = "bluetooth", test))]
struct WriteGuard<'a> {
    gate: &'a WriteGate,
}

#[cfg(any(feature = "bluetooth", test))]
impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.gate
            .busy
            .store(false, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uart_uuids() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "6e400001-b5a3-f393-e0a9-e50e24dcca9e"
        );
        assert_eq!(
            WRITE_CHARACTERISTIC_UUID.to_string(),
            "6e400002-b5a3-f393-e0a9-e50e24dcca9e"
        );
        assert_eq!(
            NOTIFY_CHARACTERISTIC_UUID.to_string(),
            "6e400003-b5a3-f393-e0a9-e50e24dcca9e"
        );
    }

    #[test]
    fn selection_resolution() {
        assert_eq!(resolve_selection(Selection::Selected(1), 2), Ok(1));
        assert_eq!(
            resolve_selection(Selection::Selected(2), 2),
            Err(TransportError::DeviceNotSelected)
        );
        assert_eq!(
            resolve_selection(Selection::Selected(0), 0),
            Err(TransportError::DeviceNotSelected)
        );
        assert_eq!(
            resolve_selection(Selection::Cancelled, 3),
            Err(TransportError::Cancelled)
        );
    }

    #[test]
    fn unnamed_peripheral_display_name() {
        let peripheral = DiscoveredPeripheral {
            name: None,
            address: "AA:BB:CC:DD:EE:FF".into(),
        };
        assert_eq!(peripheral.display_name(), "Unknown Device");
    }

    #[test]
    fn closure_chooser() {
        let config = ShortRangeConfig::new().with_chooser(|_: &[DiscoveredPeripheral]| Selection::Cancelled);
        assert_eq!(config.chooser().choose(&[]), Selection::Cancelled);
        assert_eq!(config.scan_duration(), Duration::from_secs(3));
    }

    #[test]
    fn write_gate_admits_one_writer() {
        let gate = WriteGate::default();

        let first = gate.try_acquire();
        assert!(first.is_some());
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert!(gate.try_acquire().is_some());
    }
}
