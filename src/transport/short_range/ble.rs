// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bluetooth Low Energy implementation of the short-range transport.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    ValueNotification, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt as _};

use super::{
    DiscoveredPeripheral, NOTIFY_CHARACTERISTIC_UUID, SERVICE_UUID, ShortRangeConfig,
    UNKNOWN_DEVICE_NAME, WRITE_CHARACTERISTIC_UUID, WriteGate, resolve_selection,
};
use crate::error::TransportError;
use crate::transport::{Inbound, ListenerSlots, Payload, Transport, TransportKind};

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;
type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

/// BLE UART transport.
pub struct ShortRangeTransport {
    peripheral: Peripheral,
    write_characteristic: Characteristic,
    endpoint: String,
    gate: WriteGate,
    open: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ShortRangeTransport {
    fn stop_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

/// Returns the first Bluetooth adapter of the host.
async fn first_adapter() -> Result<Adapter, TransportError> {
    let unsupported = |e: btleplug::Error| TransportError::Unsupported(e.to_string());

    let manager = Manager::new().await.map_err(unsupported)?;
    manager
        .adapters()
        .await
        .map_err(unsupported)?
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Unsupported("no Bluetooth adapter found".to_string()))
}

/// Scans for peripherals advertising the UART service.
async fn scan(
    central: &Adapter,
    config: &ShortRangeConfig,
) -> Result<Vec<(DiscoveredPeripheral, Peripheral)>, TransportError> {
    let unsupported = |e: btleplug::Error| TransportError::Unsupported(e.to_string());

    central
        .start_scan(ScanFilter {
            services: vec![SERVICE_UUID],
        })
        .await
        .map_err(unsupported)?;

    tokio::time::sleep(config.scan_duration()).await;

    let peripherals = central.peripherals().await.map_err(unsupported)?;

    if let Err(err) = central.stop_scan().await {
        tracing::warn!(%err, "Failed to stop BLE scan");
    }

    let mut found = Vec::new();
    for peripheral in peripherals {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        if !props.services.contains(&SERVICE_UUID) {
            continue;
        }
        let discovered = DiscoveredPeripheral {
            name: props.local_name,
            address: props.address.to_string(),
        };
        tracing::debug!(address = %discovered.address, name = ?discovered.name, "BLE peripheral found");
        found.push((discovered, peripheral));
    }

    Ok(found)
}

/// Forwards notifications as text lines.
async fn forward_notifications(mut notifications: NotificationStream, listeners: Arc<ListenerSlots>) {
    while let Some(notification) = notifications.next().await {
        if notification.uuid != NOTIFY_CHARACTERISTIC_UUID {
            continue;
        }
        let text = String::from_utf8_lossy(&notification.value);
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            tracing::trace!(line = %line, "BLE notification");
            listeners.deliver(Inbound::Text(line.to_string()));
        }
    }
}

/// Fires the lost-connection listener when the adapter reports the
/// peripheral gone.
async fn watch_disconnect(
    mut events: EventStream,
    id: PeripheralId,
    open: Arc<AtomicBool>,
    listeners: Arc<ListenerSlots>,
) {
    while let Some(event) = events.next().await {
        if let CentralEvent::DeviceDisconnected(gone) = event
            && gone == id
        {
            if open.swap(false, Ordering::AcqRel) {
                tracing::warn!("BLE peripheral disconnected unexpectedly");
                listeners.connection_lost();
            }
            break;
        }
    }
}

impl Transport for ShortRangeTransport {
    type Config = ShortRangeConfig;

    async fn connect(
        config: ShortRangeConfig,
        listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        let central = first_adapter().await?;
        let (candidates, mut peripherals): (Vec<_>, Vec<_>) =
            scan(&central, &config).await?.into_iter().unzip();

        let index = resolve_selection(config.chooser().choose(&candidates), candidates.len())?;
        let peripheral = peripherals.swap_remove(index);
        let endpoint = candidates[index].display_name().to_string();

        tracing::info!(endpoint = %endpoint, "Connecting to BLE peripheral");

        peripheral
            .connect()
            .await
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        if let Err(err) = peripheral.discover_services().await {
            // Ignore errors: the link is being abandoned
            let _ = peripheral.disconnect().await;
            return Err(TransportError::HandshakeFailed(err.to_string()));
        }

        let characteristics = peripheral.characteristics();
        let Some(write_characteristic) = characteristics
            .iter()
            .find(|c| c.uuid == WRITE_CHARACTERISTIC_UUID)
            .cloned()
        else {
            let _ = peripheral.disconnect().await;
            return Err(TransportError::HandshakeFailed(
                "write characteristic not found".to_string(),
            ));
        };

        let open = Arc::new(AtomicBool::new(true));
        let mut tasks = Vec::new();

        // Inbound is best effort: a peripheral that cannot notify still
        // accepts commands
        match characteristics
            .iter()
            .find(|c| c.uuid == NOTIFY_CHARACTERISTIC_UUID)
        {
            Some(notify) => match peripheral.subscribe(notify).await {
                Ok(()) => match peripheral.notifications().await {
                    Ok(stream) => tasks.push(tokio::spawn(forward_notifications(
                        stream,
                        Arc::clone(&listeners),
                    ))),
                    Err(err) => tracing::warn!(%err, "BLE notifications unavailable"),
                },
                Err(err) => tracing::warn!(%err, "Failed to subscribe to BLE notifications"),
            },
            None => tracing::warn!("Notify characteristic not found"),
        }

        match central.events().await {
            Ok(events) => tasks.push(tokio::spawn(watch_disconnect(
                events,
                peripheral.id(),
                Arc::clone(&open),
                listeners,
            ))),
            Err(err) => tracing::warn!(%err, "BLE adapter events unavailable"),
        }

        Ok(Self {
            peripheral,
            write_characteristic,
            endpoint,
            gate: WriteGate::default(),
            open,
            tasks: Mutex::new(tasks),
        })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::ShortRange
    }

    fn endpoint(&self) -> &str {
        if self.endpoint.is_empty() {
            UNKNOWN_DEVICE_NAME
        } else {
            &self.endpoint
        }
    }

    async fn send_command(&self, payload: &Payload) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }

        let Some(_guard) = self.gate.try_acquire() else {
            tracing::debug!("BLE write in flight, dropping command");
            return Err(TransportError::Busy);
        };

        let text = payload.to_text();
        tracing::debug!(payload = %text, "Writing BLE command");

        self.peripheral
            .write(
                &self.write_characteristic,
                text.as_bytes(),
                WriteType::WithResponse,
            )
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn disconnect(&self) {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        self.stop_tasks();

        if was_open {
            if let Err(err) = self.peripheral.disconnect().await {
                tracing::warn!(%err, "Failed to disconnect BLE peripheral");
            }
            tracing::info!(endpoint = %self.endpoint, "BLE transport closed");
        }
    }
}

impl Drop for ShortRangeTransport {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
        self.stop_tasks();
    }
}

impl fmt::Debug for ShortRangeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortRangeTransport")
            .field("endpoint", &self.endpoint)
            .field("open", &self.open.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
