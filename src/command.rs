// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands and wire payloads.
//!
//! A [`Command`] is the transient intent to change one device. Before it
//! reaches a transport it is rendered into a [`Payload`]: byte-stream
//! transports (short-range, local network) receive text such as `L1:ON` or
//! `L1:VAL:75`, the relay receives a JSON [`RelayMessage`].
//!
//! # Examples
//!
//! ```
//! use hearthlink::command::Command;
//! use hearthlink::device::default_devices;
//! use hearthlink::transport::{Payload, TransportKind};
//!
//! let light = &default_devices()[0];
//! let command = Command::power(light.id.clone(), true);
//!
//! assert_eq!(
//!     command.payload_for(light, TransportKind::LocalNetwork),
//!     Some(Payload::Text("L1:ON".to_string())),
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::transport::{Payload, TransportKind};
use crate::types::{DeviceId, Level};

/// Who caused a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Issued by this application.
    #[serde(rename = "app")]
    Application,
    /// Reported by the hardware, e.g. a physical switch.
    #[serde(rename = "arduino")]
    Hardware,
}

impl Origin {
    /// Returns `true` for hardware-origin changes.
    #[must_use]
    pub fn is_hardware(self) -> bool {
        matches!(self, Self::Hardware)
    }
}

/// JSON record exchanged with the relay.
///
/// ```json
/// {"deviceId": "2", "state": true, "value": 40, "source": "arduino"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    /// Target device.
    pub device_id: DeviceId,
    /// Power state, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    /// Analog level, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Who produced the record.
    pub source: Origin,
}

impl RelayMessage {
    /// Creates a hardware-origin power report.
    #[must_use]
    pub fn hardware_power(device_id: DeviceId, on: bool) -> Self {
        Self {
            device_id,
            state: Some(on),
            value: None,
            source: Origin::Hardware,
        }
    }
}

/// Intent to change one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Target device.
    pub device_id: DeviceId,
    /// Desired power state.
    pub power: Option<bool>,
    /// Desired analog level.
    pub value: Option<Level>,
    /// Who issued the command.
    pub origin: Origin,
}

impl Command {
    /// Creates an application-origin power command.
    #[must_use]
    pub fn power(device_id: DeviceId, on: bool) -> Self {
        Self {
            device_id,
            power: Some(on),
            value: None,
            origin: Origin::Application,
        }
    }

    /// Creates an application-origin level command.
    #[must_use]
    pub fn value(device_id: DeviceId, value: Level) -> Self {
        Self {
            device_id,
            power: None,
            value: Some(value),
            origin: Origin::Application,
        }
    }

    /// Renders the command for a transport.
    ///
    /// Returns `None` for hardware-origin commands, which are never echoed
    /// back, and for commands that carry neither power nor value.
    #[must_use]
    pub fn payload_for(&self, device: &Device, kind: TransportKind) -> Option<Payload> {
        if self.origin.is_hardware() {
            return None;
        }
        match kind {
            TransportKind::ShortRange | TransportKind::LocalNetwork => {
                let text = match (self.power, self.value) {
                    (Some(on), _) => device.power_command(on).to_string(),
                    (None, Some(value)) => device.value_command(value),
                    (None, None) => return None,
                };
                Some(Payload::Text(text))
            }
            TransportKind::Relay => {
                if self.power.is_none() && self.value.is_none() {
                    return None;
                }
                Some(Payload::Message(RelayMessage {
                    device_id: self.device_id.clone(),
                    state: self.power,
                    value: self.value.map(|v| f64::from(v.value())),
                    source: self.origin,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::default_devices;

    #[test]
    fn origin_wire_names() {
        assert_eq!(serde_json::to_string(&Origin::Application).unwrap(), "\"app\"");
        assert_eq!(serde_json::to_string(&Origin::Hardware).unwrap(), "\"arduino\"");
    }

    #[test]
    fn relay_message_parses_partial_records() {
        let msg: RelayMessage =
            serde_json::from_str(r#"{"deviceId":"2","state":true,"source":"arduino"}"#).unwrap();
        assert_eq!(msg.device_id.as_str(), "2");
        assert_eq!(msg.state, Some(true));
        assert_eq!(msg.value, None);
        assert_eq!(msg.source, Origin::Hardware);
    }

    #[test]
    fn relay_message_omits_absent_fields() {
        let json = serde_json::to_string(&RelayMessage {
            device_id: DeviceId::from("3"),
            state: None,
            value: Some(40.0),
            source: Origin::Application,
        })
        .unwrap();
        assert_eq!(json, r#"{"deviceId":"3","value":40.0,"source":"app"}"#);
    }

    #[test]
    fn text_payloads_for_byte_stream_transports() {
        let fan = &default_devices()[1];
        let off = Command::power(fan.id.clone(), false);
        let speed = Command::value(fan.id.clone(), Level::clamped(55));

        assert_eq!(
            off.payload_for(fan, TransportKind::ShortRange),
            Some(Payload::Text("F1:OFF".into()))
        );
        assert_eq!(
            speed.payload_for(fan, TransportKind::LocalNetwork),
            Some(Payload::Text("F1:VAL:55".into()))
        );
    }

    #[test]
    fn relay_payload_carries_application_origin() {
        let light = &default_devices()[0];
        let payload = Command::power(light.id.clone(), true)
            .payload_for(light, TransportKind::Relay)
            .unwrap();

        let Payload::Message(msg) = payload else {
            panic!("expected relay message");
        };
        assert_eq!(msg.state, Some(true));
        assert_eq!(msg.value, None);
        assert_eq!(msg.source, Origin::Application);
    }

    #[test]
    fn hardware_commands_are_never_echoed() {
        let light = &default_devices()[0];
        let mut command = Command::power(light.id.clone(), true);
        command.origin = Origin::Hardware;
        assert_eq!(command.payload_for(light, TransportKind::Relay), None);
    }
}
