// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Short-range transport for builds without Bluetooth support.

use std::sync::Arc;

use super::{ShortRangeConfig, UNKNOWN_DEVICE_NAME};
use crate::error::TransportError;
use crate::transport::{ListenerSlots, Payload, Transport, TransportKind};

/// Short-range transport placeholder. Connecting always fails with
/// `TransportError::Unsupported`; enable the `bluetooth` feature for the
/// real adapter.
#[derive(Debug)]
pub struct ShortRangeTransport {
    _private: (),
}

impl Transport for ShortRangeTransport {
    type Config = ShortRangeConfig;

    async fn connect(
        _config: ShortRangeConfig,
        _listeners: Arc<ListenerSlots>,
    ) -> Result<Self, TransportError> {
        tracing::warn!("Bluetooth requested but the `bluetooth` feature is disabled");
        Err(TransportError::Unsupported(
            "Bluetooth support is not compiled in".to_string(),
        ))
    }

    fn kind(&self) -> TransportKind {
        TransportKind::ShortRange
    }

    fn endpoint(&self) -> &str {
        UNKNOWN_DEVICE_NAME
    }

    async fn send_command(&self, _payload: &Payload) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }

    async fn disconnect(&self) {}
}
