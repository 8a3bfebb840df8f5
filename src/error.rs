// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `hearthlink` library.
//!
//! The hierarchy mirrors the layers of the engine: value validation for
//! device definitions, transport failures reported by the three adapters,
//! and the top-level [`Error`] returned by the [`Home`](crate::Home) API.

use thiserror::Error;

use crate::types::DeviceId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A device definition or value failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A transport adapter failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No device with this id exists in the registry.
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// A transport is already connected or a connection attempt is running.
    ///
    /// Switching transport requires an explicit disconnect first.
    #[error("a transport is already connected or connecting")]
    AlreadyConnected,
}

/// Errors related to value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A device was defined without a display name.
    #[error("device name must not be empty")]
    EmptyName,

    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An unknown device category name.
    #[error("unknown device kind: {0}")]
    UnknownKind(String),
}

/// Errors reported by a transport adapter.
///
/// Every adapter normalizes its native failures into this closed set so the
/// connection manager and command dispatcher can treat all transports alike.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The host lacks the capability needed by the transport.
    #[error("transport unsupported: {0}")]
    Unsupported(String),

    /// The user dismissed the discovery step.
    ///
    /// This is not a failure: the connection returns to idle silently.
    #[error("discovery cancelled by user")]
    Cancelled,

    /// Discovery finished without a usable device selection.
    #[error("no device selected")]
    DeviceNotSelected,

    /// The endpoint was reachable in principle but the handshake failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The endpoint address is malformed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No link is open.
    #[error("transport is not connected")]
    NotConnected,

    /// A previous write is still in flight.
    #[error("transport is busy")]
    Busy,

    /// The write reached the transport but failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl TransportError {
    /// Returns `true` for the user-cancelled discovery outcome.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn error_from_transport_error() {
        let err: Error = TransportError::Busy.into();
        assert!(matches!(err, Error::Transport(TransportError::Busy)));
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::InvalidAddress("300.1.1.1".to_string());
        assert_eq!(err.to_string(), "invalid address: 300.1.1.1");
    }

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(TransportError::Cancelled.is_cancellation());
        assert!(!TransportError::DeviceNotSelected.is_cancellation());
        assert!(!TransportError::HandshakeFailed("timeout".into()).is_cancellation());
    }

    #[test]
    fn device_not_found_display() {
        let err = Error::DeviceNotFound(DeviceId::from("42"));
        assert_eq!(err.to_string(), "device 42 not found");
    }
}
