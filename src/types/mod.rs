// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the engine.
//!
//! # Types
//!
//! - [`DeviceId`] - Opaque device identifier, stable for the process lifetime
//! - [`DeviceKind`] - Closed set of appliance categories
//! - [`Level`] - Analog value (0-100), always clamped

mod device_id;
mod device_kind;
mod level;

pub use device_id::DeviceId;
pub use device_kind::DeviceKind;
pub use level::Level;
