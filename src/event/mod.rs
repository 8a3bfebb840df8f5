// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event distribution and announcements.
//!
//! Presentation collaborators observe the engine in two ways:
//!
//! - [`EventBus`] broadcasts a [`HomeEvent`] for every device, connection,
//!   log and environment change.
//! - [`Announcer`] receives the short sentences the engine wants spoken
//!   (connects, disconnects, manual switch flips, device additions).
//!
//! # Examples
//!
//! ```
//! use hearthlink::event::{EventBus, HomeEvent};
//! use hearthlink::types::DeviceId;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(HomeEvent::DeviceRemoved { device_id: DeviceId::from("1") });
//! ```

mod announcer;
mod event_bus;
mod home_event;
mod notifier;

pub use announcer::{Announcer, TracingAnnouncer};
pub use event_bus::EventBus;
pub use home_event::HomeEvent;
pub(crate) use notifier::Notifier;
#[cfg(test)]
pub(crate) use notifier::testing;
