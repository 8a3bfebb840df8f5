// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hearthlink - appliance control over interchangeable transports.
//!
//! This library keeps an authoritative registry of household appliances and
//! drives them over one of three transports: a short-range Bluetooth LE link,
//! plain HTTP on the local network, or a JSON relay over `WebSocket`. State is
//! applied optimistically, rolled back when a write fails, and reconciled
//! with reports coming back from the hardware.
//!
//! # Supported Features
//!
//! - **Power control**: On, off, toggle, and all-devices bulk switching
//! - **Analog control**: Levels 0-100, throttled to one write per window
//! - **Connection lifecycle**: Idle, connecting, connected and error phases
//! - **Activity log**: Bounded, newest first, with spoken announcements
//! - **Demo mode**: Commands stay local and a simulated relay drives the UI
//!
//! # Transports
//!
//! | Transport     | Payload            | Feature     |
//! |---------------|--------------------|-------------|
//! | Short-range   | Text (`L1:ON`)     | `bluetooth` |
//! | Local network | Text over HTTP GET | always      |
//! | Relay         | JSON messages      | always      |
//!
//! # Quick Start
//!
//! ```no_run
//! use hearthlink::{Home, HomeConfig};
//! use hearthlink::transport::ConnectParams;
//! use hearthlink::types::DeviceId;
//!
//! #[tokio::main]
//! async fn main() -> hearthlink::Result<()> {
//!     let home = Home::new(HomeConfig::new());
//!
//!     home.connect(ConnectParams::local_network("192.168.1.40")).await?;
//!
//!     let light = DeviceId::from("1");
//!     home.set_power(&light, true).await?;
//!     home.set_value(&light, 75)?;
//!
//!     for entry in home.activity() {
//!         println!("{} {}", entry.device_name, entry.action);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Watching Events
//!
//! ```no_run
//! use hearthlink::{Home, HomeConfig, HomeEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let home = Home::new(HomeConfig::new());
//!     let mut events = home.subscribe();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let HomeEvent::DeviceChanged { device, origin } = event {
//!             println!("{} -> {} ({origin:?})", device.name, device.is_on);
//!         }
//!     }
//! }
//! ```

pub mod activity;
pub mod command;
mod config;
pub mod connection;
pub mod device;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod event;
mod home;
pub mod reconciler;
pub mod registry;
pub mod transport;
pub mod types;

pub use activity::{ActivityLog, LogAction, LogEntry};
pub use command::{Command, Origin, RelayMessage};
pub use config::HomeConfig;
pub use connection::{ConnectionPhase, ConnectionState};
pub use device::{Device, DeviceSpec};
pub use dispatcher::DispatchOutcome;
pub use environment::Environment;
pub use error::{Error, Result, TransportError, ValueError};
pub use event::{Announcer, HomeEvent};
pub use home::Home;
pub use registry::BulkPolicy;
pub use transport::{ConnectParams, TransportKind};
pub use types::{DeviceId, DeviceKind, Level};
