// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle.
//!
//! At most one transport is open at a time. [`ConnectionManager`] drives it
//! through `Idle → Connecting → Connected`, records failures as `Error`, and
//! publishes every change as a [`ConnectionState`] snapshot.
//!
//! ```text
//!            connect                ok
//!   Idle ────────────▶ Connecting ──────▶ Connected
//!    ▲  ◀── cancelled ──┘   │                │  │
//!    │                      │ failed         │  │ lost
//!    │                      ▼                │  ▼
//!    │                    Error ◀────────────┘ Error
//!    └──────────── disconnect ───────────────┘
//! ```

mod manager;
mod state;

pub use manager::ConnectionManager;
pub use state::{ConnectionPhase, ConnectionState};
