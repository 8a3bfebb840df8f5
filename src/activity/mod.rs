// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Activity log.
//!
//! Every state transition, connection event and error is recorded as an
//! immutable [`LogEntry`] in a bounded [`ActivityLog`]. Consumers read the
//! log newest-first.
//!
//! # Examples
//!
//! ```
//! use hearthlink::activity::{ActivityLog, LogAction};
//!
//! let log = ActivityLog::with_capacity(2);
//! log.record_system(LogAction::Connected, Some("via Wi-Fi".into()));
//! log.record_system(LogAction::Disconnected, None);
//! log.record_system(LogAction::Connected, None);
//!
//! let entries = log.entries();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].action, LogAction::Connected);
//! ```

mod entry;
mod log;

pub use entry::{LogAction, LogEntry};
pub use log::{ActivityLog, DEFAULT_LOG_CAPACITY};
