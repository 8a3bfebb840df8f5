// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded activity log.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{LogAction, LogEntry};

/// Number of entries kept when no capacity is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Append-only ring buffer of [`LogEntry`] values.
///
/// The newest entry is at the front. Once the capacity is reached, each
/// append silently evicts the oldest entry. The log is internally
/// synchronized so it can be shared between the dispatcher, the reconciler
/// and the connection manager.
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl ActivityLog {
    /// Creates a log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Creates a log holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Returns the capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest one if the log is full.
    pub fn append(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Appends a system entry and returns a copy of it.
    pub fn record_system(&self, action: LogAction, details: Option<String>) -> LogEntry {
        let entry = LogEntry::system(action, details);
        self.append(entry.clone());
        entry
    }

    /// Returns all entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceId;

    fn entry(n: usize) -> LogEntry {
        LogEntry::new(
            DeviceId::from(n.to_string()),
            format!("device {n}"),
            LogAction::PowerOn,
            None,
        )
    }

    #[test]
    fn newest_entry_comes_first() {
        let log = ActivityLog::new();
        log.append(entry(1));
        log.append(entry(2));

        let entries = log.entries();
        assert_eq!(entries[0].device_id, DeviceId::from("2"));
        assert_eq!(entries[1].device_id, DeviceId::from("1"));
    }

    #[test]
    fn never_exceeds_capacity() {
        let log = ActivityLog::new();
        for n in 0..=DEFAULT_LOG_CAPACITY {
            log.append(entry(n));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), DEFAULT_LOG_CAPACITY);
        // The 101st append evicted entry 0
        assert_eq!(entries[0].device_id, DeviceId::from("100"));
        assert_eq!(
            entries.last().map(|e| e.device_id.clone()),
            Some(DeviceId::from("1"))
        );
    }

    #[test]
    fn clear_empties_log() {
        let log = ActivityLog::with_capacity(5);
        log.append(entry(1));
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let log = ActivityLog::with_capacity(0);
        log.append(entry(1));
        log.append(entry(2));
        assert_eq!(log.len(), 1);
    }
}
