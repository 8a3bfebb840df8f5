// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared sink for log entries, announcements and bus events.

use std::fmt;
use std::sync::Arc;

use super::{Announcer, EventBus, HomeEvent};
use crate::activity::{ActivityLog, LogAction, LogEntry};
use crate::device::Device;

/// Fan-out used by every engine component that reports something.
///
/// Appending to the log also publishes [`HomeEvent::LogAppended`];
/// announcing also publishes [`HomeEvent::Announcement`].
#[derive(Clone)]
pub(crate) struct Notifier {
    log: Arc<ActivityLog>,
    announcer: Arc<dyn Announcer>,
    bus: EventBus,
}

impl Notifier {
    pub(crate) fn new(log: Arc<ActivityLog>, announcer: Arc<dyn Announcer>, bus: EventBus) -> Self {
        Self {
            log,
            announcer,
            bus,
        }
    }

    pub(crate) fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Appends an entry and publishes it.
    pub(crate) fn record(&self, entry: LogEntry) {
        tracing::debug!(
            device_id = %entry.device_id,
            action = %entry.action,
            details = ?entry.details,
            "Activity"
        );
        self.log.append(entry.clone());
        self.bus.publish(HomeEvent::LogAppended { entry });
    }

    /// Appends an entry about a device.
    pub(crate) fn record_device(&self, device: &Device, action: LogAction, details: Option<String>) {
        self.record(LogEntry::new(device.id.clone(), device.name.clone(), action, details));
    }

    /// Appends a system entry.
    pub(crate) fn record_system(&self, action: LogAction, details: Option<String>) {
        self.record(LogEntry::system(action, details));
    }

    /// Empties the log.
    pub(crate) fn clear_log(&self) {
        self.log.clear();
        self.bus.publish(HomeEvent::LogCleared);
    }

    pub(crate) fn announce(&self, text: impl Into<String>) {
        let text = text.into();
        self.announcer.announce(&text);
        self.bus.publish(HomeEvent::Announcement { text });
    }

    pub(crate) fn publish(&self, event: HomeEvent) {
        self.bus.publish(event);
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("log", &self.log)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Announcer that keeps a transcript.
    #[derive(Debug, Default)]
    pub(crate) struct Transcript(pub(crate) Mutex<Vec<String>>);

    impl Announcer for Transcript {
        fn announce(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }
    }

    pub(crate) fn notifier() -> (Notifier, Arc<Transcript>) {
        let transcript = Arc::new(Transcript::default());
        let notifier = Notifier::new(
            Arc::new(ActivityLog::new()),
            Arc::clone(&transcript) as Arc<dyn Announcer>,
            EventBus::new(),
        );
        (notifier, transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::notifier;
    use super::*;

    #[tokio::test]
    async fn record_appends_and_publishes() {
        let (notifier, _) = notifier();
        let mut rx = notifier.bus().subscribe();

        notifier.record_system(LogAction::Login, Some("User ada logged in".into()));

        assert_eq!(notifier.log().len(), 1);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, HomeEvent::LogAppended { entry } if entry.action == LogAction::Login));
    }

    #[tokio::test]
    async fn announce_reaches_announcer_and_bus() {
        let (notifier, transcript) = notifier();
        let mut rx = notifier.bus().subscribe();

        notifier.announce("Disconnected");

        assert_eq!(transcript.0.lock().as_slice(), ["Disconnected"]);
        assert!(matches!(rx.recv().await.unwrap(), HomeEvent::Announcement { text } if text == "Disconnected"));
    }

    #[test]
    fn clear_log_empties() {
        let (notifier, _) = notifier();
        notifier.record_system(LogAction::Logout, None);
        notifier.clear_log();
        assert!(notifier.log().is_empty());
    }
}
