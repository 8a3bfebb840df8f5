// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Announcement channel.

/// Receives the sentences the engine wants spoken.
///
/// The engine only decides when and what to announce; rendering (speech
/// synthesis, a toast, a chime) belongs to the implementor. Implementations
/// are called synchronously from engine callbacks and must not block.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use hearthlink::event::Announcer;
///
/// #[derive(Default)]
/// struct Transcript(Mutex<Vec<String>>);
///
/// impl Announcer for Transcript {
///     fn announce(&self, text: &str) {
///         self.0.lock().push(text.to_string());
///     }
/// }
///
/// let transcript = Arc::new(Transcript::default());
/// transcript.announce("Wi-Fi connected");
/// assert_eq!(transcript.0.lock().len(), 1);
/// ```
pub trait Announcer: Send + Sync {
    /// Announces a sentence.
    fn announce(&self, text: &str);
}

/// Default announcer that writes announcements to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnnouncer;

impl Announcer for TracingAnnouncer {
    fn announce(&self, text: &str) {
        tracing::info!(announcement = %text, "Announcement");
    }
}

impl<F> Announcer for F
where
    F: Fn(&str) + Send + Sync,
{
    fn announce(&self, text: &str) {
        self(text);
    }
}
