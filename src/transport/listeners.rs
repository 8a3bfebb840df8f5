// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound and lost-connection listener slots.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::Inbound;

/// Callback receiving inbound hardware data.
pub type InboundListener = Arc<dyn Fn(Inbound) + Send + Sync>;

/// Callback fired when a transport loses its link unexpectedly.
pub type LostListener = Box<dyn FnOnce() + Send>;

/// The two listener slots of one connection.
///
/// Each slot holds at most one listener. Installing replaces the previous
/// listener; [`clear`](Self::clear) empties both. The lost-connection
/// listener is consumed when it fires, so it fires at most once per
/// installation.
///
/// Listeners are invoked outside the slot locks and may call back into the
/// slots.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use hearthlink::transport::{Inbound, ListenerSlots};
///
/// let slots = ListenerSlots::new();
/// let lost = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&lost);
/// slots.set_on_lost(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// slots.connection_lost();
/// slots.connection_lost();
/// assert_eq!(lost.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ListenerSlots {
    inbound: RwLock<Option<InboundListener>>,
    lost: Mutex<Option<LostListener>>,
}

impl ListenerSlots {
    /// Creates empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the inbound listener, replacing any previous one.
    pub fn set_on_inbound<F>(&self, listener: F)
    where
        F: Fn(Inbound) + Send + Sync + 'static,
    {
        *self.inbound.write() = Some(Arc::new(listener));
    }

    /// Installs the lost-connection listener, replacing any previous one.
    pub fn set_on_lost<F>(&self, listener: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.lost.lock() = Some(Box::new(listener));
    }

    /// Empties both slots.
    pub fn clear(&self) {
        *self.inbound.write() = None;
        *self.lost.lock() = None;
    }

    /// Returns `true` if an inbound listener is installed.
    #[must_use]
    pub fn has_inbound(&self) -> bool {
        self.inbound.read().is_some()
    }

    /// Hands inbound data to the installed listener, if any.
    pub fn deliver(&self, inbound: Inbound) {
        let listener = self.inbound.read().clone();
        if let Some(listener) = listener {
            listener(inbound);
        } else {
            tracing::trace!("Inbound data dropped, no listener installed");
        }
    }

    /// Fires and consumes the lost-connection listener, if any.
    pub fn connection_lost(&self) {
        let listener = self.lost.lock().take();
        if let Some(listener) = listener {
            listener();
        }
    }
}

impl fmt::Debug for ListenerSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlots")
            .field("inbound", &self.inbound.read().is_some())
            .field("lost", &self.lost.lock().is_some())
            .finish()
    }
}
