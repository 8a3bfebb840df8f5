// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rate limiting for outbound level writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default minimum spacing between two throttled writes.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(200);

#[derive(Default)]
struct State {
    last_sent: Option<Instant>,
    /// Deferred write not yet fired, tagged with its generation.
    pending: Option<(u64, JoinHandle<()>)>,
    generation: u64,
}

/// Admits at most one write per window.
///
/// A write outside the window of the previous one starts immediately. A
/// write inside it is deferred to the window boundary and replaces any
/// deferred write that has not fired yet. Once a write has started it is
/// never cancelled.
pub(crate) struct Throttle {
    window: Duration,
    state: Mutex<State>,
}

impl Throttle {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(State::default()),
        }
    }

    /// Schedules `send` according to the window.
    ///
    /// Returns `false` without scheduling anything when called outside a
    /// Tokio runtime.
    pub(crate) fn schedule<F>(self: &Arc<Self>, send: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime, throttled write skipped");
            return false;
        };

        let now = Instant::now();
        let mut state = self.state.lock();

        if let Some((_, superseded)) = state.pending.take() {
            superseded.abort();
        }

        let due = state
            .last_sent
            .map(|last| last + self.window)
            .filter(|&due| due > now);

        if let Some(due) = due {
            state.generation += 1;
            let generation = state.generation;
            let throttle = Arc::clone(self);

            // The slot is filled before the lock is released, so the task
            // always finds its own entry unless it was superseded
            let handle = runtime.spawn(async move {
                tokio::time::sleep_until(due).await;
                {
                    let mut state = throttle.state.lock();
                    match state.pending {
                        Some((current, _)) if current == generation => {}
                        _ => return,
                    }
                    state.pending = None;
                    state.last_sent = Some(Instant::now());
                }
                send.await;
            });
            state.pending = Some((generation, handle));
        } else {
            state.last_sent = Some(now);
            drop(state);
            runtime.spawn(send);
        }
        true
    }

    /// Cancels the deferred write, if any.
    pub(crate) fn cancel_pending(&self) {
        if let Some((_, pending)) = self.state.lock().pending.take() {
            pending.abort();
        }
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        if let Some((_, pending)) = self.state.get_mut().pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Arc<Mutex<Vec<(u32, Instant)>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn send(log: &Arc<Mutex<Vec<(u32, Instant)>>>, value: u32) -> impl Future<Output = ()> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            log.lock().push((value, Instant::now()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_write_is_immediate() {
        let throttle = Arc::new(Throttle::new(DEFAULT_THROTTLE_WINDOW));
        let log = recorder();
        let start = Instant::now();

        assert!(throttle.schedule(send(&log, 1)));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert!(log[0].1 - start < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_sends_first_and_last_only() {
        let throttle = Arc::new(Throttle::new(DEFAULT_THROTTLE_WINDOW));
        let log = recorder();
        let start = Instant::now();

        for value in 0..=100 {
            assert!(throttle.schedule(send(&log, value)));
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let log = log.lock();
        let values: Vec<u32> = log.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, [0, 100]);
        let trailing = log[1].1 - start;
        assert!(trailing >= Duration::from_millis(200));
        assert!(trailing < Duration::from_millis(210));
    }

    #[tokio::test(start_paused = true)]
    async fn writes_spaced_by_window_are_not_deferred() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(50)));
        let log = recorder();

        for value in 0..3 {
            assert!(throttle.schedule(send(&log, value)));
            tokio::time::sleep(Duration::from_millis(60)).await;
        }

        assert_eq!(log.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_write_per_window() {
        let throttle = Arc::new(Throttle::new(DEFAULT_THROTTLE_WINDOW));
        let log = recorder();

        for value in 0..40 {
            assert!(throttle.schedule(send(&log, value)));
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let log = log.lock();
        for pair in log.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DEFAULT_THROTTLE_WINDOW);
        }
        assert_eq!(log.last().map(|(v, _)| *v), Some(39));
    }

    #[test]
    fn outside_runtime_nothing_is_scheduled() {
        let throttle = Arc::new(Throttle::new(DEFAULT_THROTTLE_WINDOW));
        let log = recorder();

        assert!(!throttle.schedule(send(&log, 1)));
        assert!(!throttle.schedule(send(&log, 2)));
        assert!(log.lock().is_empty());
        assert!(throttle.state.lock().pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_drops_deferred_write() {
        let throttle = Arc::new(Throttle::new(DEFAULT_THROTTLE_WINDOW));
        let log = recorder();

        throttle.schedule(send(&log, 1));
        throttle.schedule(send(&log, 2));
        throttle.cancel_pending();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let values: Vec<u32> = log.lock().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, [1]);
    }
}
