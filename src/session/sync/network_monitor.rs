//! # Network Monitor
//!
//! Tracks online/offline transitions reported by the host and exposes a
//! short-lived "just reconnected" signal.
//!
//! The monitor never probes the network itself. It is a best-effort signal,
//! not a promise that the next write will succeed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::clock::Clock;

/// Default length of the `just_reconnected` window
pub const DEFAULT_RECONNECT_WINDOW: Duration = Duration::from_secs(3);

/// Connectivity as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub is_online: bool,
    /// True for the reconnect window after an offline→online transition
    pub just_reconnected: bool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            is_online: true,
            just_reconnected: false,
        }
    }
}

/// Observes host connectivity events
pub struct ConnectivityMonitor {
    clock: Arc<dyn Clock>,
    state: watch::Sender<ConnectivityState>,
    reconnect_window: Duration,
    reconnected_at: Mutex<Option<DateTime<Utc>>>,
    /// Bumped on every reconnect so a stale clear task leaves a newer one alone
    epoch: Arc<AtomicU64>,
    clear_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with an initial online state
    pub fn new(clock: Arc<dyn Clock>, initially_online: bool) -> Self {
        let (state, _) = watch::channel(ConnectivityState {
            is_online: initially_online,
            just_reconnected: false,
        });
        Self {
            clock,
            state,
            reconnect_window: DEFAULT_RECONNECT_WINDOW,
            reconnected_at: Mutex::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
            clear_task: Mutex::new(None),
        }
    }

    pub fn with_reconnect_window(mut self, window: Duration) -> Self {
        self.reconnect_window = window;
        self
    }

    /// Host notification: the platform reports online (`true`) or offline
    ///
    /// Repeats of the current value are ignored.
    pub fn set_online(&self, online: bool) {
        let previous = self.state.borrow().is_online;
        if previous == online {
            return;
        }

        if online {
            *self.reconnected_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(self.clock.now());
            let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            self.state.send_replace(ConnectivityState {
                is_online: true,
                just_reconnected: true,
            });
            tracing::info!("Connectivity restored");
            self.schedule_clear(epoch);
        } else {
            self.epoch.fetch_add(1, Ordering::AcqRel);
            *self.reconnected_at.lock().unwrap_or_else(|e| e.into_inner()) = None;
            self.abort_clear_task();
            self.state.send_replace(ConnectivityState {
                is_online: false,
                just_reconnected: false,
            });
            tracing::info!("Connectivity lost");
        }
    }

    /// Clear `just_reconnected` after the window, when a runtime is available
    fn schedule_clear(&self, epoch: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime; reconnect flag clears on read");
            return;
        };

        let state = self.state.clone();
        let current = Arc::clone(&self.epoch);
        let window = self.reconnect_window;
        let task = handle.spawn(async move {
            tokio::time::sleep(window).await;
            if current.load(Ordering::Acquire) == epoch {
                state.send_if_modified(|s| {
                    let changed = s.just_reconnected;
                    s.just_reconnected = false;
                    changed
                });
            }
        });

        if let Some(previous) = self
            .clear_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task)
        {
            previous.abort();
        }
    }

    fn abort_clear_task(&self) {
        if let Some(task) = self.clear_task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    /// Whether an offline→online transition happened within the window
    ///
    /// Checked against the clock as well, so it clears without a runtime.
    pub fn just_reconnected(&self) -> bool {
        if !self.state.borrow().just_reconnected {
            return false;
        }
        let reconnected_at = *self.reconnected_at.lock().unwrap_or_else(|e| e.into_inner());
        match reconnected_at {
            Some(at) => (self.clock.now() - at)
                .to_std()
                .map(|since| since < self.reconnect_window)
                .unwrap_or(true),
            None => false,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        ConnectivityState {
            is_online: self.is_online(),
            just_reconnected: self.just_reconnected(),
        }
    }

    /// Receiver notified on every published state change
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.abort_clear_task();
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &*self.state.borrow())
            .field("reconnect_window", &self.reconnect_window)
            .finish()
    }
}
