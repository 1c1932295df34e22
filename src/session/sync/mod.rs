//! # Offline Sync Service
//!
//! Background task that replays the offline queue when it can.
//!
//! ## Triggers
//!
//! - **Reconnect**: the connectivity monitor publishes a change while online
//!   and the queue is non-empty
//! - **Startup**: online with entries restored from a previous process
//! - **Retry tick**: every retry interval while online with a non-empty queue
//!
//! A trigger that arrives while a drain is running is dropped by the queue's
//! in-flight guard; the running pass picks up anything enqueued meanwhile.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use liftlog_session::session::sync::OfflineSync;
//! # use liftlog_session::session::offline::OfflineQueue;
//! # use liftlog_session::session::sync::network_monitor::ConnectivityMonitor;
//! # use liftlog_session::session::writer::WorkoutWriter;
//! # async fn example(queue: Arc<OfflineQueue>, monitor: Arc<ConnectivityMonitor>, writer: Arc<dyn WorkoutWriter>) {
//!
//! let mut sync = OfflineSync::spawn(queue, monitor.clone(), writer, Duration::from_secs(30));
//!
//! // Host reports connectivity; the queue drains on its own.
//! monitor.set_online(true);
//!
//! sync.stop();
//! # }
//! ```

pub mod network_monitor;

pub use network_monitor::{ConnectivityMonitor, ConnectivityState};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::offline::OfflineQueue;
use crate::session::writer::WorkoutWriter;
use crate::shared::error::SessionError;

/// Why a drain was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    Startup,
    Reconnect,
    Retry,
}

/// Handle to the background replay task
#[derive(Debug)]
pub struct OfflineSync {
    background_task: Option<JoinHandle<()>>,
}

impl OfflineSync {
    /// Start the background replay task on the current runtime
    pub fn spawn(
        queue: Arc<OfflineQueue>,
        monitor: Arc<ConnectivityMonitor>,
        writer: Arc<dyn WorkoutWriter>,
        retry_interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            Self::background_sync_loop(queue, monitor, writer, retry_interval).await;
        });
        Self {
            background_task: Some(handle),
        }
    }

    /// Stop the background task
    pub fn stop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.background_task
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    async fn background_sync_loop(
        queue: Arc<OfflineQueue>,
        monitor: Arc<ConnectivityMonitor>,
        writer: Arc<dyn WorkoutWriter>,
        retry_interval: Duration,
    ) {
        let mut connectivity = monitor.subscribe();
        let mut retry = tokio::time::interval_at(
            tokio::time::Instant::now() + retry_interval,
            retry_interval,
        );
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if monitor.is_online() && !queue.is_empty() {
            Self::perform_drain(&queue, writer.as_ref(), DrainTrigger::Startup).await;
        }

        loop {
            tokio::select! {
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Connectivity monitor dropped; stopping offline sync");
                        break;
                    }
                    // Only the latest state is kept: a whole offline/online
                    // cycle during a long drain arrives as one online change
                    // with `just_reconnected` already cleared.
                    let state = *connectivity.borrow_and_update();
                    if state.is_online && !queue.is_empty() {
                        Self::perform_drain(&queue, writer.as_ref(), DrainTrigger::Reconnect).await;
                    }
                }
                _ = retry.tick() => {
                    if monitor.is_online() && !queue.is_empty() {
                        Self::perform_drain(&queue, writer.as_ref(), DrainTrigger::Retry).await;
                    }
                }
            }
        }
    }

    async fn perform_drain(queue: &OfflineQueue, writer: &dyn WorkoutWriter, trigger: DrainTrigger) {
        tracing::debug!(?trigger, queued = queue.len(), "Draining offline queue");
        match queue.drain(writer).await {
            Ok(report) => {
                tracing::debug!(?trigger, delivered = report.delivered, remaining = report.remaining, "Offline drain finished");
            }
            Err(SessionError::DrainInProgress) => {
                tracing::debug!(?trigger, "Drain already running");
            }
            Err(e) => {
                tracing::warn!(?trigger, error = %e, "Offline drain failed");
            }
        }
    }
}

impl Drop for OfflineSync {
    fn drop(&mut self) {
        self.stop();
    }
}
