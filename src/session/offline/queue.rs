//! # Offline Mutation Queue
//!
//! Buffers finished-workout writes that could not be delivered and replays
//! them in order once delivery is possible again.
//!
//! ## Features
//!
//! - **Persistent Queue**: the whole queue is rewritten to the durable store
//!   after every mutating call, so entries survive app restarts
//! - **FIFO Drain**: one write at a time, a failure stops the pass so later
//!   entries never overtake an earlier one
//! - **Single Drain**: a second drain while one is running is dropped
//! - **At-least-once**: an entry leaves the queue only after its write is
//!   confirmed; its `id` is the idempotency key the writer should dedupe on
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use liftlog_session::session::clock::SystemClock;
//! use liftlog_session::session::local_store::MemoryStore;
//! use liftlog_session::session::offline::OfflineQueue;
//! # use liftlog_session::session::writer::WorkoutWriter;
//! # use liftlog_session::shared::WorkoutRecord;
//! # async fn example(writer: &dyn WorkoutWriter, record: WorkoutRecord) {
//!
//! let queue = OfflineQueue::load(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//! queue.enqueue(record);
//!
//! // Later, when connectivity returns
//! let report = queue.drain(writer).await.unwrap();
//! println!("delivered {}, remaining {}", report.delivered, report.remaining);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::clock::Clock;
use crate::session::local_store::DurableStore;
use crate::session::writer::WorkoutWriter;
use crate::shared::config::DEFAULT_QUEUE_KEY;
use crate::shared::error::SessionError;
use crate::shared::workout::WorkoutRecord;

/// A finished-workout write waiting for delivery
///
/// Serialized flat: `id`, `queuedAt` and `attempts` sit next to the workout
/// payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    /// Client-generated identity, also used as the idempotency key
    pub id: Uuid,
    pub queued_at: DateTime<Utc>,
    /// Failed delivery attempts so far
    #[serde(default)]
    pub attempts: u32,
    #[serde(flatten)]
    pub payload: WorkoutRecord,
}

impl QueuedMutation {
    pub fn new(payload: WorkoutRecord, queued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queued_at,
            attempts: 0,
            payload,
        }
    }

    /// Key the remote side should dedupe repeated deliveries on
    pub fn idempotency_key(&self) -> String {
        self.id.to_string()
    }
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Mutations confirmed delivered during this pass
    pub delivered: usize,
    /// Mutations still queued when the pass ended
    pub remaining: usize,
}

/// Releases the in-flight flag even when a drain future is dropped mid-await
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Durable FIFO of pending workout writes
pub struct OfflineQueue {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    key: String,
    entries: Mutex<VecDeque<QueuedMutation>>,
    draining: AtomicBool,
}

impl OfflineQueue {
    /// Restore the queue stored under the default key
    pub fn load(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self::load_with_key(store, clock, DEFAULT_QUEUE_KEY)
    }

    /// Restore the queue stored under `key`
    ///
    /// Entries that no longer parse are dropped rather than retried forever.
    /// An unreadable store yields an empty queue.
    pub fn load_with_key(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let (entries, dropped) = match store.get(&key) {
            Ok(Some(raw)) => parse_entries(&key, &raw),
            Ok(None) => (VecDeque::new(), 0),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read offline queue; starting empty");
                (VecDeque::new(), 0)
            }
        };

        if !entries.is_empty() {
            tracing::info!(count = entries.len(), "Restored offline workout queue");
        }

        let queue = Self {
            store,
            clock,
            key,
            entries: Mutex::new(entries),
            draining: AtomicBool::new(false),
        };
        if dropped > 0 {
            let entries = queue.lock();
            queue.persist(&entries);
        }
        queue
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedMutation>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the whole queue; failures leave the in-memory queue authoritative
    fn persist(&self, entries: &VecDeque<QueuedMutation>) {
        let result = serde_json::to_string(entries)
            .map_err(SessionError::from)
            .and_then(|json| self.store.set(&self.key, &json).map_err(SessionError::from));
        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, count = entries.len(), "Failed to persist offline queue");
        }
    }

    /// Append a workout; never blocks, never fails
    pub fn enqueue(&self, payload: WorkoutRecord) -> QueuedMutation {
        self.enqueue_mutation(QueuedMutation::new(payload, self.clock.now()))
    }

    /// Append a mutation that already has an id (a failed direct write keeps
    /// its idempotency key when it falls back to the queue)
    pub fn enqueue_mutation(&self, mutation: QueuedMutation) -> QueuedMutation {
        let mut entries = self.lock();
        entries.push_back(mutation.clone());
        self.persist(&entries);
        tracing::info!(id = %mutation.id, queued = entries.len(), "Queued workout for later delivery");
        mutation
    }

    /// Deliver queued workouts in order through `writer`
    ///
    /// Stops at the first failed delivery; that entry and everything behind it
    /// stay queued. Returns [`SessionError::DrainInProgress`] without touching
    /// the queue if another drain is running.
    pub async fn drain(&self, writer: &dyn WorkoutWriter) -> Result<DrainReport, SessionError> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain requested while another is running; dropped");
            return Err(SessionError::DrainInProgress);
        }
        let _guard = DrainGuard(&self.draining);

        let mut report = DrainReport::default();
        loop {
            let Some(next) = self.lock().front().cloned() else {
                break;
            };

            match writer.save_workout(&next).await {
                Ok(()) => {
                    let mut entries = self.lock();
                    if let Some(pos) = entries.iter().position(|m| m.id == next.id) {
                        entries.remove(pos);
                    }
                    self.persist(&entries);
                    report.delivered += 1;
                    tracing::debug!(id = %next.id, remaining = entries.len(), "Delivered queued workout");
                }
                Err(e) => {
                    let mut entries = self.lock();
                    if let Some(entry) = entries.iter_mut().find(|m| m.id == next.id) {
                        entry.attempts += 1;
                    }
                    self.persist(&entries);
                    tracing::warn!(id = %next.id, error = %e, "Delivery failed; keeping workout queued");
                    break;
                }
            }
        }

        report.remaining = self.len();
        if report.delivered > 0 || report.remaining > 0 {
            tracing::info!(delivered = report.delivered, remaining = report.remaining, "Drain pass finished");
        }
        Ok(report)
    }

    /// Number of queued workouts
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Copy of the queue in delivery order
    pub fn snapshot(&self) -> Vec<QueuedMutation> {
        self.lock().iter().cloned().collect()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().iter().any(|m| m.id == id)
    }

    /// Drop every queued workout; the only way entries are discarded on purpose
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let cleared = entries.len();
        entries.clear();
        self.persist(&entries);
        tracing::warn!(cleared, "Cleared offline workout queue");
        cleared
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("key", &self.key)
            .field("len", &self.len())
            .field("draining", &self.is_draining())
            .finish()
    }
}

/// Parse the stored array entry by entry, skipping the ones that fail
fn parse_entries(key: &str, raw: &str) -> (VecDeque<QueuedMutation>, usize) {
    let values = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Offline queue is not a JSON array; discarding");
            return (VecDeque::new(), 1);
        }
    };

    let mut entries = VecDeque::with_capacity(values.len());
    let mut dropped = 0;
    for value in values {
        match serde_json::from_value::<QueuedMutation>(value) {
            Ok(mutation) => entries.push_back(mutation),
            Err(e) => {
                dropped += 1;
                tracing::warn!(key = %key, error = %e, "Dropping malformed queued workout");
            }
        }
    }
    (entries, dropped)
}
