//! # Session Timer
//!
//! Tracks how long the active workout has been running.
//!
//! Elapsed time is never counted tick by tick. It is always derived from the
//! wall clock:
//!
//! ```text
//! elapsed = accumulated_seconds + floor((now - start_timestamp) / 1000ms)
//! ```
//!
//! so the value is right immediately after any gap (backgrounding, device
//! sleep, a suspended tab) without catching up. The optional frame loop only
//! republishes that value for repainting.
//!
//! ## Durability
//!
//! While running, the timer writes a [`TimerCheckpoint`] to the durable store
//! every checkpoint interval (5 s by default) and immediately when the app is
//! hidden. `start()` adopts a stored checkpoint, which lets a workout survive a
//! full process restart. Store failures are logged and timing carries on in
//! memory.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Duration;
//! use liftlog_session::session::clock::ManualClock;
//! use liftlog_session::session::local_store::MemoryStore;
//! use liftlog_session::session::timer::SessionTimer;
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut timer = SessionTimer::new(Arc::new(MemoryStore::new()), clock.clone());
//!
//! timer.start();
//! clock.advance(Duration::seconds(83));
//! assert_eq!(timer.elapsed_seconds(), 83);
//! assert_eq!(timer.format_elapsed(), "01:23");
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::clock::Clock;
use crate::session::local_store::DurableStore;
use crate::shared::config::{SessionConfig, DEFAULT_TIMER_KEY};

/// Default period between checkpoints while running
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5);

/// Durable snapshot of the timer
///
/// `start_timestamp` is `None` exactly when the timer is idle (paused).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCheckpoint {
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub start_timestamp: Option<DateTime<Utc>>,
    pub accumulated_seconds: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
}

impl TimerCheckpoint {
    /// Elapsed seconds this checkpoint represents at `now`
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        match self.start_timestamp {
            Some(start) => self
                .accumulated_seconds
                .saturating_add(whole_seconds_between(start, now)),
            None => self.accumulated_seconds,
        }
    }
}

/// Largest `accumulatedSeconds` a restored checkpoint may carry; anything
/// larger cannot be expressed as a `chrono` duration
pub const MAX_ACCUMULATED_SECONDS: u64 = (i64::MAX / 1000) as u64;

/// Whole seconds from `start` to `now`; a clock that moved backwards yields 0
fn whole_seconds_between(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - start).num_milliseconds().max(0) as u64;
    millis / 1000
}

/// Host visibility notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// What `start()` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    /// No stored checkpoint; timing began from the in-memory value
    Fresh,
    /// A stored checkpoint was adopted
    Resumed { accumulated_seconds: u64 },
    /// The timer was already running
    AlreadyRunning,
}

/// Mutable timer state shared with the frame loop task
struct TimerCore {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    key: String,
    checkpoint_interval: Duration,
    start: Option<DateTime<Utc>>,
    accumulated: u64,
    last_checkpoint: Option<DateTime<Utc>>,
}

impl TimerCore {
    fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        self.snapshot(now).elapsed_at(now)
    }

    fn elapsed(&self) -> u64 {
        self.elapsed_at(self.clock.now())
    }

    fn snapshot(&self, now: DateTime<Utc>) -> TimerCheckpoint {
        TimerCheckpoint {
            start_timestamp: self.start,
            accumulated_seconds: self.accumulated,
            saved_at: now,
        }
    }

    /// Load the stored checkpoint; unreadable or malformed state counts as absent
    fn load_checkpoint(&self) -> Option<TimerCheckpoint> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read timer checkpoint");
                return None;
            }
        };
        match serde_json::from_str::<TimerCheckpoint>(&raw) {
            Ok(checkpoint) if checkpoint.accumulated_seconds > MAX_ACCUMULATED_SECONDS => {
                tracing::warn!(
                    key = %self.key,
                    accumulated = checkpoint.accumulated_seconds,
                    "Discarding timer checkpoint with out-of-range accumulated time"
                );
                None
            }
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding malformed timer checkpoint");
                None
            }
        }
    }

    /// Persist the current state; returns whether the write landed
    fn checkpoint(&mut self) -> bool {
        let now = self.clock.now();
        self.last_checkpoint = Some(now);
        let checkpoint = self.snapshot(now);
        let json = match serde_json::to_string(&checkpoint) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize timer checkpoint");
                return false;
            }
        };
        match self.store.set(&self.key, &json) {
            Ok(()) => {
                tracing::debug!(
                    key = %self.key,
                    accumulated = checkpoint.accumulated_seconds,
                    running = checkpoint.start_timestamp.is_some(),
                    "Timer checkpoint written"
                );
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Timer checkpoint write failed; continuing in memory");
                false
            }
        }
    }

    fn checkpoint_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checkpoint {
            Some(last) => (now - last)
                .to_std()
                .map(|since| since >= self.checkpoint_interval)
                .unwrap_or(false),
            None => true,
        }
    }

    fn tick(&mut self) -> u64 {
        let now = self.clock.now();
        if self.start.is_some() && self.checkpoint_due(now) {
            self.checkpoint();
        }
        self.elapsed_at(now)
    }
}

/// Elapsed-time tracker for one workout session
///
/// Owned by whoever holds the active workout; it is not a global.
pub struct SessionTimer {
    core: Arc<Mutex<TimerCore>>,
    repaint: watch::Sender<u64>,
    frame_task: Option<JoinHandle<()>>,
}

impl SessionTimer {
    /// Create an idle timer using the default key and checkpoint interval
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        let (repaint, _) = watch::channel(0);
        Self {
            core: Arc::new(Mutex::new(TimerCore {
                store,
                clock,
                key: DEFAULT_TIMER_KEY.to_string(),
                checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
                start: None,
                accumulated: 0,
                last_checkpoint: None,
            })),
            repaint,
            frame_task: None,
        }
    }

    /// Create an idle timer using the key and interval from `config`
    pub fn from_config(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self::new(store, clock)
            .with_key(config.timer_key.clone())
            .with_checkpoint_interval(config.checkpoint_interval)
    }

    /// Use a different store key (one per concurrent workout)
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.lock().key = key.into();
        self
    }

    pub fn with_checkpoint_interval(self, interval: Duration) -> Self {
        self.lock().checkpoint_interval = interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, TimerCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin or resume timing
    ///
    /// A checkpoint already in the store (a session that survived a restart or
    /// a pause) is adopted instead of starting from zero.
    pub fn start(&mut self) -> StartKind {
        let mut core = self.lock();
        if core.start.is_some() {
            return StartKind::AlreadyRunning;
        }

        let now = core.clock.now();
        let kind = match core.load_checkpoint() {
            Some(stored) => {
                core.accumulated = stored.accumulated_seconds;
                core.start = Some(stored.start_timestamp.unwrap_or(now));
                tracing::info!(
                    accumulated = stored.accumulated_seconds,
                    was_running = stored.start_timestamp.is_some(),
                    "Adopted stored timer checkpoint"
                );
                StartKind::Resumed {
                    accumulated_seconds: stored.accumulated_seconds,
                }
            }
            None => {
                core.start = Some(now);
                tracing::info!(accumulated = core.accumulated, "Started session timer");
                StartKind::Fresh
            }
        };
        core.checkpoint();
        let elapsed = core.elapsed_at(now);
        drop(core);
        self.repaint.send_replace(elapsed);
        kind
    }

    /// Stop timing but keep the elapsed value, in memory and in the store
    pub fn pause(&mut self) {
        self.cancel_frame_loop();
        let mut core = self.lock();
        if core.start.is_none() {
            return;
        }
        core.accumulated = core.elapsed();
        core.start = None;
        core.checkpoint();
        tracing::info!(accumulated = core.accumulated, "Paused session timer");
        let elapsed = core.accumulated;
        drop(core);
        self.repaint.send_replace(elapsed);
    }

    /// Stop timing and discard all state, including the stored checkpoint
    pub fn reset(&mut self) {
        // The frame loop must not outlive the state it samples.
        self.cancel_frame_loop();
        let mut core = self.lock();
        core.start = None;
        core.accumulated = 0;
        core.last_checkpoint = None;
        if let Err(e) = core.store.remove(&core.key) {
            tracing::warn!(key = %core.key, error = %e, "Failed to remove timer checkpoint");
        }
        tracing::info!("Reset session timer");
        drop(core);
        self.repaint.send_replace(0);
    }

    pub fn is_running(&self) -> bool {
        self.lock().start.is_some()
    }

    /// Current duration; the frozen accumulated value while idle
    pub fn elapsed_seconds(&self) -> u64 {
        self.lock().elapsed()
    }

    /// Current duration as `mm:ss`; minutes keep counting past 59
    pub fn format_elapsed(&self) -> String {
        format_mm_ss(self.elapsed_seconds())
    }

    /// Write a checkpoint now, regardless of the interval
    pub fn checkpoint(&self) -> bool {
        let mut core = self.lock();
        if core.start.is_none() {
            return false;
        }
        core.checkpoint()
    }

    /// Per-frame sample: returns elapsed seconds and checkpoints when due
    pub fn tick(&self) -> u64 {
        let elapsed = self.lock().tick();
        self.repaint.send_replace(elapsed);
        elapsed
    }

    /// React to the host going to background or coming back
    ///
    /// Hidden writes a checkpoint at once. Visible recomputes from the clock
    /// rather than trusting whatever was last painted.
    pub fn on_visibility_change(&self, visibility: Visibility) -> u64 {
        let mut core = self.lock();
        if visibility == Visibility::Hidden && core.start.is_some() {
            core.checkpoint();
        }
        let elapsed = core.elapsed();
        drop(core);
        tracing::debug!(?visibility, elapsed, "Visibility changed");
        self.repaint.send_replace(elapsed);
        elapsed
    }

    /// Receiver of repaint hints (elapsed seconds)
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.repaint.subscribe()
    }

    /// Spawn the repaint loop on the current tokio runtime
    ///
    /// Samples every `frame_period` and checkpoints every checkpoint interval.
    /// Replaces a loop that is already running. Must be called from within a
    /// runtime.
    pub fn spawn_frame_loop(&mut self, frame_period: Duration) -> watch::Receiver<u64> {
        self.cancel_frame_loop();

        let core = Arc::clone(&self.core);
        let repaint = self.repaint.clone();
        let checkpoint_period = self.lock().checkpoint_interval;

        let handle = tokio::spawn(async move {
            let mut frames = tokio::time::interval(frame_period);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut checkpoints = tokio::time::interval(checkpoint_period);
            checkpoints.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick of an interval fires immediately and start() already wrote one.
            checkpoints.tick().await;

            loop {
                tokio::select! {
                    _ = frames.tick() => {
                        let elapsed = core.lock().unwrap_or_else(|e| e.into_inner()).elapsed();
                        repaint.send_replace(elapsed);
                    }
                    _ = checkpoints.tick() => {
                        let mut core = core.lock().unwrap_or_else(|e| e.into_inner());
                        if core.start.is_some() {
                            core.checkpoint();
                        }
                    }
                }
            }
        });

        self.frame_task = Some(handle);
        self.subscribe()
    }

    /// Abort the repaint loop, if any
    pub fn cancel_frame_loop(&mut self) {
        if let Some(handle) = self.frame_task.take() {
            handle.abort();
        }
    }

    pub fn has_frame_loop(&self) -> bool {
        self.frame_task.is_some()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel_frame_loop();
    }
}

impl std::fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.lock();
        f.debug_struct("SessionTimer")
            .field("key", &core.key)
            .field("running", &core.start.is_some())
            .field("accumulated", &core.accumulated)
            .field("frame_loop", &self.frame_task.is_some())
            .finish()
    }
}

/// Format seconds as `mm:ss`
pub fn format_mm_ss(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
