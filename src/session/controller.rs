//! # Session Controller
//!
//! Owns the active workout: starts and stops its timer and, when the user
//! finishes, decides whether the record goes straight to the remote writer or
//! into the offline queue.
//!
//! ## Finishing a workout
//!
//! 1. The record is built from the timer's elapsed value and validated
//! 2. Online with an empty queue: direct write; a failed write falls back to
//!    the queue under the same idempotency key
//! 3. Online with queued workouts: the record joins the back of the queue and a
//!    drain runs, so it cannot overtake an earlier workout
//! 4. Offline: queued; the sync service delivers it on reconnect
//! 5. The timer is reset

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::clock::{Clock, SystemClock};
use crate::session::local_store::{DurableStore, FileStore};
use crate::session::offline::{DrainReport, OfflineQueue, QueuedMutation};
use crate::session::sync::{ConnectivityMonitor, ConnectivityState, OfflineSync};
use crate::session::timer::{SessionTimer, StartKind, Visibility};
use crate::session::writer::WorkoutWriter;
use crate::shared::config::SessionConfig;
use crate::shared::error::SessionError;
use crate::shared::workout::{ExerciseLog, WorkoutRecord};

/// Metadata of the workout in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWorkout {
    pub title: String,
    pub plan_id: Option<String>,
}

/// Where a finished workout ended up
#[derive(Debug, Clone, PartialEq)]
pub enum FinishOutcome {
    /// Confirmed by the remote store
    Saved(QueuedMutation),
    /// Waiting in the offline queue
    Queued(QueuedMutation),
}

impl FinishOutcome {
    pub fn mutation(&self) -> &QueuedMutation {
        match self {
            FinishOutcome::Saved(m) | FinishOutcome::Queued(m) => m,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, FinishOutcome::Saved(_))
    }
}

/// Composition point for the timer, queue, monitor and writer
pub struct SessionController {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    timer: SessionTimer,
    queue: Arc<OfflineQueue>,
    monitor: Arc<ConnectivityMonitor>,
    writer: Arc<dyn WorkoutWriter>,
    active: Option<ActiveWorkout>,
    sync: Option<OfflineSync>,
}

impl SessionController {
    /// Assemble a controller from explicit parts
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        monitor: Arc<ConnectivityMonitor>,
        writer: Arc<dyn WorkoutWriter>,
    ) -> Self {
        let timer = SessionTimer::from_config(store.clone(), clock.clone(), &config);
        let queue = Arc::new(OfflineQueue::load_with_key(
            store,
            clock.clone(),
            config.queue_key.clone(),
        ));
        Self {
            config,
            clock,
            timer,
            queue,
            monitor,
            writer,
            active: None,
            sync: None,
        }
    }

    /// File store under `config.data_dir`, system clock, initially online
    pub fn open(config: SessionConfig, writer: Arc<dyn WorkoutWriter>) -> Result<Self, SessionError> {
        let store = Arc::new(FileStore::open(&config.data_dir)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let monitor = Arc::new(
            ConnectivityMonitor::new(clock.clone(), true).with_reconnect_window(config.reconnect_window),
        );
        Ok(Self::new(config, store, clock, monitor, writer))
    }

    /// Start automatic queue replay on the current runtime
    pub fn start_background_sync(&mut self) {
        if self.sync.as_ref().is_some_and(OfflineSync::is_running) {
            return;
        }
        self.sync = Some(OfflineSync::spawn(
            Arc::clone(&self.queue),
            Arc::clone(&self.monitor),
            Arc::clone(&self.writer),
            self.config.retry_interval,
        ));
    }

    pub fn stop_background_sync(&mut self) {
        if let Some(mut sync) = self.sync.take() {
            sync.stop();
        }
    }

    /// Begin a workout, or adopt the timer of one that survived a restart
    ///
    /// Returns `AlreadyRunning` and changes nothing while a workout is active,
    /// paused or not; a paused workout continues through [`Self::resume`].
    pub fn start_workout(&mut self, title: impl Into<String>, plan_id: Option<String>) -> StartKind {
        if self.active.is_some() {
            return StartKind::AlreadyRunning;
        }
        let workout = ActiveWorkout {
            title: title.into(),
            plan_id,
        };
        tracing::info!(title = %workout.title, "Starting workout");
        self.active = Some(workout);
        let kind = self.timer.start();
        self.ensure_frame_loop();
        kind
    }

    fn ensure_frame_loop(&mut self) {
        if tokio::runtime::Handle::try_current().is_ok() && !self.timer.has_frame_loop() {
            self.timer.spawn_frame_loop(self.config.frame_interval);
        }
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    pub fn resume(&mut self) -> Result<StartKind, SessionError> {
        if self.active.is_none() {
            return Err(SessionError::NoActiveSession);
        }
        let kind = self.timer.start();
        self.ensure_frame_loop();
        Ok(kind)
    }

    /// Abandon the workout without saving anything
    pub fn discard_workout(&mut self) {
        if let Some(workout) = self.active.take() {
            tracing::info!(title = %workout.title, "Discarded workout");
        }
        self.timer.reset();
    }

    /// Finish the active workout and hand it off for persistence
    ///
    /// Validation failures leave the workout active and the timer running.
    pub async fn finish_workout(
        &mut self,
        exercises: Vec<ExerciseLog>,
        notes: Option<String>,
    ) -> Result<FinishOutcome, SessionError> {
        let workout = self.active.clone().ok_or(SessionError::NoActiveSession)?;

        let completed_at = self.clock.now();
        let duration_seconds = self.timer.elapsed_seconds();
        let started_at = i64::try_from(duration_seconds)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|span| completed_at.checked_sub_signed(span))
            .ok_or_else(|| {
                SessionError::validation("durationSeconds", "Elapsed time is out of range")
            })?;
        let mut record = WorkoutRecord::new(workout.title, started_at, completed_at, duration_seconds)
            .with_exercises(exercises);
        if let Some(plan_id) = workout.plan_id {
            record = record.with_plan(plan_id);
        }
        if let Some(notes) = notes {
            record = record.with_notes(notes);
        }
        record.validate()?;

        let mutation = QueuedMutation::new(record, completed_at);
        let outcome = self.deliver(mutation).await;

        self.active = None;
        self.timer.reset();
        Ok(outcome)
    }

    async fn deliver(&self, mutation: QueuedMutation) -> FinishOutcome {
        if !self.monitor.is_online() {
            tracing::info!(id = %mutation.id, "Offline; queueing finished workout");
            return FinishOutcome::Queued(self.queue.enqueue_mutation(mutation));
        }

        if !self.queue.is_empty() {
            let mutation = self.queue.enqueue_mutation(mutation);
            match self.queue.drain(self.writer.as_ref()).await {
                Ok(_) | Err(SessionError::DrainInProgress) => {}
                Err(e) => tracing::warn!(error = %e, "Drain after finish failed"),
            }
            return if self.queue.contains(mutation.id) {
                FinishOutcome::Queued(mutation)
            } else {
                FinishOutcome::Saved(mutation)
            };
        }

        match self.writer.save_workout(&mutation).await {
            Ok(()) => {
                tracing::info!(id = %mutation.id, "Workout saved");
                FinishOutcome::Saved(mutation)
            }
            Err(e) => {
                tracing::warn!(id = %mutation.id, error = %e, "Direct save failed; queueing workout");
                FinishOutcome::Queued(self.queue.enqueue_mutation(mutation))
            }
        }
    }

    /// Manually replay the offline queue
    pub async fn drain(&self) -> Result<DrainReport, SessionError> {
        self.queue.drain(self.writer.as_ref()).await
    }

    /// Host connectivity notification
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    pub fn on_visibility_change(&self, visibility: Visibility) -> u64 {
        self.timer.on_visibility_change(visibility)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn format_elapsed(&self) -> String {
        self.timer.format_elapsed()
    }

    /// Repaint hints for the elapsed display
    pub fn subscribe_elapsed(&self) -> watch::Receiver<u64> {
        self.timer.subscribe()
    }

    pub fn subscribe_connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.monitor.subscribe()
    }

    pub fn active_workout(&self) -> Option<&ActiveWorkout> {
        self.active.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn queue_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn just_reconnected(&self) -> bool {
        self.monitor.just_reconnected()
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("active", &self.active)
            .field("timer", &self.timer)
            .field("queue", &self.queue)
            .field("monitor", &self.monitor)
            .finish()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Leave the checkpoint in the store; the next process adopts it.
        if self.timer.is_running() {
            self.timer.on_visibility_change(Visibility::Hidden);
        }
    }
}
