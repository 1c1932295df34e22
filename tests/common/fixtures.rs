//! Record and controller fixtures

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use liftlog_session::session::{Clock, ConnectivityMonitor, DurableStore, ManualClock, SessionController};
use liftlog_session::shared::{ExerciseLog, SessionConfig, SetLog, WorkoutRecord};

use super::writers::RecordingWriter;

/// A valid record with one exercise
pub fn sample_record(title: &str) -> WorkoutRecord {
    let completed = Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap();
    let started = completed - chrono::Duration::minutes(45);
    WorkoutRecord::new(title, started, completed, 45 * 60).with_exercises(sample_exercises())
}

pub fn sample_exercises() -> Vec<ExerciseLog> {
    vec![
        ExerciseLog::new("Bench press", vec![SetLog::new(8, Some(80.0)), SetLog::new(8, Some(80.0))]),
        ExerciseLog::new("Pull-up", vec![SetLog::new(10, None)]),
    ]
}

/// Controller wired to the given store, a manual clock and a recording writer
pub struct TestSession {
    pub controller: SessionController,
    pub clock: Arc<ManualClock>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub writer: Arc<RecordingWriter>,
}

impl TestSession {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<ManualClock>, online: bool) -> Self {
        Self::with_writer(store, clock, online, Arc::new(RecordingWriter::new()))
    }

    pub fn with_writer(
        store: Arc<dyn DurableStore>,
        clock: Arc<ManualClock>,
        online: bool,
        writer: Arc<RecordingWriter>,
    ) -> Self {
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let monitor = Arc::new(ConnectivityMonitor::new(dyn_clock.clone(), online));
        let config = SessionConfig::builder()
            .retry_interval(std::time::Duration::from_secs(30))
            .build()
            .unwrap();
        let controller = SessionController::new(config, store, dyn_clock, monitor.clone(), writer.clone());
        Self {
            controller,
            clock,
            monitor,
            writer,
        }
    }
}
