//! Process restart scenarios with the file-backed store

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use liftlog_session::session::{FileStore, FinishOutcome, ManualClock, StartKind};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::common::{sample_exercises, TestSession};

fn file_store(dir: &TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::open(dir.path()).unwrap())
}

#[test]
fn test_running_timer_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());

    {
        let mut session = TestSession::new(file_store(&dir), clock.clone(), true);
        assert_eq!(session.controller.start_workout("Pull day", None), StartKind::Fresh);
        clock.advance(ChronoDuration::seconds(90));
    }

    // Time keeps passing while the process is gone.
    clock.advance(ChronoDuration::seconds(30));

    let mut session = TestSession::new(file_store(&dir), clock.clone(), true);
    assert_eq!(
        session.controller.start_workout("Pull day", None),
        StartKind::Resumed {
            accumulated_seconds: 0
        }
    );
    assert_eq!(session.controller.elapsed_seconds(), 120);
    assert_eq!(session.controller.format_elapsed(), "02:00");
}

#[test]
fn test_paused_timer_survives_restart_frozen() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());

    {
        let mut session = TestSession::new(file_store(&dir), clock.clone(), true);
        session.controller.start_workout("Core", None);
        clock.advance(ChronoDuration::seconds(45));
        session.controller.pause();
    }
    clock.advance(ChronoDuration::hours(1));

    let mut session = TestSession::new(file_store(&dir), clock.clone(), true);
    assert_eq!(
        session.controller.start_workout("Core", None),
        StartKind::Resumed {
            accumulated_seconds: 45
        }
    );
    assert_eq!(session.controller.elapsed_seconds(), 45);
}

#[tokio::test]
async fn test_queued_workout_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());

    let queued_id = {
        let mut session = TestSession::new(file_store(&dir), clock.clone(), false);
        session.controller.start_workout("Offline day", None);
        clock.advance(ChronoDuration::minutes(30));
        let outcome = session.controller.finish_workout(sample_exercises(), None).await.unwrap();
        match outcome {
            FinishOutcome::Queued(m) => m.id,
            FinishOutcome::Saved(_) => panic!("Expected Queued while offline"),
        }
    };

    let session = TestSession::new(file_store(&dir), clock, true);
    assert_eq!(session.controller.queue_count(), 1);
    assert_eq!(session.controller.elapsed_seconds(), 0);

    let report = session.controller.drain().await.unwrap();
    assert_eq!(report.delivered, 1);
    let delivered = session.writer.delivered();
    assert_eq!(delivered[0].id, queued_id);
    assert_eq!(delivered[0].payload.duration_seconds, 30 * 60);

    // Delivery is persisted too: a third process sees an empty queue.
    let session = TestSession::new(file_store(&dir), Arc::new(ManualClock::new()), true);
    assert_eq!(session.controller.queue_count(), 0);
}

#[test]
fn test_corrupt_queue_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("workout-offline-queue.json"), "{not json").unwrap();

    let session = TestSession::new(file_store(&dir), Arc::new(ManualClock::new()), true);
    assert_eq!(session.controller.queue_count(), 0);
}
