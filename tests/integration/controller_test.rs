//! Controller scenarios with an in-memory store

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Duration as ChronoDuration;
use liftlog_session::session::{DrainReport, FinishOutcome, ManualClock, MemoryStore, OfflineQueue};
use liftlog_session::shared::SessionError;
use pretty_assertions::assert_eq;

use crate::common::{sample_exercises, sample_record, RecordingWriter, TestSession};

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn test_offline_finish_then_reconnect_auto_drains() {
    let store = Arc::new(MemoryStore::new());
    let mut session = TestSession::new(store.clone(), Arc::new(ManualClock::new()), false);
    session.controller.start_background_sync();

    session.controller.start_workout("Leg day", None);
    session.clock.advance(ChronoDuration::minutes(40));
    let outcome = crate::assert_ok!(session.controller.finish_workout(sample_exercises(), None).await);

    let queued = assert_matches!(outcome, FinishOutcome::Queued(m) => m);
    assert_eq!(queued.payload.duration_seconds, 40 * 60);
    assert_eq!(session.controller.queue_count(), 1);
    assert!(store.contains_key("workout-offline-queue"));

    session.controller.set_online(true);
    assert!(session.controller.just_reconnected());

    let queue = session.controller.queue().clone();
    wait_until(|| queue.is_empty()).await;

    let delivered = session.writer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].id, queued.id);
    assert_eq!(delivered[0].payload.title, "Leg day");
}

#[tokio::test]
async fn test_failure_on_second_of_three_preserves_order() {
    let clock = Arc::new(ManualClock::new());
    let queue = OfflineQueue::load(Arc::new(MemoryStore::new()), clock);
    let a = queue.enqueue(sample_record("A"));
    let b = queue.enqueue(sample_record("B"));
    let c = queue.enqueue(sample_record("C"));

    let writer = RecordingWriter::new();
    writer.fail_call(2);

    let report = queue.drain(&writer).await.unwrap();
    assert_eq!(report, DrainReport { delivered: 1, remaining: 2 });
    crate::assert_queue_ids!(queue, [b.id, c.id]);
    assert_eq!(queue.snapshot()[0].attempts, 1);

    let report = queue.drain(&writer).await.unwrap();
    assert_eq!(report, DrainReport { delivered: 2, remaining: 0 });
    assert_eq!(writer.delivered_titles(), vec!["A", "B", "C"]);
    assert_eq!(
        writer.delivered().iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![a.id, b.id, c.id]
    );
}

#[tokio::test]
async fn test_unreachable_server_keeps_workout_queued() {
    let writer = Arc::new(RecordingWriter::new());
    writer.set_unreachable(true);
    let mut session = TestSession::with_writer(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
        true,
        writer.clone(),
    );

    session.controller.start_workout("Push day", Some("plan-7".to_string()));
    let outcome = session.controller.finish_workout(sample_exercises(), None).await.unwrap();
    let queued = assert_matches!(outcome, FinishOutcome::Queued(m) => m);
    assert_eq!(queued.payload.plan_id.as_deref(), Some("plan-7"));

    writer.set_unreachable(false);
    let report = session.controller.drain().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(writer.delivered()[0].id, queued.id);
}

#[tokio::test]
async fn test_concurrent_drains_deliver_once() {
    let clock = Arc::new(ManualClock::new());
    let queue = Arc::new(OfflineQueue::load(Arc::new(MemoryStore::new()), clock));
    for title in ["A", "B", "C"] {
        queue.enqueue(sample_record(title));
    }
    let writer = Arc::new(RecordingWriter::new());

    let (first, second) = tokio::join!(queue.drain(writer.as_ref()), queue.drain(writer.as_ref()));
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SessionError::DrainInProgress))));
    assert_eq!(writer.delivered_titles(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_visibility_round_trip_reports_fresh_elapsed() {
    use liftlog_session::session::Visibility;

    let mut session = TestSession::new(Arc::new(MemoryStore::new()), Arc::new(ManualClock::new()), true);
    session.controller.start_workout("Cardio", None);

    session.clock.advance(ChronoDuration::seconds(10));
    assert_eq!(session.controller.on_visibility_change(Visibility::Hidden), 10);
    session.clock.advance(ChronoDuration::seconds(50));
    assert_eq!(session.controller.on_visibility_change(Visibility::Visible), 60);
    assert_eq!(session.controller.format_elapsed(), "01:00");
}
