//! Property-based tests for the offline queue

use std::sync::Arc;

use liftlog_session::session::{ManualClock, MemoryStore, OfflineQueue};
use proptest::prelude::*;

use crate::common::{sample_record, RecordingWriter};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_drain_delivers_in_enqueue_order(
        count in 1usize..12,
        failing in prop::collection::vec(1usize..30, 0..6),
    ) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new());
        let queue = OfflineQueue::load(store.clone(), clock.clone());
        let titles: Vec<String> = (0..count).map(|i| format!("Workout {i}")).collect();
        for title in &titles {
            queue.enqueue(sample_record(title));
        }

        let writer = RecordingWriter::new();
        for call in &failing {
            writer.fail_call(*call);
        }

        let rt = runtime();
        // Enough passes to get past every scripted failure.
        for _ in 0..=failing.len() + 1 {
            rt.block_on(queue.drain(&writer)).unwrap();
        }

        prop_assert!(queue.is_empty());
        prop_assert_eq!(writer.delivered_titles(), titles);
    }

    #[test]
    fn test_persisted_queue_matches_memory(
        count in 0usize..8,
        deliver_first in 0usize..8,
    ) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new());
        let queue = OfflineQueue::load(store.clone(), clock.clone());
        for i in 0..count {
            queue.enqueue(sample_record(&format!("W{i}")));
        }

        let writer = RecordingWriter::new();
        // Fail the call right after `deliver_first` successes.
        writer.fail_call(deliver_first + 1);
        runtime().block_on(queue.drain(&writer)).unwrap();

        let restored = OfflineQueue::load(store, clock);
        prop_assert_eq!(restored.snapshot(), queue.snapshot());
        prop_assert_eq!(restored.len(), count.saturating_sub(deliver_first));
    }
}
