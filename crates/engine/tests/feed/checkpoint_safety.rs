//! Checkpoint safety
//!
//! A checkpoint never moves past an event whose handler failed, and a batch
//! that failed is delivered again from the last checkpoint.

use crate::common::*;
use countfeed_core::PartitionId;
use countfeed_engine::CounterProjection;
use std::sync::Arc;
use std::time::Duration;

const P0: PartitionId = PartitionId::new(0);
const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn failed_batch_is_not_checkpointed() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    for _ in 0..3 {
        counters.increment("c", "c").await.unwrap();
    }

    let handler = Arc::new(RecordingHandler::new());
    handler.poison(2);
    let processor = stores.start("a", handler.clone(), 10);

    assert!(wait_until(WAIT, || async { handler.failures() >= 3 }).await);
    assert_eq!(stores.checkpoint(P0).await, 0);
    // Redelivery restarts from the beginning of the failed batch.
    assert!(handler.times_delivered(P0, 1) >= 3);
    assert_eq!(handler.times_delivered(P0, 3), 0);

    handler.heal();
    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 3 }).await);
    assert!(handler.times_delivered(P0, 3) >= 1);

    processor.shutdown().await;
}

#[tokio::test]
async fn checkpoint_stops_before_failing_event() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    for _ in 0..3 {
        counters.increment("c", "c").await.unwrap();
    }

    let handler = Arc::new(RecordingHandler::new());
    handler.poison(2);
    let processor = stores.start("a", handler.clone(), 1);

    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 1 }).await);
    assert!(wait_until(WAIT, || async { handler.failures() >= 3 }).await);
    assert_eq!(stores.checkpoint(P0).await, 1);
    assert_eq!(handler.times_delivered(P0, 3), 0);

    processor.shutdown().await;
}

#[tokio::test]
async fn redelivered_events_leave_projection_unchanged() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    for name in ["x", "y", "x", "x", "y"] {
        counters.increment(name, name).await.unwrap();
    }

    let handler = Arc::new(FailOnceAfter::new(CounterProjection::new(), 4));
    let processor = stores.start("a", handler.clone(), 10);

    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 5 }).await);
    assert!(handler.tripped());

    let projection = &handler.inner;
    assert_eq!(projection.value("x", "x"), Some(3));
    assert_eq!(projection.value("y", "y"), Some(2));
    // The first pass applied events 1 to 4; the second pass skipped them.
    assert_eq!(projection.applied(), 5);
    assert_eq!(projection.skipped(), 4);

    processor.shutdown().await;
}

#[tokio::test]
async fn store_failures_are_retried_without_losing_events() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    for _ in 0..4 {
        counters.increment("c", "c").await.unwrap();
    }

    stores.documents.faults().fail_next_feed_reads(3);
    let handler = Arc::new(RecordingHandler::new());
    let processor = stores.start("a", handler.clone(), 10);

    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 4 }).await);
    assert_eq!(stores.documents.faults().injected(), 3);
    let sequences: Vec<u64> = handler.deliveries().iter().map(|&(_, seq)| seq).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    processor.shutdown().await;
}
