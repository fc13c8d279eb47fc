//! Lease loss inside a running processor
//!
//! - a worker whose lease expired hands nothing more to its handler, even
//!   before the next renewal tick notices
//! - a renewal that fails with a store error stops the partition until the
//!   lease can be claimed again

use crate::common::*;
use countfeed_core::{LeaseState, ManualClock, OwnerId, PartitionId};
use countfeed_engine::{Acquisition, ChangeFeedProcessor, LeaseCoordinator, ProcessorOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);
const P0: PartitionId = PartitionId::new(0);

#[tokio::test]
async fn expired_worker_stops_before_next_renewal() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    let clock = Arc::new(ManualClock::starting_now());
    let expiry = Duration::from_secs(60);
    let coordinator = |owner: &str| {
        LeaseCoordinator::with_clock(
            stores.leases.clone(),
            OwnerId::new(owner),
            expiry,
            clock.clone(),
        )
    };

    // The renewal tick only fires once at start within this test.
    let handler = Arc::new(RecordingHandler::new());
    let processor = ChangeFeedProcessor::new(
        stores.documents.clone(),
        coordinator("a"),
        handler.clone(),
        ProcessorOptions {
            renewal_interval: Duration::from_secs(30),
            poll_interval: Duration::from_millis(5),
            batch_size: 8,
        },
    )
    .unwrap()
    .start(CancellationToken::new());

    assert!(wait_until(WAIT, || async { processor.owned_partitions() == vec![P0] }).await);
    counters.increment("c", "c").await.unwrap();
    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 1 }).await);

    clock.advance(expiry + Duration::from_secs(1));
    let b = coordinator("b");
    assert!(matches!(b.acquire(P0).await.unwrap(), Acquisition::Acquired(_)));

    counters.increment("c", "c").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(handler.deliveries(), vec![(P0, 1)]);

    processor.shutdown().await;

    // Shutdown must not hand the partition back from under `b`.
    let leases = b.list(&[P0]).await.unwrap();
    assert_eq!(leases[0].state, LeaseState::Owned);
    assert_eq!(
        leases[0].lease.as_ref().unwrap().owner_id,
        Some(OwnerId::new("b"))
    );
}

#[tokio::test]
async fn failed_renewal_stops_partition_until_reclaimed() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    let handler = Arc::new(RecordingHandler::new());
    let processor = stores.start("a", handler.clone(), 8);

    assert!(wait_until(WAIT, || async { processor.owned_partitions() == vec![P0] }).await);
    counters.increment("c", "c").await.unwrap();
    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 1 }).await);

    // Renewals and re-claims both write to the lease container.
    stores.leases.faults().fail_next_writes(usize::MAX);
    assert!(wait_until(WAIT, || async { processor.owned_partitions().is_empty() }).await);

    counters.increment("c", "c").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.deliveries(), vec![(P0, 1)]);

    stores.leases.faults().clear();
    assert!(wait_until(WAIT, || async { stores.checkpoint(P0).await == 2 }).await);
    assert_eq!(handler.times_delivered(P0, 2), 1);
    assert_eq!(processor.owned_partitions(), vec![P0]);

    processor.shutdown().await;
}
