//! Partitions of an instance that stopped renewing are taken over after
//! their leases expire, starting from the checkpoint it left behind.

use crate::common::*;
use countfeed::{Acquisition, CheckpointToken, CounterProjection, CounterStore, PartitionId};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn expired_partitions_are_taken_over_from_checkpoint() {
    let deployment = Deployment::new(1);
    let counters = CounterStore::new(deployment.documents.clone());
    for _ in 0..5 {
        counters.increment("c", "c").await.unwrap();
    }

    // A crashed instance: it claimed the partition, checkpointed three
    // events, and never renewed again.
    let ghost = deployment.coordinator("ghost");
    let Acquisition::Acquired(mut lease) = ghost.acquire(PartitionId::new(0)).await.unwrap() else {
        panic!("ghost should claim the free partition");
    };
    ghost
        .checkpoint(&mut lease, CheckpointToken::after(3))
        .await
        .unwrap();
    let claimed_at = Instant::now();

    let projection = Arc::new(CounterProjection::new());
    let processor = deployment.start("survivor", projection.clone());

    assert!(wait_until(WAIT, || async { processor.owned_partitions().len() == 1 }).await);
    assert!(claimed_at.elapsed() >= LEASE_EXPIRY - Duration::from_millis(5));

    assert!(wait_until(WAIT, || async { projection.value("c", "c") == Some(5) }).await);
    // Events 1 to 3 were covered by the checkpoint and never redelivered.
    assert_eq!(projection.applied(), 2);

    assert!(ghost.renew(&mut lease).await.is_err());
    processor.shutdown().await;
}
