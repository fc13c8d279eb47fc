//! Processor lifecycle
//!
//! - a lone processor claims every partition and releases them on shutdown
//! - two processors split the partitions without overlap
//! - partitions released by one processor are picked up by the other

use crate::common::*;
use countfeed_core::{LeaseState, PartitionId};
use countfeed_engine::{ChangeHandler, CounterProjection, LoggingHandler};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn single_processor_owns_all_and_releases_on_shutdown() {
    let stores = TestStores::new(4);
    let processor = stores.start("solo", Arc::new(LoggingHandler), 10);

    assert!(wait_until(WAIT, || async { processor.owned_partitions().len() == 4 }).await);

    processor.shutdown().await;
    let leases = stores
        .coordinator("observer")
        .list(&stores.partitions())
        .await
        .unwrap();
    assert!(leases.iter().all(|info| info.state == LeaseState::Released));
}

#[tokio::test]
async fn projection_catches_up_with_increments() {
    let stores = TestStores::new(4);
    let counters = stores.counters();
    let projection = Arc::new(CounterProjection::new());
    let processor = stores.start("solo", projection.clone(), 3);

    let names: Vec<String> = (0..10).map(|i| format!("counter-{i}")).collect();
    for round in 1..=3 {
        for name in &names {
            assert_eq!(counters.increment(name, name).await.unwrap(), round);
        }
    }

    let caught_up = wait_until(WAIT, || async {
        names.iter().all(|name| projection.value(name, name) == Some(3))
    })
    .await;
    assert!(caught_up);
    assert_eq!(projection.len(), 10);

    processor.shutdown().await;
}

#[tokio::test]
async fn two_processors_split_partitions() {
    let stores = TestStores::new(4);
    let projection = Arc::new(CounterProjection::new());
    let handler: Arc<dyn ChangeHandler> = projection.clone();

    let a = stores.start("a", handler.clone(), 10);
    let b = stores.start("b", handler.clone(), 10);

    let all: BTreeSet<PartitionId> = stores.partitions().into_iter().collect();
    let split = wait_until(WAIT, || async {
        let owned_a: BTreeSet<_> = a.owned_partitions().into_iter().collect();
        let owned_b: BTreeSet<_> = b.owned_partitions().into_iter().collect();
        owned_a.is_disjoint(&owned_b) && owned_a.union(&owned_b).copied().collect::<BTreeSet<_>>() == all
    })
    .await;
    assert!(split);

    let counters = stores.counters();
    for i in 0..20 {
        let name = format!("c{i}");
        counters.increment(&name, &name).await.unwrap();
    }
    assert!(wait_until(WAIT, || async { projection.len() == 20 }).await);

    // Once `a` leaves, `b` takes over everything and keeps consuming.
    a.shutdown().await;
    assert!(wait_until(WAIT, || async { b.owned_partitions().len() == 4 }).await);

    for i in 0..20 {
        let name = format!("c{i}");
        counters.increment(&name, &name).await.unwrap();
    }
    let caught_up = wait_until(WAIT, || async {
        (0..20).all(|i| {
            let name = format!("c{i}");
            projection.value(&name, &name) == Some(2)
        })
    })
    .await;
    assert!(caught_up);

    b.shutdown().await;
}

#[tokio::test]
async fn restarted_processor_resumes_from_checkpoint() {
    let stores = TestStores::new(1);
    let counters = stores.counters();
    for _ in 0..3 {
        counters.increment("c", "c").await.unwrap();
    }

    let first = Arc::new(RecordingHandler::new());
    let processor = stores.start("a", first.clone(), 10);
    assert!(wait_until(WAIT, || async { stores.checkpoint(PartitionId::new(0)).await == 3 }).await);
    processor.shutdown().await;

    counters.increment("c", "c").await.unwrap();

    let second = Arc::new(RecordingHandler::new());
    let processor = stores.start("b", second.clone(), 10);
    assert!(wait_until(WAIT, || async { stores.checkpoint(PartitionId::new(0)).await == 4 }).await);
    let sequences: Vec<u64> = second.deliveries().iter().map(|&(_, seq)| seq).collect();
    assert_eq!(sequences, vec![4]);

    processor.shutdown().await;
}
