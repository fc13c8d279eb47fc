//! Increments flow through the feed into an idempotent projection

use crate::common::*;
use countfeed::{CounterProjection, CounterStore, DocumentStore, LoggingHandler};
use std::collections::BTreeSet;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn projection_matches_store_across_restarts() {
    let deployment = Deployment::new(8);
    let counters = CounterStore::new(deployment.documents.clone());
    let projection = Arc::new(CounterProjection::new());
    let names: Vec<String> = (0..30).map(|i| format!("counter-{i}")).collect();

    let mut a = deployment.start("a", projection.clone());
    let b = deployment.start("b", projection.clone());
    let c = deployment.start("c", projection.clone());

    for round in 0..4 {
        for name in &names {
            counters.increment(name, name).await.unwrap();
        }
        if round == 1 {
            // Restart `a` in the middle of the run.
            a.shutdown().await;
            a = deployment.start("a", projection.clone());
        }
    }

    let caught_up = wait_until(WAIT, || async {
        names
            .iter()
            .all(|name| projection.value(name, name) == Some(4))
    })
    .await;
    assert!(caught_up);

    for name in &names {
        let stored = counters.get(name, name).await.unwrap();
        assert_eq!(projection.value(name, name), Some(stored.value));
    }

    for processor in [a, b, c] {
        processor.shutdown().await;
    }
}

#[tokio::test]
async fn owners_never_overlap() {
    let deployment = Deployment::new(6);
    let processors: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|owner| deployment.start(owner, Arc::new(LoggingHandler)))
        .collect();

    let all: BTreeSet<_> = deployment.documents.partitions().into_iter().collect();
    let covered = wait_until(WAIT, || async {
        let mut seen = BTreeSet::new();
        let mut total = 0;
        for processor in &processors {
            let owned = processor.owned_partitions();
            total += owned.len();
            seen.extend(owned);
        }
        total == seen.len() && seen == all
    })
    .await;
    assert!(covered);

    for processor in processors {
        processor.shutdown().await;
    }
}

#[tokio::test]
async fn seeded_counter_reaches_the_feed() {
    let deployment = Deployment::new(2);
    let counters = CounterStore::new(deployment.documents.clone());
    assert!(counters.seed("default", "default").await.unwrap());

    let projection = Arc::new(CounterProjection::new());
    let processor = deployment.start("a", projection.clone());

    assert!(wait_until(WAIT, || async { projection.value("default", "default") == Some(0) }).await);
    counters.increment("default", "default").await.unwrap();
    assert!(wait_until(WAIT, || async { projection.value("default", "default") == Some(1) }).await);

    processor.shutdown().await;
}
