//! Counter increment semantics
//!
//! - absent counters read as (0, false)
//! - n sequential increments return 1..=n
//! - concurrent last-writer-wins increments may lose an update

use crate::common::*;
use countfeed_core::CounterValue;
use countfeed_engine::{CounterStore, IncrementStrategy, RetryConfig};
use std::time::Duration;

#[tokio::test]
async fn absent_counter_then_first_increment() {
    let stores = TestStores::new(4);
    let counters = stores.counters();

    assert_eq!(counters.get("fresh", "fresh").await.unwrap(), CounterValue::ABSENT);
    assert_eq!(counters.increment("fresh", "fresh").await.unwrap(), 1);
    assert_eq!(
        counters.get("fresh", "fresh").await.unwrap(),
        CounterValue::present(1)
    );
}

#[tokio::test]
async fn sequential_increments_return_each_value() {
    let stores = TestStores::new(4);
    let counters = stores.counters();

    let returned: Vec<i64> = {
        let mut values = Vec::new();
        for _ in 0..25 {
            values.push(counters.increment("seq", "seq").await.unwrap());
        }
        values
    };
    assert_eq!(returned, (1..=25).collect::<Vec<_>>());
    assert_eq!(counters.get("seq", "seq").await.unwrap().value, 25);
}

#[tokio::test]
async fn increment_then_get_agree() {
    let stores = TestStores::new(2);
    let counters = stores.counters();
    for name in ["a", "b", "c"] {
        let written = counters.increment(name, name).await.unwrap();
        assert_eq!(counters.get(name, name).await.unwrap().value, written);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_unguarded_increments_end_in_one_or_two() {
    for _ in 0..20 {
        let stores = TestStores::new(4);
        let counters = stores.counters();

        let a = tokio::spawn({
            let counters = counters.clone();
            async move { counters.increment("race", "race").await.unwrap() }
        });
        let b = tokio::spawn({
            let counters = counters.clone();
            async move { counters.increment("race", "race").await.unwrap() }
        });
        a.await.unwrap();
        b.await.unwrap();

        let value = counters.get("race", "race").await.unwrap().value;
        assert!(value == 1 || value == 2, "unexpected race outcome {value}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_optimistic_increments_end_in_two() {
    for _ in 0..20 {
        let stores = TestStores::new(4);
        let counters = CounterStore::with_strategy(
            stores.documents.clone(),
            IncrementStrategy::Optimistic(
                RetryConfig::default().with_base_delay(Duration::from_millis(1)),
            ),
        );

        let a = tokio::spawn({
            let counters = counters.clone();
            async move { counters.increment("race", "race").await.unwrap() }
        });
        let b = tokio::spawn({
            let counters = counters.clone();
            async move { counters.increment("race", "race").await.unwrap() }
        });
        let mut returned = [a.await.unwrap(), b.await.unwrap()];
        returned.sort_unstable();

        assert_eq!(returned, [1, 2]);
        assert_eq!(counters.get("race", "race").await.unwrap().value, 2);
    }
}
