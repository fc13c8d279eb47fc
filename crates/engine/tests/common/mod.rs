//! Shared test utilities for the engine integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use async_trait::async_trait;
use countfeed_core::{ChangeEvent, DocumentStore, OwnerId, PartitionId};
use countfeed_engine::{
    ChangeFeedProcessor, ChangeHandler, CounterStore, HandlerError, LeaseCoordinator,
    ProcessorHandle, ProcessorOptions,
};
use countfeed_storage::{MemoryLeaseStore, MemoryStore};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const LEASE_EXPIRY: Duration = Duration::from_millis(300);

/// Processor timings short enough for tests.
pub fn fast_options(batch_size: usize) -> ProcessorOptions {
    ProcessorOptions {
        renewal_interval: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
        batch_size,
    }
}

/// Counter and lease containers of one test deployment.
pub struct TestStores {
    pub documents: Arc<MemoryStore>,
    pub leases: Arc<MemoryLeaseStore>,
}

impl TestStores {
    pub fn new(partition_count: u32) -> Self {
        Self {
            documents: Arc::new(MemoryStore::new("counters", partition_count)),
            leases: Arc::new(MemoryLeaseStore::new("leases")),
        }
    }

    pub fn counters(&self) -> CounterStore {
        CounterStore::new(self.documents.clone())
    }

    pub fn coordinator(&self, owner: &str) -> LeaseCoordinator {
        LeaseCoordinator::new(self.leases.clone(), OwnerId::new(owner), LEASE_EXPIRY)
    }

    pub fn partitions(&self) -> Vec<PartitionId> {
        self.documents.partitions()
    }

    /// Start a processor named `owner` feeding `handler`.
    pub fn start(
        &self,
        owner: &str,
        handler: Arc<dyn ChangeHandler>,
        batch_size: usize,
    ) -> ProcessorHandle {
        let processor = ChangeFeedProcessor::new(
            self.documents.clone(),
            self.coordinator(owner),
            handler,
            fast_options(batch_size),
        )
        .expect("valid processor options");
        processor.start(CancellationToken::new())
    }

    /// Persisted checkpoint position of a partition (0 if never claimed).
    pub async fn checkpoint(&self, partition: PartitionId) -> u64 {
        let leases = self
            .coordinator("observer")
            .list(&[partition])
            .await
            .expect("list leases");
        leases[0]
            .lease
            .as_ref()
            .map_or(0, |lease| lease.checkpoint_token.last_processed())
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Handler that records every delivery and can be told to fail on one
/// sequence position.
#[derive(Default)]
pub struct RecordingHandler {
    deliveries: Mutex<Vec<(PartitionId, u64)>>,
    poison: Mutex<Option<u64>>,
    failures: AtomicUsize,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery of `sequence` until `heal` is called.
    pub fn poison(&self, sequence: u64) {
        *self.poison.lock() = Some(sequence);
    }

    pub fn heal(&self) {
        *self.poison.lock() = None;
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn deliveries(&self) -> Vec<(PartitionId, u64)> {
        self.deliveries.lock().clone()
    }

    /// Number of times `sequence` of `partition` was delivered.
    pub fn times_delivered(&self, partition: PartitionId, sequence: u64) -> usize {
        self.deliveries
            .lock()
            .iter()
            .filter(|&&d| d == (partition, sequence))
            .count()
    }
}

#[async_trait]
impl ChangeHandler for RecordingHandler {
    async fn handle(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        self.deliveries
            .lock()
            .push((event.partition_id, event.sequence));
        if *self.poison.lock() == Some(event.sequence) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(HandlerError::failed(format!(
                "poisoned sequence {}",
                event.sequence
            )));
        }
        Ok(())
    }
}

/// Wraps a handler and fails once, after the inner handler already
/// applied the event at `sequence`.
pub struct FailOnceAfter<H> {
    pub inner: H,
    sequence: u64,
    tripped: AtomicBool,
}

impl<H> FailOnceAfter<H> {
    pub fn new(inner: H, sequence: u64) -> Self {
        Self {
            inner,
            sequence,
            tripped: AtomicBool::new(false),
        }
    }

    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<H: ChangeHandler> ChangeHandler for FailOnceAfter<H> {
    async fn handle(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        self.inner.handle(event).await?;
        if event.sequence == self.sequence && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(HandlerError::failed("crashed before checkpoint"));
        }
        Ok(())
    }
}
