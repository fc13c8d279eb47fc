//! Shared test utilities for the workspace integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use countfeed::{
    ChangeFeedProcessor, ChangeHandler, LeaseCoordinator, MemoryLeaseStore, MemoryStore, OwnerId,
    ProcessorHandle, ProcessorOptions,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const LEASE_EXPIRY: Duration = Duration::from_millis(250);
pub const WAIT: Duration = Duration::from_secs(10);

/// One shared deployment: a counters container and a lease container.
pub struct Deployment {
    pub documents: Arc<MemoryStore>,
    pub leases: Arc<MemoryLeaseStore>,
}

impl Deployment {
    pub fn new(partition_count: u32) -> Self {
        Self {
            documents: Arc::new(MemoryStore::new("counters", partition_count)),
            leases: Arc::new(MemoryLeaseStore::new("leases")),
        }
    }

    pub fn coordinator(&self, owner: &str) -> LeaseCoordinator {
        LeaseCoordinator::new(self.leases.clone(), OwnerId::new(owner), LEASE_EXPIRY)
    }

    pub fn start(&self, owner: &str, handler: Arc<dyn ChangeHandler>) -> ProcessorHandle {
        let options = ProcessorOptions {
            renewal_interval: Duration::from_millis(25),
            poll_interval: Duration::from_millis(5),
            batch_size: 8,
        };
        ChangeFeedProcessor::new(self.documents.clone(), self.coordinator(owner), handler, options)
            .expect("valid processor options")
            .start(CancellationToken::new())
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
