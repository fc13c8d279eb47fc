//! In-memory lease container
//!
//! One `Versioned<PartitionLease>` per partition in a DashMap. `create` and
//! `replace` run under the entry's shard lock, which makes them the atomic
//! conditional writes lease coordination relies on.

use async_trait::async_trait;
use countfeed_core::{Error, Etag, LeaseStore, PartitionId, PartitionLease, Result, Versioned};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

use crate::testing::FaultInjector;

/// In-memory `LeaseStore`
pub struct MemoryLeaseStore {
    name: String,
    leases: DashMap<PartitionId, Versioned<PartitionLease>>,
    faults: Arc<FaultInjector>,
}

impl MemoryLeaseStore {
    /// Create an empty lease container
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_faults(name, Arc::new(FaultInjector::new()))
    }

    /// Create a lease container whose operations consult `faults` first
    pub fn with_faults(name: impl Into<String>, faults: Arc<FaultInjector>) -> Self {
        Self {
            name: name.into(),
            leases: DashMap::new(),
            faults,
        }
    }

    /// Container name, used in log output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fault injector shared by this container
    pub fn faults(&self) -> &Arc<FaultInjector> {
        &self.faults
    }

    /// Copy of every stored lease, ordered by partition
    pub fn snapshot(&self) -> Vec<Versioned<PartitionLease>> {
        let mut leases: Vec<_> = self.leases.iter().map(|e| e.value().clone()).collect();
        leases.sort_by_key(|lease| lease.value.partition_id);
        leases
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn read(&self, partition: PartitionId) -> Result<Option<Versioned<PartitionLease>>> {
        self.faults.check_read()?;
        Ok(self.leases.get(&partition).map(|lease| lease.value().clone()))
    }

    async fn create(&self, lease: PartitionLease) -> Result<Etag> {
        self.faults.check_write()?;
        match self.leases.entry(lease.partition_id) {
            Entry::Occupied(_) => Err(Error::Conflict(format!(
                "lease for partition {} already exists",
                lease.partition_id
            ))),
            Entry::Vacant(slot) => {
                trace!(target: "countfeed::lease_store", container = %self.name, partition = %lease.partition_id, "create");
                slot.insert(Versioned::new(lease, Etag::INITIAL));
                Ok(Etag::INITIAL)
            }
        }
    }

    async fn replace(&self, lease: PartitionLease, if_match: Etag) -> Result<Etag> {
        self.faults.check_write()?;
        match self.leases.entry(lease.partition_id) {
            Entry::Vacant(_) => Err(Error::PreconditionFailed {
                expected: if_match,
                actual: None,
            }),
            Entry::Occupied(mut slot) => {
                let current = slot.get().etag;
                if current != if_match {
                    return Err(Error::PreconditionFailed {
                        expected: if_match,
                        actual: Some(current),
                    });
                }
                let etag = current.next();
                trace!(target: "countfeed::lease_store", container = %self.name, partition = %lease.partition_id, %etag, "replace");
                slot.insert(Versioned::new(lease, etag));
                Ok(etag)
            }
        }
    }
}
