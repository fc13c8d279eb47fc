//! Store traits
//!
//! This module defines the `DocumentStore` and `LeaseStore` traits. The
//! counter store, lease coordinator and change-feed processor only ever talk
//! to these traits, which lets a managed database replace the in-process
//! backend without touching them.
//!
//! Thread safety: all methods must be safe to call concurrently from multiple
//! tasks (requires Send + Sync).

use async_trait::async_trait;

use crate::contract::{Etag, Versioned};
use crate::error::Result;
use crate::primitives::{ChangeFeedPage, CounterRecord, PartitionLease};
use crate::types::{CheckpointToken, PartitionId};

/// Partitioned document store holding counter records
///
/// Every successful `create`, `upsert` or `replace` appends exactly one
/// event to the change feed of the record's partition, in commit order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a record
    ///
    /// Returns `Ok(None)` if no record exists; a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot serve the read.
    async fn read(&self, partition_key: &str, id: &str) -> Result<Option<Versioned<CounterRecord>>>;

    /// Create a record that must not exist yet
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if a record with the same
    /// `(partition_key, id)` already exists.
    async fn create(&self, record: CounterRecord) -> Result<Etag>;

    /// Create or replace a record unconditionally
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot apply the write.
    async fn upsert(&self, record: CounterRecord) -> Result<Etag>;

    /// Replace a record only if its etag still equals `if_match`
    ///
    /// # Errors
    ///
    /// Returns `Error::PreconditionFailed` if the stored etag differs or the
    /// record no longer exists.
    async fn replace(&self, record: CounterRecord, if_match: Etag) -> Result<Etag>;

    /// Change-feed partitions of this store, in ascending order
    fn partitions(&self) -> Vec<PartitionId>;

    /// Partition that owns `partition_key`
    fn partition_for(&self, partition_key: &str) -> PartitionId;

    /// Pull up to `max_items` events committed after `from`
    ///
    /// An empty page is a normal outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unknown partition, or an error
    /// if the store cannot serve the pull.
    async fn open_change_feed(
        &self,
        partition: PartitionId,
        from: CheckpointToken,
        max_items: usize,
    ) -> Result<ChangeFeedPage>;
}

/// Container of partition leases, one document per partition
///
/// Mutual exclusion between consumer instances rests entirely on the
/// conditional semantics of `create` and `replace`.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Read the lease for a partition, `Ok(None)` if none was ever written
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot serve the read.
    async fn read(&self, partition: PartitionId) -> Result<Option<Versioned<PartitionLease>>>;

    /// Create the first lease for a partition
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if a lease for the partition already exists.
    async fn create(&self, lease: PartitionLease) -> Result<Etag>;

    /// Replace a lease only if its etag still equals `if_match`
    ///
    /// # Errors
    ///
    /// Returns `Error::PreconditionFailed` if another writer got there first.
    async fn replace(&self, lease: PartitionLease, if_match: Etag) -> Result<Etag>;
}
