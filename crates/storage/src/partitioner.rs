//! Partition key to physical partition mapping
//!
//! Partition keys are hashed with xxh3 and reduced modulo the partition
//! count, so counters spread across partitions by name instead of being
//! pinned to a single one.

use countfeed_core::PartitionId;
use xxhash_rust::xxh3::xxh3_64;

/// Stable hash partitioner over a fixed number of partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPartitioner {
    partition_count: u32,
}

impl HashPartitioner {
    /// Create a partitioner; a count of zero is raised to one
    pub fn new(partition_count: u32) -> Self {
        Self {
            partition_count: partition_count.max(1),
        }
    }

    /// Number of partitions
    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// All partitions in ascending order
    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> {
        (0..self.partition_count).map(PartitionId::new)
    }

    /// Partition that owns `partition_key`
    pub fn partition_for(&self, partition_key: &str) -> PartitionId {
        let hash = xxh3_64(partition_key.as_bytes());
        PartitionId::new((hash % u64::from(self.partition_count)) as u32)
    }
}
