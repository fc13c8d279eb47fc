//! Partition-sharded in-memory document store
//!
//! Each physical partition is one `Shard` holding its documents and the
//! append-only change log of the writes committed to it.
//!
//! # Design
//!
//! - One `RwLock<Shard>` per partition: reads share the lock, writes hold
//!   it exclusively for the document update plus the log append
//! - FxHashMap: O(1) lookups, fast non-crypto hash
//! - Partition chosen by hashing the partition key (see `partitioner`)
//!
//! Because a write and its change event are applied under the same lock,
//! the log order of a partition is exactly its commit order. Writes to
//! different partitions never contend.

use async_trait::async_trait;
use countfeed_core::{
    ChangeEvent, ChangeFeedPage, CheckpointToken, CounterRecord, DocumentStore, Error, Etag,
    PartitionId, Result, Versioned,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

use crate::partitioner::HashPartitioner;
use crate::testing::FaultInjector;

/// `(partition_key, id)` address of a document
type DocKey = (String, String);

/// One physical partition: its documents and its change log
#[derive(Debug, Default)]
pub struct Shard {
    /// Latest version of every document in this partition
    pub(crate) data: FxHashMap<DocKey, Versioned<CounterRecord>>,
    /// Committed writes in commit order; `log[i].sequence == i + 1`
    pub(crate) log: Vec<ChangeEvent>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in this shard
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if shard holds no documents
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sequence position of the newest committed write (0 if none)
    pub fn head(&self) -> u64 {
        self.log.len() as u64
    }

    /// Store `record` under the next etag and append its change event
    fn commit(&mut self, partition_id: PartitionId, record: CounterRecord, etag: Etag) -> Etag {
        let key = (record.partition_key.clone(), record.id.clone());
        let sequence = self.head() + 1;
        self.log.push(ChangeEvent {
            record: record.clone(),
            partition_id,
            sequence,
        });
        self.data.insert(key, Versioned::new(record, etag));
        etag
    }

    /// Events after `from`, at most `max_items`
    fn read_after(&self, from: CheckpointToken, max_items: usize) -> Vec<ChangeEvent> {
        let start = (from.last_processed() as usize).min(self.log.len());
        self.log[start..]
            .iter()
            .take(max_items)
            .cloned()
            .collect()
    }
}

/// In-memory `DocumentStore`
///
/// # Example
///
/// ```ignore
/// use countfeed_storage::MemoryStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new("counters", 4));
/// let etag = store.upsert(CounterRecord::new("c", "c", 1)).await?;
/// ```
pub struct MemoryStore {
    name: String,
    shards: Vec<RwLock<Shard>>,
    partitioner: HashPartitioner,
    faults: Arc<FaultInjector>,
}

impl MemoryStore {
    /// Create a store with `partition_count` partitions (at least one)
    pub fn new(name: impl Into<String>, partition_count: u32) -> Self {
        Self::with_faults(name, partition_count, Arc::new(FaultInjector::new()))
    }

    /// Create a store whose operations consult `faults` first
    pub fn with_faults(
        name: impl Into<String>,
        partition_count: u32,
        faults: Arc<FaultInjector>,
    ) -> Self {
        let partitioner = HashPartitioner::new(partition_count);
        let shards = (0..partitioner.partition_count())
            .map(|_| RwLock::new(Shard::new()))
            .collect();
        Self {
            name: name.into(),
            shards,
            partitioner,
            faults,
        }
    }

    /// Container name, used in log output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fault injector shared by this store
    pub fn faults(&self) -> &Arc<FaultInjector> {
        &self.faults
    }

    /// Total number of documents across all partitions
    pub fn total_documents(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Sequence position of the newest write in `partition`
    pub fn head(&self, partition: PartitionId) -> Option<u64> {
        self.shard(partition).map(|shard| shard.read().head())
    }

    fn shard(&self, partition: PartitionId) -> Option<&RwLock<Shard>> {
        self.shards.get(partition.index() as usize)
    }

    fn shard_for(&self, partition_key: &str) -> (PartitionId, &RwLock<Shard>) {
        let partition = self.partitioner.partition_for(partition_key);
        // partition_for never returns an index outside 0..partition_count
        (partition, &self.shards[partition.index() as usize])
    }

    fn validate(record: &CounterRecord) -> Result<()> {
        if record.id.is_empty() {
            return Err(Error::InvalidInput("document id must not be empty".into()));
        }
        if record.partition_key.is_empty() {
            return Err(Error::InvalidInput("partition key must not be empty".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, partition_key: &str, id: &str) -> Result<Option<Versioned<CounterRecord>>> {
        self.faults.check_read()?;
        let (_, shard) = self.shard_for(partition_key);
        let key = (partition_key.to_string(), id.to_string());
        Ok(shard.read().data.get(&key).cloned())
    }

    async fn create(&self, record: CounterRecord) -> Result<Etag> {
        Self::validate(&record)?;
        self.faults.check_write()?;
        let (partition, shard) = self.shard_for(&record.partition_key);
        let mut shard = shard.write();
        let key = (record.partition_key.clone(), record.id.clone());
        if shard.data.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "document '{}' already exists in partition key '{}'",
                record.id, record.partition_key
            )));
        }
        trace!(target: "countfeed::store", container = %self.name, id = %record.id, %partition, "create");
        Ok(shard.commit(partition, record, Etag::INITIAL))
    }

    async fn upsert(&self, record: CounterRecord) -> Result<Etag> {
        Self::validate(&record)?;
        self.faults.check_write()?;
        let (partition, shard) = self.shard_for(&record.partition_key);
        let mut shard = shard.write();
        let key = (record.partition_key.clone(), record.id.clone());
        let etag = shard
            .data
            .get(&key)
            .map(|current| current.etag.next())
            .unwrap_or(Etag::INITIAL);
        trace!(target: "countfeed::store", container = %self.name, id = %record.id, %partition, %etag, "upsert");
        Ok(shard.commit(partition, record, etag))
    }

    async fn replace(&self, record: CounterRecord, if_match: Etag) -> Result<Etag> {
        Self::validate(&record)?;
        self.faults.check_write()?;
        let (partition, shard) = self.shard_for(&record.partition_key);
        let mut shard = shard.write();
        let key = (record.partition_key.clone(), record.id.clone());
        let current = shard.data.get(&key).map(|doc| doc.etag);
        if current != Some(if_match) {
            return Err(Error::PreconditionFailed {
                expected: if_match,
                actual: current,
            });
        }
        trace!(target: "countfeed::store", container = %self.name, id = %record.id, %partition, "replace");
        Ok(shard.commit(partition, record, if_match.next()))
    }

    fn partitions(&self) -> Vec<PartitionId> {
        self.partitioner.partitions().collect()
    }

    fn partition_for(&self, partition_key: &str) -> PartitionId {
        self.partitioner.partition_for(partition_key)
    }

    async fn open_change_feed(
        &self,
        partition: PartitionId,
        from: CheckpointToken,
        max_items: usize,
    ) -> Result<ChangeFeedPage> {
        let shard = self
            .shard(partition)
            .ok_or_else(|| Error::InvalidInput(format!("unknown partition {}", partition)))?;
        self.faults.check_feed()?;
        let events = shard.read().read_after(from, max_items);
        let continuation = events.last().map(ChangeEvent::checkpoint).unwrap_or(from);
        Ok(ChangeFeedPage {
            events,
            continuation,
        })
    }
}
