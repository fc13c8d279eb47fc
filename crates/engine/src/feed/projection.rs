//! Materialized view of the latest counter values
//!
//! `CounterProjection` keeps, per counter, the value of the newest event it
//! has applied. Events that are not newer than what it holds are dropped,
//! which makes redelivered batches harmless.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use countfeed_core::{ChangeEvent, PartitionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::handler::{ChangeHandler, HandlerError};

/// Latest projected state of one counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedCounter {
    /// Value carried by the newest applied event
    pub value: i64,
    /// Write time of that event
    pub updated_at: DateTime<Utc>,
    /// Partition the counter lives in
    pub partition: PartitionId,
    /// Sequence of the newest applied event
    pub sequence: u64,
}

/// Idempotent projection handler
#[derive(Debug, Default)]
pub struct CounterProjection {
    counters: DashMap<(String, String), ProjectedCounter>,
    applied: AtomicU64,
    skipped: AtomicU64,
}

impl CounterProjection {
    /// Empty projection
    pub fn new() -> Self {
        Self::default()
    }

    /// Projected value of a counter
    pub fn value(&self, partition_key: &str, id: &str) -> Option<i64> {
        self.get(partition_key, id).map(|c| c.value)
    }

    /// Projected state of a counter
    pub fn get(&self, partition_key: &str, id: &str) -> Option<ProjectedCounter> {
        self.counters
            .get(&(partition_key.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of counters seen
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no event was applied yet
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Events that changed the projection
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Events dropped as already applied
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn apply(&self, event: &ChangeEvent) {
        let record = &event.record;
        let projected = ProjectedCounter {
            value: record.value,
            updated_at: record.updated_at,
            partition: event.partition_id,
            sequence: event.sequence,
        };
        let key = (record.partition_key.clone(), record.id.clone());
        let fresh = match self.counters.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(projected);
                true
            }
            Entry::Occupied(mut slot) if slot.get().sequence < event.sequence => {
                slot.insert(projected);
                true
            }
            Entry::Occupied(_) => false,
        };
        let counter = if fresh { &self.applied } else { &self.skipped };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl ChangeHandler for CounterProjection {
    async fn handle(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        self.apply(event);
        Ok(())
    }
}
