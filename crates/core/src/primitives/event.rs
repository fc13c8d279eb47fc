//! Change feed types
//!
//! The change feed is an append-only, per-partition ordered stream of
//! committed writes. Ordering holds inside one partition only.

use super::counter::CounterRecord;
use crate::types::{CheckpointToken, PartitionId};
use serde::{Deserialize, Serialize};

/// A committed write as delivered by the change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Record as it was committed
    pub record: CounterRecord,
    /// Partition whose stream carried the write
    pub partition_id: PartitionId,
    /// Commit position within the partition, starting at 1
    pub sequence: u64,
}

impl ChangeEvent {
    /// Checkpoint that marks this event as processed
    pub fn checkpoint(&self) -> CheckpointToken {
        CheckpointToken::after(self.sequence)
    }
}

/// One pull from a partition's change feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFeedPage {
    /// Events after the requested checkpoint, in sequence order
    pub events: Vec<ChangeEvent>,
    /// Checkpoint covering the last returned event, or the requested
    /// checkpoint when the page is empty
    pub continuation: CheckpointToken,
}

impl ChangeFeedPage {
    /// A page with no new events
    pub fn empty(from: CheckpointToken) -> Self {
        Self {
            events: Vec::new(),
            continuation: from,
        }
    }

    /// Whether the pull found nothing new
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
