//! Core identifier types for countfeed
//!
//! This module defines the foundational identifiers:
//! - PartitionId: a change-feed partition of the document store
//! - OwnerId: a consumer instance competing for partition leases
//! - CheckpointToken: position in a partition's change stream

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a change-feed partition
///
/// Partition ids are handed out by the document store's partitioning scheme.
/// Components outside the store only compare, hash and print them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(u32);

impl PartitionId {
    /// Create a partition id from its raw index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index of this partition
    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier of a change-feed consumer instance
///
/// Two processors sharing an `OwnerId` are indistinguishable to the lease
/// store, so every running instance needs its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner id from an explicit name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Create a random owner id using UUID v4
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the owner id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Continuation marker for a partition's change stream
///
/// Holds the sequence position of the last successfully processed event.
/// `CheckpointToken::START` means nothing has been processed yet, so the
/// next read begins with the first committed event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct CheckpointToken(u64);

impl CheckpointToken {
    /// Beginning of the stream
    pub const START: CheckpointToken = CheckpointToken(0);

    /// Token marking `sequence` as processed
    pub const fn after(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Sequence position of the last processed event (0 if none)
    pub const fn last_processed(&self) -> u64 {
        self.0
    }

    /// Whether an event at `sequence` lies beyond this checkpoint
    pub const fn covers(&self, sequence: u64) -> bool {
        sequence <= self.0
    }
}

impl fmt::Display for CheckpointToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
