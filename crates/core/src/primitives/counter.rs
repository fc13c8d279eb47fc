//! Counter document types
//!
//! A counter is one document in the counters container, addressed by
//! `(partition_key, id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A keyed counter document
///
/// - `id` and `partition_key` never change after creation
/// - `value` only grows under increments
/// - `updated_at` is refreshed by every write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecord {
    /// Document id, unique within its partition
    pub id: String,
    /// Logical partition key
    pub partition_key: String,
    /// Current counter value
    pub value: i64,
    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

impl CounterRecord {
    /// Create a record stamped with the current time
    pub fn new(partition_key: impl Into<String>, id: impl Into<String>, value: i64) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
            value,
            updated_at: Utc::now(),
        }
    }

    /// Copy of this record with `value` increased by one and a fresh timestamp
    pub fn incremented(&self) -> Self {
        Self {
            id: self.id.clone(),
            partition_key: self.partition_key.clone(),
            value: self.value.saturating_add(1),
            updated_at: Utc::now(),
        }
    }
}

/// Result of reading a counter
///
/// Absent counters read as `value = 0, exists = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterValue {
    /// Current value, 0 when the counter does not exist
    pub value: i64,
    /// Whether a record is stored
    pub exists: bool,
}

impl CounterValue {
    /// Value of a counter with no record
    pub const ABSENT: CounterValue = CounterValue {
        value: 0,
        exists: false,
    };

    /// Value of a stored counter
    pub const fn present(value: i64) -> Self {
        Self {
            value,
            exists: true,
        }
    }
}
