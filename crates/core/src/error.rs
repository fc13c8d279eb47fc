//! Error types for countfeed
//!
//! This module defines all error types surfaced by the store traits and the
//! components built on top of them. We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.
//!
//! A missing document is never an error here: reads return `Option`.

use crate::contract::Etag;
use crate::types::PartitionId;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for countfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for countfeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The store did not answer in time (transient)
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The store rejected the request because of load (transient)
    #[error("Request throttled, retry after {retry_after:?}")]
    Throttled {
        /// Delay suggested by the store before retrying
        retry_after: Duration,
    },

    /// The store cannot serve requests
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A create targeted a document that already exists, or a bounded
    /// optimistic retry loop gave up
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A conditional write observed a different etag
    #[error("Precondition failed: expected etag {expected}, found {actual:?}")]
    PreconditionFailed {
        /// Etag the writer expected
        expected: Etag,
        /// Etag currently stored (None if the document is gone)
        actual: Option<Etag>,
    },

    /// This instance no longer holds the lease for a partition
    #[error("Lease lost for partition {0}")]
    LeaseLost(PartitionId),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Throttled { .. })
    }

    /// Whether this error is the outcome of losing a conditional write.
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::PreconditionFailed { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
