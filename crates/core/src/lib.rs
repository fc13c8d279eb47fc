//! Core types and traits for countfeed
//!
//! This crate defines the foundational types used throughout the system:
//! - CounterRecord: the keyed counter document
//! - PartitionLease: ownership and checkpoint record for one change-feed partition
//! - ChangeEvent: a committed write as seen on the change feed
//! - Etag / Versioned<T>: store-assigned document versions for conditional writes
//! - Error: error type hierarchy
//! - Traits: DocumentStore and LeaseStore abstractions
//! - Clock: injectable wall clock for lease expiry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod contract;
pub mod error;
pub mod primitives;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::{Etag, Versioned};
pub use error::{Error, Result};
pub use primitives::{
    ChangeEvent, ChangeFeedPage, CounterRecord, CounterValue, LeaseState, PartitionLease,
};
pub use traits::{DocumentStore, LeaseStore};
pub use types::{CheckpointToken, OwnerId, PartitionId};
