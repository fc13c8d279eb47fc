//! Document types for countfeed
//!
//! This module defines the canonical data structures stored in and read from
//! the document store. They are shared between the `storage`, `engine` and
//! `api` crates.

pub mod counter;
pub mod event;
pub mod lease;

// Re-export all types at module level
pub use counter::{CounterRecord, CounterValue};
pub use event::{ChangeEvent, ChangeFeedPage};
pub use lease::{LeaseState, PartitionLease};
