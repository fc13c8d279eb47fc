//! Storage layer for countfeed
//!
//! This crate implements the in-process backend behind the store traits:
//! - MemoryStore: partition-sharded counter documents with per-partition
//!   change logs
//! - MemoryLeaseStore: DashMap of partition leases with conditional writes
//! - HashPartitioner: xxh3-based partition key mapping
//! - open_store: endpoint-driven construction of both containers
//! - testing: fault injection for resilience tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod factory;
pub mod lease;
pub mod partitioner;
pub mod sharded;
pub mod testing;

pub use factory::{open_store, StoreOptions, Stores};
pub use lease::MemoryLeaseStore;
pub use partitioner::HashPartitioner;
pub use sharded::{MemoryStore, Shard};
