//! Pipeline Integration Tests
//!
//! End-to-end: increments through the counter store or HTTP, consumed by
//! one or more change-feed processors sharing a lease container.

#[path = "../common/mod.rs"]
mod common;

mod end_to_end;
mod takeover;
