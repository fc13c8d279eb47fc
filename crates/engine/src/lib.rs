//! Counter and change-feed engine for countfeed
//!
//! This crate builds the service behaviour on top of the store traits:
//! - CounterStore: read/increment contract over counter documents
//! - LeaseCoordinator: partition ownership and checkpoints
//! - ChangeFeedProcessor: lease-coordinated change-feed consumption
//! - Handlers: LoggingHandler and the CounterProjection read model
//! - CountfeedConfig: `countfeed.toml` loading and validation
//! - Seeding of well-known counters at startup
//!
//! Components receive their stores as constructor arguments; nothing in
//! this crate is global.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod counter;
pub mod feed;
pub mod lease;
pub mod retry;
pub mod seeder;

pub use config::{CountfeedConfig, CONFIG_FILE_NAME};
pub use counter::{CounterStore, IncrementStrategy};
pub use feed::{
    ChangeFeedProcessor, ChangeHandler, CounterProjection, HandlerError, LoggingHandler,
    ProcessorHandle, ProcessorOptions, ProjectedCounter,
};
pub use lease::{Acquisition, LeaseCoordinator, LeaseInfo, OwnedLease};
pub use retry::RetryConfig;
pub use seeder::seed_counters;
