//! countfeed - partitioned counters with a lease-coordinated change feed
//!
//! countfeed keeps keyed counters in a partitioned document store and
//! reacts to every committed increment through a change-feed pipeline.
//! Consumer instances split the store's partitions between them with
//! time-bounded leases, so each partition is processed by one instance at a
//! time, and progress survives restarts through per-partition checkpoints.
//!
//! # Quick Start
//!
//! ```ignore
//! use countfeed::{CountfeedConfig, OwnerId, Service, CounterProjection};
//!
//! let service = Service::new(CountfeedConfig::default(), OwnerId::random())?;
//! service.seed().await;
//!
//! let projection = Arc::new(CounterProjection::new());
//! let processor = service.start_feed(projection.clone(), CancellationToken::new())?;
//!
//! service.counters().increment("visits", "visits").await?;
//! ```
//!
//! # Architecture
//!
//! - `countfeed-core`: document types, errors and the store traits
//! - `countfeed-storage`: the in-memory backend
//! - `countfeed-engine`: counter store, lease coordination, feed processing
//! - `countfeed-api`: HTTP routes and instance wiring

pub use countfeed_api::{router, ApiError, AppState, CliArgs, CounterStatus, Service};
pub use countfeed_core::{
    ChangeEvent, CheckpointToken, Clock, CounterRecord, CounterValue, DocumentStore, Error, Etag,
    LeaseState, LeaseStore, ManualClock, OwnerId, PartitionId, PartitionLease, Result,
    SystemClock, Versioned,
};
pub use countfeed_engine::{
    Acquisition, ChangeFeedProcessor, ChangeHandler, CounterProjection, CounterStore,
    CountfeedConfig, HandlerError, IncrementStrategy, LeaseCoordinator, LoggingHandler,
    OwnedLease, ProcessorHandle, ProcessorOptions, RetryConfig,
};
pub use countfeed_storage::{open_store, MemoryLeaseStore, MemoryStore, StoreOptions, Stores};
