//! Change-feed consumption
//!
//! - `handler`: the `ChangeHandler` contract and `LoggingHandler`
//! - `projection`: `CounterProjection`, an idempotent read model
//! - `processor`: `ChangeFeedProcessor`, lease-coordinated polling

pub mod handler;
pub mod processor;
pub mod projection;

pub use handler::{ChangeHandler, HandlerError, LoggingHandler};
pub use processor::{ChangeFeedProcessor, ProcessorHandle, ProcessorOptions};
pub use projection::{CounterProjection, ProjectedCounter};
