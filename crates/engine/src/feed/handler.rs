//! Change handler contract and the logging handler
//!
//! Handlers see every event at least once. A batch whose handler fails is
//! delivered again from the same checkpoint, so events a handler already
//! applied can come back.

use async_trait::async_trait;
use countfeed_core::{ChangeEvent, PartitionId};
use thiserror::Error;
use tracing::info;

/// Failure reported by a change handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler could not apply the event; the batch is redelivered
    #[error("handler failed: {0}")]
    Failed(String),

    /// A store call made by the handler failed
    #[error(transparent)]
    Store(#[from] countfeed_core::Error),
}

impl HandlerError {
    /// Build a `Failed` error from any message
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Consumer of change-feed events
///
/// Implementations must be idempotent: applying an event twice has to leave
/// the same effect as applying it once.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Called once per non-empty batch before its events are handled
    fn batch_started(&self, _partition: PartitionId, _count: usize) {}

    /// Apply one event
    async fn handle(&self, event: &ChangeEvent) -> Result<(), HandlerError>;
}

/// Handler that writes every change to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl ChangeHandler for LoggingHandler {
    fn batch_started(&self, partition: PartitionId, count: usize) {
        info!(target: "countfeed::feed", %partition, count, "Processing {} counter changes", count);
    }

    async fn handle(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        let record = &event.record;
        info!(
            target: "countfeed::feed",
            name = %record.partition_key,
            id = %record.id,
            value = record.value,
            updated_at = %record.updated_at,
            sequence = event.sequence,
            "Counter changed"
        );
        Ok(())
    }
}
