//! Counter read/increment contract
//!
//! `CounterStore` is the only component that mutates counter documents.
//! Counters are addressed by `(partition_key, id)`; the HTTP surface uses
//! the counter name for both.
//!
//! ## Increment strategies
//!
//! - `LastWriterWins`: read, add one, upsert. Two concurrent increments of
//!   the same counter may both read `n` and both write `n + 1`.
//! - `Optimistic`: the write is conditional on the etag that was read; a
//!   lost race re-runs the read-modify-write with exponential backoff.
//!
//! Either way every successful increment commits exactly one write, and so
//! exactly one change-feed event.

use countfeed_core::{CounterRecord, CounterValue, DocumentStore, Error, Result};
use std::sync::Arc;
use tracing::debug;

use crate::retry::RetryConfig;

/// How `CounterStore::increment` writes back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IncrementStrategy {
    /// Unconditional upsert of the value read plus one
    #[default]
    LastWriterWins,
    /// Etag-conditional write retried on conflict
    Optimistic(RetryConfig),
}

/// Read/increment facade over the counters container
#[derive(Clone)]
pub struct CounterStore {
    store: Arc<dyn DocumentStore>,
    strategy: IncrementStrategy,
}

impl CounterStore {
    /// Counter store using `IncrementStrategy::LastWriterWins`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_strategy(store, IncrementStrategy::default())
    }

    /// Counter store using `strategy` for increments
    pub fn with_strategy(store: Arc<dyn DocumentStore>, strategy: IncrementStrategy) -> Self {
        Self { store, strategy }
    }

    /// Active increment strategy
    pub fn strategy(&self) -> &IncrementStrategy {
        &self.strategy
    }

    /// Underlying document store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Current value of a counter
    ///
    /// A missing counter reads as `CounterValue::ABSENT`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty key, or the store's error.
    pub async fn get(&self, partition_key: &str, id: &str) -> Result<CounterValue> {
        validate_key(partition_key, id)?;
        Ok(match self.store.read(partition_key, id).await? {
            Some(current) => CounterValue::present(current.value.value),
            None => CounterValue::ABSENT,
        })
    }

    /// Full record of a counter, `None` if it was never written
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty key, or the store's error.
    pub async fn status(&self, partition_key: &str, id: &str) -> Result<Option<CounterRecord>> {
        validate_key(partition_key, id)?;
        Ok(self
            .store
            .read(partition_key, id)
            .await?
            .map(|current| current.into_value()))
    }

    /// Add one to a counter and return the value written
    ///
    /// Missing counters are created with value 1.
    ///
    /// # Errors
    ///
    /// Store errors are returned unchanged; a failed write after a
    /// successful read leaves the counter as it was. Under
    /// `IncrementStrategy::Optimistic`, `Error::Conflict` is returned once
    /// the retry budget is spent.
    pub async fn increment(&self, partition_key: &str, id: &str) -> Result<i64> {
        validate_key(partition_key, id)?;
        let value = match &self.strategy {
            IncrementStrategy::LastWriterWins => self.increment_unguarded(partition_key, id).await?,
            IncrementStrategy::Optimistic(retry) => {
                self.increment_conditional(partition_key, id, retry).await?
            }
        };
        debug!(target: "countfeed::counter", partition_key, id, value, "Counter incremented");
        Ok(value)
    }

    /// Create a counter with value 0 unless it already exists
    ///
    /// Returns `true` if this call created it.
    ///
    /// # Errors
    ///
    /// Returns the store's error for anything but a create conflict.
    pub async fn seed(&self, partition_key: &str, id: &str) -> Result<bool> {
        validate_key(partition_key, id)?;
        if self.store.read(partition_key, id).await?.is_some() {
            return Ok(false);
        }
        match self.store.create(CounterRecord::new(partition_key, id, 0)).await {
            Ok(_) => Ok(true),
            Err(Error::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn increment_unguarded(&self, partition_key: &str, id: &str) -> Result<i64> {
        let next = match self.store.read(partition_key, id).await? {
            Some(current) => current.value.incremented(),
            None => CounterRecord::new(partition_key, id, 1),
        };
        let value = next.value;
        self.store.upsert(next).await?;
        Ok(value)
    }

    async fn increment_conditional(
        &self,
        partition_key: &str,
        id: &str,
        retry: &RetryConfig,
    ) -> Result<i64> {
        let mut attempt = 0;
        loop {
            let outcome = match self.store.read(partition_key, id).await? {
                Some(current) => {
                    let next = current.value.incremented();
                    let value = next.value;
                    self.store
                        .replace(next, current.etag)
                        .await
                        .map(|_| value)
                }
                None => self
                    .store
                    .create(CounterRecord::new(partition_key, id, 1))
                    .await
                    .map(|_| 1),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_write_conflict() && retry.should_retry(attempt) => {
                    let delay = retry.backoff(attempt);
                    debug!(
                        target: "countfeed::counter",
                        partition_key,
                        id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Increment lost a write race, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_write_conflict() => {
                    return Err(Error::Conflict(format!(
                        "increment of '{}' gave up after {} attempts",
                        id,
                        attempt + 1
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn validate_key(partition_key: &str, id: &str) -> Result<()> {
    if partition_key.is_empty() || id.is_empty() {
        return Err(Error::InvalidInput(
            "counter partition key and id must not be empty".into(),
        ));
    }
    Ok(())
}
