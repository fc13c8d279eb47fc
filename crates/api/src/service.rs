//! Wiring of stores, counter store and change-feed processor.

use axum::Router;
use countfeed_core::{OwnerId, Result};
use countfeed_engine::{
    seed_counters, ChangeFeedProcessor, ChangeHandler, CounterStore, CountfeedConfig,
    LeaseCoordinator, ProcessorHandle,
};
use countfeed_storage::{open_store, Stores};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::handlers::AppState;
use crate::routes::router;

/// One countfeed instance: its stores and the components built on them.
pub struct Service {
    config: CountfeedConfig,
    owner: OwnerId,
    stores: Stores,
    counters: CounterStore,
}

impl Service {
    /// Open the configured stores and build the counter store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration.
    pub fn new(config: CountfeedConfig, owner: OwnerId) -> Result<Self> {
        config.validate()?;
        let stores = open_store(&config.store_options())?;
        let counters =
            CounterStore::with_strategy(stores.documents.clone(), config.increment_strategy()?);
        info!(
            target: "countfeed::service",
            owner = %owner,
            increment_mode = %config.increment_mode,
            "Service configured"
        );
        Ok(Self {
            config,
            owner,
            stores,
            counters,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &CountfeedConfig {
        &self.config
    }

    /// Lease owner id of this instance.
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Counter store.
    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    /// Underlying containers.
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// HTTP router over this instance's counter store.
    pub fn router(&self) -> Router {
        router(AppState {
            counters: self.counters.clone(),
        })
    }

    /// Create the configured seed counters; returns how many were created.
    pub async fn seed(&self) -> usize {
        seed_counters(&self.counters, self.config.seed_counters.as_slice()).await
    }

    /// Start consuming the change feed with `handler` until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the processor timings are invalid.
    pub fn start_feed(
        &self,
        handler: Arc<dyn ChangeHandler>,
        cancel: CancellationToken,
    ) -> Result<ProcessorHandle> {
        let coordinator = LeaseCoordinator::new(
            self.stores.leases.clone(),
            self.owner.clone(),
            self.config.lease_expiry(),
        );
        let processor = ChangeFeedProcessor::new(
            self.stores.documents.clone(),
            coordinator,
            handler,
            self.config.processor_options(),
        )?;
        Ok(processor.start(cancel))
    }
}
