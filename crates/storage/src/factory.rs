//! Store construction from an endpoint string
//!
//! Only the in-process backend exists today. Its endpoint is `memory://`,
//! optionally followed by a label that ends up in log output.

use countfeed_core::{DocumentStore, Error, LeaseStore, Result};
use std::sync::Arc;
use tracing::info;

use crate::lease::MemoryLeaseStore;
use crate::sharded::MemoryStore;

const MEMORY_SCHEME: &str = "memory://";

/// Where and how to open the two containers
#[derive(Debug, Clone)]
pub struct StoreOptions<'a> {
    /// Backend endpoint, e.g. `memory://`
    pub endpoint: &'a str,
    /// Name of the counter container
    pub counters_container: &'a str,
    /// Name of the lease container
    pub lease_container: &'a str,
    /// Number of change-feed partitions of the counter container
    pub partition_count: u32,
}

/// Opened document and lease containers
#[derive(Clone)]
pub struct Stores {
    /// Counter container
    pub documents: Arc<dyn DocumentStore>,
    /// Lease container
    pub leases: Arc<dyn LeaseStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("partitions", &self.documents.partitions().len())
            .finish_non_exhaustive()
    }
}

/// Open the containers named in `options`
///
/// # Errors
///
/// Returns `Error::Config` for an endpoint with an unsupported scheme, or a
/// partition count of zero.
pub fn open_store(options: &StoreOptions<'_>) -> Result<Stores> {
    let Some(label) = options.endpoint.strip_prefix(MEMORY_SCHEME) else {
        return Err(Error::Config(format!(
            "unsupported store endpoint '{}', expected {MEMORY_SCHEME}",
            options.endpoint
        )));
    };
    if options.partition_count == 0 {
        return Err(Error::Config("partition_count must be at least 1".into()));
    }

    info!(
        target: "countfeed::store",
        label,
        counters = options.counters_container,
        leases = options.lease_container,
        partitions = options.partition_count,
        "Opening in-memory store"
    );

    Ok(Stores {
        documents: Arc::new(MemoryStore::new(
            options.counters_container,
            options.partition_count,
        )),
        leases: Arc::new(MemoryLeaseStore::new(options.lease_container)),
    })
}
