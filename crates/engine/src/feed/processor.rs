//! Lease-coordinated change-feed processor
//!
//! One processor runs per consumer instance. It owns:
//! - a lease management task that renews held leases and claims free
//!   partitions every `renewal_interval`
//! - one polling task per held partition
//!
//! A partition task pulls events after the lease's checkpoint, hands them to
//! the handler in sequence order, and checkpoints only after the whole batch
//! succeeded. Any failure leaves the checkpoint where it was, so the batch is
//! pulled again on the next poll. No event is handed over once the lease is
//! past its expiry, and a renewal that fails for any reason stops the
//! partition task.
//!
//! The lease handle of a partition sits behind an async mutex shared by the
//! management task and the partition task; their conditional writes on the
//! lease never interleave.
//!
//! Shutdown cancels the partition tasks, waits for them, then releases every
//! held lease.

use countfeed_core::{DocumentStore, Error, OwnerId, PartitionId, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{ChangeHandler, HandlerError};
use crate::lease::{LeaseCoordinator, OwnedLease};

/// Timing and batching of a processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Lease renewal and acquisition period
    pub renewal_interval: Duration,
    /// Pause after a poll that did not fill a batch
    pub poll_interval: Duration,
    /// Maximum events pulled per poll
    pub batch_size: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            renewal_interval: Duration::from_secs(17),
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}

impl ProcessorOptions {
    /// Check these options against the lease expiry window
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the renewal interval is not shorter than
    /// `lease_expiry`, or if any value is zero.
    pub fn validate(&self, lease_expiry: Duration) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        if self.renewal_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(Error::Config("intervals must be positive".into()));
        }
        if self.renewal_interval >= lease_expiry {
            return Err(Error::Config(format!(
                "renewal interval {:?} must be shorter than lease expiry {:?}",
                self.renewal_interval, lease_expiry
            )));
        }
        Ok(())
    }
}

/// Change-feed consumer for one instance
pub struct ChangeFeedProcessor {
    documents: Arc<dyn DocumentStore>,
    coordinator: Arc<LeaseCoordinator>,
    handler: Arc<dyn ChangeHandler>,
    options: ProcessorOptions,
}

/// Running processor
pub struct ProcessorHandle {
    owner: OwnerId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    owned: Arc<Mutex<BTreeSet<PartitionId>>>,
}

impl ProcessorHandle {
    /// Owner id of the processor
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Partitions held as of the last lease management pass
    pub fn owned_partitions(&self) -> Vec<PartitionId> {
        self.owned.lock().iter().copied().collect()
    }

    /// Whether the processor has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the processor and wait until its leases are released
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(target: "countfeed::feed", owner = %self.owner, error = %e, "Processor task failed");
        }
    }
}

struct PartitionWorker {
    lease: Arc<AsyncMutex<OwnedLease>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ChangeFeedProcessor {
    /// Create a processor
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `options` do not fit the coordinator's
    /// lease expiry.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        coordinator: LeaseCoordinator,
        handler: Arc<dyn ChangeHandler>,
        options: ProcessorOptions,
    ) -> Result<Self> {
        options.validate(coordinator.lease_expiry())?;
        Ok(Self {
            documents,
            coordinator: Arc::new(coordinator),
            handler,
            options,
        })
    }

    /// Owner id this processor claims leases for
    pub fn owner(&self) -> &OwnerId {
        self.coordinator.owner()
    }

    /// Spawn the processor; it runs until `cancel` fires
    pub fn start(self, cancel: CancellationToken) -> ProcessorHandle {
        let owned = Arc::new(Mutex::new(BTreeSet::new()));
        let owner = self.owner().clone();
        let task = tokio::spawn(self.run(cancel.clone(), Arc::clone(&owned)));
        ProcessorHandle {
            owner,
            cancel,
            task,
            owned,
        }
    }

    async fn run(self, cancel: CancellationToken, owned: Arc<Mutex<BTreeSet<PartitionId>>>) {
        let mut workers = BTreeMap::new();
        let mut ticker = interval(self.options.renewal_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            target: "countfeed::feed",
            owner = %self.owner(),
            renewal_ms = self.options.renewal_interval.as_millis() as u64,
            poll_ms = self.options.poll_interval.as_millis() as u64,
            batch_size = self.options.batch_size,
            "Change feed processor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.manage_leases(&mut workers, &cancel).await;
                    *owned.lock() = workers.keys().copied().collect();
                }
            }
        }

        self.stop_workers(workers).await;
        owned.lock().clear();
        info!(target: "countfeed::feed", owner = %self.owner(), "Change feed processor stopped");
    }

    async fn manage_leases(
        &self,
        workers: &mut BTreeMap<PartitionId, PartitionWorker>,
        cancel: &CancellationToken,
    ) {
        workers.retain(|partition, worker| {
            let running = !worker.task.is_finished();
            if !running {
                debug!(target: "countfeed::feed", %partition, "Partition worker exited");
            }
            running
        });

        // A failed renewal of any kind ends processing of the partition; it is
        // claimed again on a later tick once the lease container answers.
        let mut lost = Vec::new();
        for (&partition, worker) in workers.iter() {
            let mut lease = worker.lease.lock().await;
            if let Err(e) = self.coordinator.renew(&mut lease).await {
                warn!(target: "countfeed::feed", %partition, error = %e, "Lease renewal failed");
                lost.push(partition);
            }
        }
        for partition in lost {
            if let Some(worker) = workers.remove(&partition) {
                warn!(target: "countfeed::feed", %partition, "Stopping partition after losing its lease");
                worker.cancel.cancel();
                if let Err(e) = worker.task.await {
                    error!(target: "countfeed::feed", %partition, error = %e, "Partition worker failed");
                }
            }
        }

        let free: Vec<PartitionId> = self
            .documents
            .partitions()
            .into_iter()
            .filter(|partition| !workers.contains_key(partition))
            .collect();
        if free.is_empty() {
            return;
        }
        for lease in self.coordinator.acquire_available(&free).await {
            let partition = lease.partition();
            workers.insert(partition, self.spawn_worker(lease, cancel));
        }
    }

    fn spawn_worker(&self, lease: OwnedLease, parent: &CancellationToken) -> PartitionWorker {
        let lease = Arc::new(AsyncMutex::new(lease));
        let cancel = parent.child_token();
        let worker = PartitionLoop {
            documents: Arc::clone(&self.documents),
            coordinator: Arc::clone(&self.coordinator),
            handler: Arc::clone(&self.handler),
            lease: Arc::clone(&lease),
            poll_interval: self.options.poll_interval,
            batch_size: self.options.batch_size,
        };
        let task = tokio::spawn(worker.run(cancel.clone()));
        PartitionWorker { lease, cancel, task }
    }

    async fn stop_workers(&self, workers: BTreeMap<PartitionId, PartitionWorker>) {
        for worker in workers.values() {
            worker.cancel.cancel();
        }
        for (partition, worker) in workers {
            if let Err(e) = worker.task.await {
                error!(target: "countfeed::feed", %partition, error = %e, "Partition worker failed");
            }
            let lease = worker.lease.lock().await.clone();
            if let Err(e) = self.coordinator.release(lease).await {
                warn!(target: "countfeed::feed", %partition, error = %e, "Lease release failed");
            }
        }
    }
}

#[derive(Debug, Error)]
enum BatchError {
    #[error(transparent)]
    Store(#[from] Error),

    #[error("handler failed at sequence {sequence}: {source}")]
    Handler {
        sequence: u64,
        #[source]
        source: HandlerError,
    },
}

struct PartitionLoop {
    documents: Arc<dyn DocumentStore>,
    coordinator: Arc<LeaseCoordinator>,
    handler: Arc<dyn ChangeHandler>,
    lease: Arc<AsyncMutex<OwnedLease>>,
    poll_interval: Duration,
    batch_size: usize,
}

impl PartitionLoop {
    async fn run(self, cancel: CancellationToken) {
        let partition = self.lease.lock().await.partition();
        debug!(target: "countfeed::feed", %partition, "Partition worker started");

        while !cancel.is_cancelled() {
            let delay = match self.poll_once(partition).await {
                Ok(count) if count >= self.batch_size => Duration::ZERO,
                Ok(_) => self.poll_interval,
                Err(BatchError::Store(Error::LeaseLost(_))) => {
                    warn!(target: "countfeed::feed", %partition, "Lease lost, partition worker stopping");
                    break;
                }
                Err(e) => {
                    warn!(
                        target: "countfeed::feed",
                        %partition,
                        error = %e,
                        "Batch failed, redelivering from last checkpoint"
                    );
                    self.poll_interval
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(target: "countfeed::feed", %partition, "Partition worker stopped");
    }

    async fn ensure_held(&self, partition: PartitionId) -> std::result::Result<(), BatchError> {
        if self.coordinator.is_live(&*self.lease.lock().await) {
            Ok(())
        } else {
            Err(Error::LeaseLost(partition).into())
        }
    }

    /// Process one batch; returns the number of events checkpointed
    async fn poll_once(&self, partition: PartitionId) -> std::result::Result<usize, BatchError> {
        self.ensure_held(partition).await?;
        let from = self.lease.lock().await.checkpoint();
        let page = self
            .documents
            .open_change_feed(partition, from, self.batch_size)
            .await?;
        if page.is_empty() {
            return Ok(0);
        }

        let count = page.events.len();
        self.handler.batch_started(partition, count);
        for event in &page.events {
            self.ensure_held(partition).await?;
            self.handler
                .handle(event)
                .await
                .map_err(|source| BatchError::Handler {
                    sequence: event.sequence,
                    source,
                })?;
        }

        let mut lease = self.lease.lock().await;
        self.coordinator
            .checkpoint(&mut lease, page.continuation)
            .await?;
        Ok(count)
    }
}
