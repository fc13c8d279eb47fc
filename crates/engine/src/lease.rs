//! Partition lease coordination
//!
//! A `LeaseCoordinator` acts on behalf of one consumer instance. It claims,
//! renews, checkpoints and releases partition leases through conditional
//! writes on the lease container; it keeps no shared state of its own.
//!
//! Ownership is decided by two rules:
//! - a claim only succeeds through `create` (no lease yet) or a `replace`
//!   conditioned on the etag under which the lease was seen free or expired
//! - an owner stops treating a lease as held once its own clock passes the
//!   expiry it last wrote
//!
//! Together with a renewal interval shorter than the expiry window this
//! gives at most one live owner per partition.

use chrono::{DateTime, Utc};
use countfeed_core::{
    CheckpointToken, Clock, Error, Etag, LeaseState, LeaseStore, OwnerId, PartitionId,
    PartitionLease, Result, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A lease this instance holds, with the etag of its last write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedLease {
    lease: PartitionLease,
    etag: Etag,
}

impl OwnedLease {
    /// Partition covered by the lease
    pub fn partition(&self) -> PartitionId {
        self.lease.partition_id
    }

    /// Persisted checkpoint
    pub fn checkpoint(&self) -> CheckpointToken {
        self.lease.checkpoint_token
    }

    /// Expiry written by the last renewal
    pub fn expiry(&self) -> DateTime<Utc> {
        self.lease.lease_expiry
    }

    /// Etag of the stored lease document
    pub fn etag(&self) -> Etag {
        self.etag
    }

    /// Lease document as last written
    pub fn lease(&self) -> &PartitionLease {
        &self.lease
    }
}

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The claim won
    Acquired(OwnedLease),
    /// Someone else holds the lease, or won the race for it
    Contended,
}

/// Lease record of a partition together with its derived state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseInfo {
    /// Partition
    pub partition: PartitionId,
    /// Stored lease, `None` if the partition was never claimed
    pub lease: Option<PartitionLease>,
    /// State at the time of listing
    pub state: LeaseState,
}

/// Claims and maintains partition leases for one owner
pub struct LeaseCoordinator {
    leases: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
    owner: OwnerId,
    lease_expiry: Duration,
}

impl LeaseCoordinator {
    /// Coordinator on the system clock
    pub fn new(leases: Arc<dyn LeaseStore>, owner: OwnerId, lease_expiry: Duration) -> Self {
        Self::with_clock(leases, owner, lease_expiry, Arc::new(SystemClock))
    }

    /// Coordinator reading time from `clock`
    pub fn with_clock(
        leases: Arc<dyn LeaseStore>,
        owner: OwnerId,
        lease_expiry: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            leases,
            clock,
            owner,
            lease_expiry,
        }
    }

    /// Owner this coordinator claims leases for
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Validity window written on every claim, renewal and checkpoint
    pub fn lease_expiry(&self) -> Duration {
        self.lease_expiry
    }

    /// Whether `lease` is still within the expiry it last wrote
    ///
    /// Once this turns false the partition may already belong to another
    /// instance, and nothing more may be processed under `lease`.
    pub fn is_live(&self, lease: &OwnedLease) -> bool {
        self.clock.now() < lease.expiry()
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.lease_expiry)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Try to claim `partition`
    ///
    /// A lease is claimable when it does not exist, was released, or has
    /// expired. A lease this owner already holds in the store is reclaimed
    /// as well, which covers a restart under the same owner id.
    ///
    /// # Errors
    ///
    /// Returns the store's error; losing the race is `Acquisition::Contended`.
    pub async fn acquire(&self, partition: PartitionId) -> Result<Acquisition> {
        let now = self.clock.now();
        let observed = self.leases.read(partition).await?;

        let (from, claim, write) = match observed {
            None => {
                let claim =
                    PartitionLease::claimed(partition, self.owner.clone(), self.expiry_from(now));
                let write = self.leases.create(claim.clone()).await;
                (LeaseState::Unowned, claim, write)
            }
            Some(current) => {
                let state = current.value.state(now);
                let ours = current.value.owner_id.as_ref() == Some(&self.owner);
                if !state.can_transition_to(LeaseState::Acquiring) && !ours {
                    debug!(
                        target: "countfeed::lease",
                        %partition,
                        %state,
                        holder = ?current.value.owner_id,
                        "Lease held by another instance"
                    );
                    return Ok(Acquisition::Contended);
                }
                debug!(
                    target: "countfeed::lease",
                    %partition,
                    from = %state,
                    to = %LeaseState::Acquiring,
                    "Claiming lease"
                );
                let claim = PartitionLease {
                    owner_id: Some(self.owner.clone()),
                    lease_expiry: self.expiry_from(now),
                    ..current.value
                };
                let write = self.leases.replace(claim.clone(), current.etag).await;
                (state, claim, write)
            }
        };

        match write {
            Ok(etag) => {
                info!(
                    target: "countfeed::lease",
                    %partition,
                    owner = %self.owner,
                    %from,
                    to = %LeaseState::Owned,
                    checkpoint = %claim.checkpoint_token,
                    "Lease acquired"
                );
                Ok(Acquisition::Acquired(OwnedLease { lease: claim, etag }))
            }
            Err(e) if e.is_write_conflict() => {
                debug!(target: "countfeed::lease", %partition, "Lost lease acquisition race");
                Ok(Acquisition::Contended)
            }
            Err(e) => Err(e),
        }
    }

    /// Claim every partition in `partitions` that is free, skipping failures
    pub async fn acquire_available(&self, partitions: &[PartitionId]) -> Vec<OwnedLease> {
        let mut acquired = Vec::new();
        for &partition in partitions {
            match self.acquire(partition).await {
                Ok(Acquisition::Acquired(lease)) => acquired.push(lease),
                Ok(Acquisition::Contended) => {}
                Err(e) => {
                    warn!(target: "countfeed::lease", %partition, error = %e, "Lease acquisition failed");
                }
            }
        }
        acquired
    }

    /// Extend the expiry of a held lease
    ///
    /// # Errors
    ///
    /// Returns `Error::LeaseLost` if the lease already expired by this
    /// owner's clock or was taken over; the caller must stop processing the
    /// partition. Other store errors leave `lease` untouched.
    pub async fn renew(&self, lease: &mut OwnedLease) -> Result<()> {
        let checkpoint = lease.checkpoint();
        self.write_held(lease, checkpoint).await?;
        debug!(
            target: "countfeed::lease",
            partition = %lease.partition(),
            expiry = %lease.expiry(),
            "Lease renewed"
        );
        Ok(())
    }

    /// Persist `token` as the partition's checkpoint and extend the expiry
    ///
    /// Checkpoints never move backwards; an older token only renews.
    ///
    /// # Errors
    ///
    /// Same as [`LeaseCoordinator::renew`]; on error nothing is persisted.
    pub async fn checkpoint(&self, lease: &mut OwnedLease, token: CheckpointToken) -> Result<()> {
        let token = token.max(lease.checkpoint());
        self.write_held(lease, token).await?;
        debug!(
            target: "countfeed::lease",
            partition = %lease.partition(),
            checkpoint = %token,
            "Checkpoint written"
        );
        Ok(())
    }

    async fn write_held(&self, lease: &mut OwnedLease, token: CheckpointToken) -> Result<()> {
        let now = self.clock.now();
        let partition = lease.partition();
        if now >= lease.expiry() {
            warn!(
                target: "countfeed::lease",
                %partition,
                state = %LeaseState::Expired,
                "Lease expired before renewal"
            );
            return Err(Error::LeaseLost(partition));
        }

        let next = PartitionLease {
            lease_expiry: self.expiry_from(now),
            checkpoint_token: token,
            ..lease.lease.clone()
        };
        match self.leases.replace(next.clone(), lease.etag).await {
            Ok(etag) => {
                lease.lease = next;
                lease.etag = etag;
                Ok(())
            }
            Err(Error::PreconditionFailed { .. }) => {
                warn!(target: "countfeed::lease", %partition, "Lease taken over by another instance");
                Err(Error::LeaseLost(partition))
            }
            Err(e) => Err(e),
        }
    }

    /// Give a lease up so another instance can claim it immediately
    ///
    /// # Errors
    ///
    /// Returns `Error::LeaseLost` if the lease was already taken over, or the
    /// store's error.
    pub async fn release(&self, lease: OwnedLease) -> Result<()> {
        let partition = lease.partition();
        let released = PartitionLease {
            owner_id: None,
            lease_expiry: self.clock.now(),
            ..lease.lease
        };
        match self.leases.replace(released, lease.etag).await {
            Ok(_) => {
                info!(
                    target: "countfeed::lease",
                    %partition,
                    owner = %self.owner,
                    to = %LeaseState::Released,
                    "Lease released"
                );
                Ok(())
            }
            Err(Error::PreconditionFailed { .. }) => Err(Error::LeaseLost(partition)),
            Err(e) => Err(e),
        }
    }

    /// Stored lease and current state of each partition
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list(&self, partitions: &[PartitionId]) -> Result<Vec<LeaseInfo>> {
        let now = self.clock.now();
        let mut infos = Vec::with_capacity(partitions.len());
        for &partition in partitions {
            let lease = self.leases.read(partition).await?.map(|v| v.into_value());
            let state = lease
                .as_ref()
                .map_or(LeaseState::Unowned, |lease| lease.state(now));
            infos.push(LeaseInfo {
                partition,
                lease,
                state,
            });
        }
        Ok(infos)
    }
}
