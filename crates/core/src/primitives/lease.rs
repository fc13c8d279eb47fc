//! Partition lease types
//!
//! A lease is a time-bounded claim by one consumer instance over one
//! change-feed partition. Leases live in their own container, one document
//! per partition, and carry the partition's checkpoint.
//!
//! ## State machine (per instance view)
//!
//! ```text
//! Unowned -> Acquiring -> Owned -> Expired  -> Unowned
//!                           |  \-> Released -> Unowned
//!                           \---- (renewal keeps it Owned)
//! ```
//!
//! `Owned`, `Expired` and `Released` are read off a stored record and a
//! clock; a partition without a record is `Unowned`. `Acquiring` is the
//! state an instance is in while its conditional claim is in flight.

use crate::types::{CheckpointToken, OwnerId, PartitionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ownership state of a partition lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaseState {
    /// No instance holds the partition
    Unowned,
    /// An instance is attempting the conditional write that claims it
    Acquiring,
    /// Held and not yet past its expiry
    Owned,
    /// Held, but the holder missed its renewal; reclaimable
    Expired,
    /// Freed by its holder during shutdown
    Released,
}

impl LeaseState {
    /// Whether another instance may try to claim a lease in this state
    pub fn is_claimable(&self) -> bool {
        self.can_transition_to(LeaseState::Acquiring)
    }

    /// Whether `next` is an edge of the lease state machine
    pub fn can_transition_to(&self, next: LeaseState) -> bool {
        use LeaseState::*;
        matches!(
            (self, next),
            (Unowned, Acquiring)
                | (Expired, Acquiring)
                | (Released, Acquiring)
                | (Acquiring, Owned)
                | (Acquiring, Unowned)
                | (Owned, Owned)
                | (Owned, Expired)
                | (Owned, Released)
                | (Expired, Unowned)
                | (Released, Unowned)
        )
    }
}

impl fmt::Display for LeaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeaseState::Unowned => "unowned",
            LeaseState::Acquiring => "acquiring",
            LeaseState::Owned => "owned",
            LeaseState::Expired => "expired",
            LeaseState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Lease document for one change-feed partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionLease {
    /// Partition this lease covers
    pub partition_id: PartitionId,
    /// Current holder, `None` once released
    pub owner_id: Option<OwnerId>,
    /// Instant after which another instance may claim the lease
    pub lease_expiry: DateTime<Utc>,
    /// Last successfully processed position in the partition's stream
    pub checkpoint_token: CheckpointToken,
}

impl PartitionLease {
    /// First lease of a partition, claimed by `owner` until `lease_expiry`
    pub fn claimed(
        partition_id: PartitionId,
        owner: OwnerId,
        lease_expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_id,
            owner_id: Some(owner),
            lease_expiry,
            checkpoint_token: CheckpointToken::START,
        }
    }

    /// Ownership state of this record as seen at `now`
    ///
    /// Records are only ever written with an owner, so a record without one
    /// was given up by its last holder.
    pub fn state(&self, now: DateTime<Utc>) -> LeaseState {
        match &self.owner_id {
            None => LeaseState::Released,
            Some(_) if now >= self.lease_expiry => LeaseState::Expired,
            Some(_) => LeaseState::Owned,
        }
    }

    /// Whether `owner` holds a non-expired claim at `now`
    pub fn is_held_by(&self, owner: &OwnerId, now: DateTime<Utc>) -> bool {
        self.owner_id.as_ref() == Some(owner) && now < self.lease_expiry
    }
}
