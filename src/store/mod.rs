//! Territory persistence.
//!
//! The engine reads a [`Snapshot`] of every territory a claim can touch, runs
//! the pipeline without holding any lock, then hands a [`CommitSet`] back to
//! the store. The store applies it atomically only if nothing it was computed
//! from has changed; otherwise it reports a [`CommitOutcome::Conflict`] and the
//! engine retries against a fresh snapshot.

pub mod ledger;
pub mod memory;

use std::collections::BTreeMap;

use geo::Rect;

use crate::report::{TerritoryUpdate, Theft};
use crate::territory::{Territory, User, UserId};

pub use ledger::{ConquestLedger, ConquestRecord, ConquestStats};
pub use memory::{MemoryStore, StoreDocument, TerritoryRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("commit writes territory of unknown user {0}")]
    UnknownUser(UserId),

    #[error("store document invalid: {0}")]
    Invalid(String),

    #[error("store file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Version of a territory row as seen by one reader; 0 means no row.
pub type ReadStamp = (UserId, u64);

/// Everything a submission reads before computing its result.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The submitter's territory, unclaimed if no row exists yet.
    pub submitter: Territory,
    /// Other territories whose bounds meet the query box, ascending by owner.
    pub others: Vec<Territory>,
    /// Profiles of the submitter and every owner in `others`.
    pub users: BTreeMap<UserId, User>,
    pub read_set: Vec<ReadStamp>,
}

/// The writes of one submission plus the reads they depend on.
#[derive(Debug, Clone)]
pub struct CommitSet {
    pub attacker: UserId,
    /// Bounds of the claim polygon; any territory entering this box since the
    /// snapshot invalidates the commit.
    pub claim_bounds: Rect<f64>,
    pub read_set: Vec<ReadStamp>,
    pub updates: Vec<TerritoryUpdate>,
    pub thefts: Vec<Theft>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { sequence: u64 },
    /// Row `owner` was read at `expected` but is now at `found`.
    Conflict { owner: UserId, expected: u64, found: u64 },
}

/// Storage for users and territories with optimistic multi-row commits.
pub trait TerritoryStore: Send + Sync {
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    fn territory(&self, owner: UserId) -> Result<Option<Territory>, StoreError>;

    /// Reads the submitter's territory and every other territory whose
    /// bounding box intersects `bounds`.
    fn snapshot(&self, submitter: UserId, bounds: &Rect<f64>) -> Result<Snapshot, StoreError>;

    /// Applies `commit` atomically, or reports the first stale read.
    fn commit(&self, commit: &CommitSet) -> Result<CommitOutcome, StoreError>;
}
