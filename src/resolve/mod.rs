//! Territory resolution.
//!
//! Applies one claim polygon to a snapshot of holdings: the submitter's land
//! grows by the claim ([`merge_claim`]) and every other owner loses whatever
//! part of the claim they held ([`resolve_conflicts`]).

pub mod conflict;
pub mod merge;

pub use conflict::{resolve_conflicts, VictimLoss};
pub use merge::{merge_claim, MergeOutcome};
