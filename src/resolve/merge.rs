//! TerritoryMerger: union of a claim into the submitter's holdings.

use geo::{BooleanOps, MultiPolygon};

use crate::claim::ClaimPolygon;
use crate::territory::Territory;

/// The submitter's territory before and after absorbing a claim.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub prior: Territory,
    pub merged: MultiPolygon<f64>,
}

/// Unions `claim` into `territory`.
///
/// Touching and overlapping parts collapse into single regions; holes that the
/// claim does not cover survive. The input territory is left untouched.
pub fn merge_claim(territory: &Territory, claim: &ClaimPolygon) -> MergeOutcome {
    let claim = claim.to_multipolygon();
    let merged = if territory.is_empty() {
        claim
    } else {
        territory.geometry.union(&claim)
    };
    MergeOutcome {
        prior: territory.clone(),
        merged,
    }
}
