//! ConflictResolver: land the claim takes from other owners.

use geo::{Area, BooleanOps, MultiPolygon};
use rayon::prelude::*;
use tracing::trace;

use crate::claim::ClaimPolygon;
use crate::geometry::rects_intersect;
use crate::territory::{Territory, UserId};

/// One victim's territory before and after the claim is cut out of it.
#[derive(Debug, Clone)]
pub struct VictimLoss {
    pub prior: Territory,
    pub remaining: MultiPolygon<f64>,
}

impl VictimLoss {
    pub fn owner(&self) -> UserId {
        self.prior.owner
    }
}

/// Cuts `claim` out of every territory not owned by `submitter`.
///
/// Every victim is tested against the original claim, never against a claim
/// already reduced by an earlier victim. Territories that do not overlap the
/// claim are skipped. The per-territory boolean work runs on the rayon pool;
/// the returned losses are in ascending owner order regardless of scheduling.
pub fn resolve_conflicts(
    claim: &ClaimPolygon,
    submitter: UserId,
    territories: &[Territory],
) -> Vec<VictimLoss> {
    let claim_geometry = claim.to_multipolygon();
    let mut losses: Vec<VictimLoss> = territories
        .par_iter()
        .filter(|t| t.owner != submitter && !t.is_empty())
        .filter(|t| t.bounds().is_some_and(|b| rects_intersect(&b, &claim.bounds)))
        .filter_map(|t| {
            let overlap = t.geometry.intersection(&claim_geometry);
            if overlap.0.is_empty() || overlap.unsigned_area() <= 0.0 {
                trace!(owner = %t.owner, "bounding boxes overlap but land does not");
                return None;
            }
            Some(VictimLoss {
                prior: t.clone(),
                remaining: t.geometry.difference(&claim_geometry),
            })
        })
        .collect();
    losses.sort_by_key(VictimLoss::owner);
    losses
}
