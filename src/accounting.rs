//! AreaAccountant: authoritative geodesic areas and the deltas between them.
//!
//! Every figure that leaves the engine is computed here from geometry on the
//! WGS84 ellipsoid. Cached areas are only used to detect drift. Differences
//! smaller than the negligible-area threshold are treated as float noise from
//! the boolean operations and normalized to zero; larger differences in the
//! wrong direction mean the geometry pipeline is broken and abort the
//! submission.

use geo::{CoordsIter, MultiPolygon};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::geometry::geodesic_area;
use crate::resolve::{MergeOutcome, VictimLoss};
use crate::territory::UserId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountingError {
    #[error("area of territory {owner} is not finite ({area})")]
    NonFinite { owner: UserId, area: f64 },

    #[error("area of territory {owner} is negative ({area})")]
    Negative { owner: UserId, area: f64 },

    #[error("union shrank territory {owner} from {before} to {after} m²")]
    Shrunk { owner: UserId, before: f64, after: f64 },

    #[error("difference grew territory {owner} from {before} to {after} m²")]
    Grew { owner: UserId, before: f64, after: f64 },
}

/// A territory's post-claim state with its recomputed areas.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledTerritory {
    pub owner: UserId,
    pub geometry: MultiPolygon<f64>,
    pub area: f64,
    pub prior_area: f64,
    /// Version of the snapshot row this state was derived from.
    pub expected_version: u64,
    /// Whether the row must be written.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettledVictim {
    pub territory: SettledTerritory,
    pub stolen_area: f64,
}

/// Areas for one submission, ready for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub submitter: SettledTerritory,
    pub new_area_conquered: f64,
    /// Victims with a non-negligible loss, ascending by owner.
    pub victims: Vec<SettledVictim>,
    /// Territories the claim cut by less than the negligible area. Their rows
    /// are still rewritten so no land stays with two owners, but the loss is
    /// not reported as a theft.
    pub trimmed: Vec<SettledTerritory>,
}

impl Settlement {
    pub fn area_stolen(&self) -> f64 {
        self.victims.iter().map(|v| v.stolen_area).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AreaAccountant {
    negligible_area_m2: f64,
}

impl AreaAccountant {
    pub fn new(config: &EngineConfig) -> Self {
        AreaAccountant {
            negligible_area_m2: config.negligible_area_m2,
        }
    }

    /// Geodesic area of `geometry`, rejecting NaN, infinite and negative results.
    pub fn measure(&self, owner: UserId, geometry: &MultiPolygon<f64>) -> Result<f64, AccountingError> {
        if !geometry.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
            return Err(AccountingError::NonFinite { owner, area: f64::NAN });
        }
        let area = geodesic_area(geometry);
        if !area.is_finite() {
            return Err(AccountingError::NonFinite { owner, area });
        }
        if area < 0.0 {
            return Err(AccountingError::Negative { owner, area });
        }
        Ok(area)
    }

    /// Measures a snapshot territory, reporting drift from its cached area.
    fn measure_prior(&self, owner: UserId, geometry: &MultiPolygon<f64>, cached: f64) -> Result<f64, AccountingError> {
        let area = self.measure(owner, geometry)?;
        let drift = (area - cached).abs();
        if !(drift < self.negligible_area_m2) {
            warn!(%owner, cached, recomputed = area, "cached territory area drifted, using recomputed value");
        }
        Ok(area)
    }

    /// Computes every area the submission changes.
    pub fn settle(&self, merge: MergeOutcome, losses: Vec<VictimLoss>) -> Result<Settlement, AccountingError> {
        let owner = merge.prior.owner;
        let before = self.measure_prior(owner, &merge.prior.geometry, merge.prior.area)?;
        let after = self.measure(owner, &merge.merged)?;
        let drifted = !((before - merge.prior.area).abs() < self.negligible_area_m2);
        let gain = after - before;

        let (submitter, new_area_conquered) = if gain <= -self.negligible_area_m2 {
            return Err(AccountingError::Shrunk { owner, before, after });
        } else if gain < self.negligible_area_m2 {
            debug!(%owner, gain, "negligible gain normalized to zero");
            let kept = SettledTerritory {
                owner,
                geometry: merge.prior.geometry,
                area: before,
                prior_area: before,
                expected_version: merge.prior.version,
                changed: drifted,
            };
            (kept, 0.0)
        } else {
            let grown = SettledTerritory {
                owner,
                geometry: merge.merged,
                area: after,
                prior_area: before,
                expected_version: merge.prior.version,
                changed: true,
            };
            (grown, gain)
        };

        let mut victims = Vec::with_capacity(losses.len());
        let mut trimmed = Vec::new();
        for loss in losses {
            let owner = loss.owner();
            let before = self.measure_prior(owner, &loss.prior.geometry, loss.prior.area)?;
            let after = self.measure(owner, &loss.remaining)?;
            let stolen = before - after;
            if stolen <= -self.negligible_area_m2 {
                return Err(AccountingError::Grew { owner, before, after });
            }
            let territory = SettledTerritory {
                owner,
                geometry: loss.remaining,
                area: after,
                prior_area: before,
                expected_version: loss.prior.version,
                changed: true,
            };
            if stolen < self.negligible_area_m2 {
                debug!(%owner, stolen, "negligible loss, trimming without a theft");
                trimmed.push(territory);
            } else {
                victims.push(SettledVictim {
                    territory,
                    stolen_area: stolen,
                });
            }
        }

        Ok(Settlement {
            submitter,
            new_area_conquered,
            victims,
            trimmed,
        })
    }
}
