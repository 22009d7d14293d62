//! The conquest engine.
//!
//! Ties the pipeline stages together and runs the optimistic snapshot/commit
//! loop against a [`TerritoryStore`]. The claim polygon depends only on the
//! route and the configuration, so it is built once; everything downstream of
//! the snapshot is recomputed on each attempt.

use tracing::{debug, error, info, warn};

use crate::accounting::{AccountingError, AreaAccountant};
use crate::claim::{ClaimPolygon, ClaimPolygonBuilder};
use crate::config::EngineConfig;
use crate::error::ConquestError;
use crate::geometry::GeoPoint;
use crate::protocol::geojson::decode_route;
use crate::report::{assemble, ConquestReport, ConquestResult};
use crate::resolve::{merge_claim, resolve_conflicts};
use crate::route::{RouteIngestor, RouteWarning};
use crate::store::{CommitOutcome, CommitSet, Snapshot, TerritoryStore};
use crate::territory::UserId;

/// Runs claims against one store.
///
/// `process_route` takes `&self`, so a single engine can serve many threads
/// at once when its store is shared.
#[derive(Debug)]
pub struct ConquestEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: TerritoryStore> ConquestEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        ConquestEngine { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    /// Decodes a route payload (see [`decode_route`]) and processes it.
    pub fn process_payload(
        &self,
        user_id: UserId,
        payload: &str,
        distance_m: f64,
        duration_s: f64,
    ) -> Result<ConquestResult, ConquestError> {
        let points = decode_route(payload)?;
        self.process_route(user_id, &points, distance_m, duration_s)
    }

    /// Claims the land covered by a route for `user_id`.
    ///
    /// On success the submitter's and every victim's territory have been
    /// committed atomically. On error nothing has been written.
    pub fn process_route(
        &self,
        user_id: UserId,
        points: &[GeoPoint],
        distance_m: f64,
        duration_s: f64,
    ) -> Result<ConquestResult, ConquestError> {
        if self.store.user(user_id)?.is_none() {
            return Err(ConquestError::UnknownUser(user_id));
        }
        let route = RouteIngestor::new(&self.config).ingest(points, distance_m, duration_s)?;
        let claim = ClaimPolygonBuilder::new(&self.config).build(&route)?;

        let attempts = self.config.max_commit_attempts.max(1);
        for attempt in 1..=attempts {
            let snapshot = self.store.snapshot(user_id, &claim.bounds)?;
            let report = plan_conquest(&self.config, &claim, &snapshot, route.warnings.clone())
                .map_err(|e| {
                    error!(
                        user = %user_id,
                        error = %e,
                        distance_m,
                        duration_s,
                        points = ?points,
                        claim = ?claim.polygon,
                        "geometry accounting failed"
                    );
                    e
                })?;

            let commit = CommitSet {
                attacker: user_id,
                claim_bounds: claim.bounds,
                read_set: snapshot.read_set,
                updates: report.updates,
                thefts: report.thefts,
            };
            match self.store.commit(&commit)? {
                CommitOutcome::Applied { sequence } => {
                    info!(
                        user = %user_id,
                        sequence,
                        attempt,
                        new_area = report.result.new_area_conquered,
                        stolen = report.result.area_stolen,
                        "route processed"
                    );
                    return Ok(report.result);
                }
                CommitOutcome::Conflict { owner, expected, found } => {
                    debug!(user = %user_id, attempt, %owner, expected, found, "commit conflict, retrying");
                }
            }
        }
        warn!(user = %user_id, attempts, "commit attempts exhausted");
        Err(ConquestError::ConflictExhausted { attempts })
    }
}

/// Computes what `claim` does to `snapshot` without touching any store.
///
/// The same snapshot and claim always produce the same report.
pub fn plan_conquest(
    config: &EngineConfig,
    claim: &ClaimPolygon,
    snapshot: &Snapshot,
    warnings: Vec<RouteWarning>,
) -> Result<ConquestReport, AccountingError> {
    let merge = merge_claim(&snapshot.submitter, claim);
    let losses = resolve_conflicts(claim, snapshot.submitter.owner, &snapshot.others);
    let settlement = AreaAccountant::new(config).settle(merge, losses)?;
    Ok(assemble(settlement, &snapshot.users, warnings))
}
