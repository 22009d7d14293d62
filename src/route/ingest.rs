//! RouteIngestor: validation, de-duplication and Douglas–Peucker simplification.

use geo::{Coord, LineString, SimplifyIdx};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::geometry::{haversine_m, GeoPoint, LocalProjection};

/// Samples closer than this (meters) are treated as the same position.
const DUPLICATE_SPACING_M: f64 = 0.05;

/// Reported distance may differ from the measured one by this factor before
/// a warning is raised.
const DISTANCE_MISMATCH_FACTOR: f64 = 2.0;

/// Reasons a route is rejected outright.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("route needs at least 2 distinct points, got {0}")]
    TooFewPoints(usize),

    #[error("point {index} is outside WGS84 range or not finite: ({lat}, {lon})")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    #[error("reported distance must be finite and non-negative, got {0}")]
    InvalidDistance(f64),

    #[error("reported duration must be finite and non-negative, got {0}")]
    InvalidDuration(f64),
}

/// Suspicious but accepted route properties, passed on to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RouteWarning {
    /// Two consecutive samples are farther apart than the teleport threshold.
    #[serde(rename_all = "camelCase")]
    Teleport { index: usize, jump_meters: f64 },

    /// The client-reported distance disagrees with the measured path length.
    #[serde(rename_all = "camelCase")]
    DistanceMismatch { reported_meters: f64, measured_meters: f64 },
}

/// A validated, simplified route ready for buffering.
#[derive(Debug, Clone)]
pub struct IngestedRoute {
    /// Simplified points, a subset of the input samples in order.
    pub points: Vec<GeoPoint>,
    /// The same points in the route's local projection (meters).
    pub planar: LineString<f64>,
    pub projection: LocalProjection,
    /// Haversine length of the de-duplicated (unsimplified) path.
    pub measured_distance_m: f64,
    pub reported_distance_m: f64,
    pub duration_s: f64,
    pub warnings: Vec<RouteWarning>,
}

impl IngestedRoute {
    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn end(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }
}

/// Turns raw client samples into an [`IngestedRoute`].
#[derive(Debug, Clone, Copy)]
pub struct RouteIngestor {
    simplify_tolerance_m: f64,
    teleport_threshold_m: f64,
}

impl RouteIngestor {
    pub fn new(config: &EngineConfig) -> Self {
        RouteIngestor {
            simplify_tolerance_m: config.simplify_tolerance_m,
            teleport_threshold_m: config.teleport_threshold_m,
        }
    }

    /// Validates and simplifies a route.
    pub fn ingest(
        &self,
        points: &[GeoPoint],
        distance_m: f64,
        duration_s: f64,
    ) -> Result<IngestedRoute, RouteError> {
        if !(distance_m.is_finite() && distance_m >= 0.0) {
            return Err(RouteError::InvalidDistance(distance_m));
        }
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(RouteError::InvalidDuration(duration_s));
        }
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(RouteError::InvalidCoordinate {
                index,
                lat: p.lat,
                lon: p.lon,
            });
        }

        let (deduped, sources) = collapse_duplicates(points);
        if deduped.len() < 2 {
            return Err(RouteError::TooFewPoints(deduped.len()));
        }

        let mut warnings = Vec::new();
        let mut measured = 0.0;
        for (pair, &index) in deduped.windows(2).zip(&sources[1..]) {
            let jump = haversine_m(pair[0], pair[1]);
            measured += jump;
            if jump > self.teleport_threshold_m {
                warn!(index, jump_m = jump, "route sample jumps past teleport threshold");
                warnings.push(RouteWarning::Teleport {
                    index,
                    jump_meters: jump,
                });
            }
        }
        if distance_mismatch(distance_m, measured) {
            warn!(reported_m = distance_m, measured_m = measured, "reported route distance disagrees with samples");
            warnings.push(RouteWarning::DistanceMismatch {
                reported_meters: distance_m,
                measured_meters: measured,
            });
        }

        // `centred_on` only fails on an empty slice, which was rejected above.
        let projection = LocalProjection::centred_on(&deduped)
            .ok_or(RouteError::TooFewPoints(0))?;
        let planar: LineString<f64> = deduped
            .iter()
            .map(|p| projection.forward(*p))
            .collect::<Vec<Coord<f64>>>()
            .into();

        let keep = planar.simplify_idx(&self.simplify_tolerance_m);
        let simplified: Vec<GeoPoint> = keep.iter().map(|&i| deduped[i]).collect();
        if !leaves_start(&simplified) {
            return Err(RouteError::TooFewPoints(1));
        }
        debug!(
            raw = points.len(),
            deduped = deduped.len(),
            simplified = simplified.len(),
            "route ingested"
        );

        Ok(IngestedRoute {
            planar: keep.iter().map(|&i| planar.0[i]).collect::<Vec<_>>().into(),
            points: simplified,
            projection,
            measured_distance_m: measured,
            reported_distance_m: distance_m,
            duration_s,
            warnings,
        })
    }
}

/// Drops samples that repeat the previous kept sample.
///
/// Returns the kept samples alongside their indices in `points`.
fn collapse_duplicates(points: &[GeoPoint]) -> (Vec<GeoPoint>, Vec<usize>) {
    let mut kept: Vec<GeoPoint> = Vec::with_capacity(points.len());
    let mut sources = Vec::with_capacity(points.len());
    for (i, &p) in points.iter().enumerate() {
        match kept.last() {
            Some(&last) if haversine_m(last, p) < DUPLICATE_SPACING_M => {}
            _ => {
                kept.push(p);
                sources.push(i);
            }
        }
    }
    (kept, sources)
}

/// Whether any sample lies at least the duplicate spacing away from the first.
fn leaves_start(points: &[GeoPoint]) -> bool {
    match points.first() {
        Some(&start) => points[1..]
            .iter()
            .any(|&p| haversine_m(start, p) >= DUPLICATE_SPACING_M),
        None => false,
    }
}

fn distance_mismatch(reported: f64, measured: f64) -> bool {
    if reported <= 0.0 || measured <= 0.0 {
        return false;
    }
    let ratio = reported / measured;
    !(1.0 / DISTANCE_MISMATCH_FACTOR..=DISTANCE_MISMATCH_FACTOR).contains(&ratio)
}
