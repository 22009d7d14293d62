//! ClaimPolygonBuilder: route -> single simple claim polygon in degrees.

use geo::{Area, BoundingRect, ConvexHull, Coord, MultiPoint, MultiPolygon, Polygon, Rect};
use tracing::{debug, warn};

use super::corridor::{buffer_path, loop_fill};
use crate::config::EngineConfig;
use crate::geometry::{single_polygon, union_all};
use crate::route::IngestedRoute;

/// Reasons a route cannot be turned into land.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClaimError {
    #[error("corridor buffer of {segments} segments is empty or not simple, and convex-hull repair failed")]
    Degenerate { segments: usize },

    #[error("claim spans the antimeridian (longitudes {west:.5} to {east:.5})")]
    CrossesAntimeridian { west: f64, east: f64 },
}

/// The land shape generated from one route.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimPolygon {
    /// Simple polygon in `(lon, lat)` degrees.
    pub polygon: Polygon<f64>,
    pub bounds: Rect<f64>,
    /// Whether the route closed on itself and its interior was filled.
    pub is_loop: bool,
    /// Whether the convex-hull repair pass produced this polygon.
    pub repaired: bool,
    /// Area in the route's local projection, square meters.
    pub planar_area_m2: f64,
}

impl ClaimPolygon {
    pub fn to_multipolygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![self.polygon.clone()])
    }
}

/// Buffers an [`IngestedRoute`] into a [`ClaimPolygon`].
#[derive(Debug, Clone, Copy)]
pub struct ClaimPolygonBuilder {
    half_width_m: f64,
    loop_close_distance_m: f64,
    arc_segments: usize,
}

impl ClaimPolygonBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        ClaimPolygonBuilder {
            half_width_m: config.corridor_half_width_m,
            loop_close_distance_m: config.loop_close_distance_m,
            arc_segments: config.arc_segments,
        }
    }

    pub fn build(&self, route: &IngestedRoute) -> Result<ClaimPolygon, ClaimError> {
        let path: &[Coord<f64>] = &route.planar.0;
        let segments = path.len().saturating_sub(1);
        let (capsules, corridor) = buffer_path(path, self.half_width_m, self.arc_segments);

        let fill = loop_fill(path, self.loop_close_distance_m);
        let is_loop = fill.is_some();
        let planar = match fill {
            Some(inside) => union_all(vec![corridor, inside]),
            None => corridor,
        };

        let (planar, repaired) = match single_polygon(planar) {
            Some(p) => (p, false),
            None => {
                warn!(segments, "corridor buffer not simple, falling back to convex hull");
                (hull_repair(&capsules).ok_or(ClaimError::Degenerate { segments })?, true)
            }
        };

        let planar_area_m2 = planar.unsigned_area();
        let polygon = route.projection.unproject_polygon(&planar);
        let bounds = polygon
            .bounding_rect()
            .ok_or(ClaimError::Degenerate { segments })?;
        if bounds.width() > 180.0 {
            return Err(ClaimError::CrossesAntimeridian {
                west: bounds.min().x,
                east: bounds.max().x,
            });
        }
        debug!(segments, is_loop, repaired, planar_area_m2, "claim polygon built");

        Ok(ClaimPolygon {
            polygon,
            bounds,
            is_loop,
            repaired,
            planar_area_m2,
        })
    }
}

/// Convex hull of every capsule vertex, or `None` if even that is degenerate.
pub fn hull_repair(capsules: &[Polygon<f64>]) -> Option<Polygon<f64>> {
    let vertices: Vec<Coord<f64>> = capsules
        .iter()
        .flat_map(|c| c.exterior().0.iter().copied())
        .collect();
    if vertices.is_empty() {
        return None;
    }
    single_polygon(MultiPolygon::new(vec![MultiPoint::from(vertices).convex_hull()]))
}
