//! Boolean-operation and measurement helpers over `geo` polygon sets.

use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, CoordsIter, GeodesicArea, MultiPolygon, Polygon, Rect};
use rayon::prelude::*;

/// Returns an empty multipolygon.
pub fn empty_multipolygon() -> MultiPolygon<f64> {
    MultiPolygon::new(Vec::new())
}

/// Unions a set of polygon sets with a balanced pairwise reduction.
///
/// Each level unions neighbouring pairs in parallel, so `n` capsules cost
/// `log2(n)` rounds instead of a left fold whose accumulator grows on every
/// step. The reduction order depends only on input order, so the output is
/// deterministic regardless of thread scheduling.
pub fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    parts.retain(|p| !p.0.is_empty());
    while parts.len() > 1 {
        parts = parts
            .par_chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => empty_multipolygon(),
            })
            .collect();
    }
    parts.pop().unwrap_or_else(empty_multipolygon)
}

/// Geodesic area on the WGS84 ellipsoid, in square meters.
///
/// Rings are re-oriented first (exterior counter-clockwise, holes clockwise)
/// so the result never depends on the winding produced by a boolean op.
pub fn geodesic_area(geometry: &MultiPolygon<f64>) -> f64 {
    if geometry.0.is_empty() {
        return 0.0;
    }
    geometry.orient(Direction::Default).geodesic_area_unsigned()
}

/// Returns true if two rectangles overlap or touch.
pub fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Extracts the single well-formed polygon from a boolean-op result.
///
/// Well-formed means: exactly one polygon, every coordinate finite, an
/// exterior ring of at least three distinct vertices, and positive planar
/// area. Anything else is `None`.
pub fn single_polygon(geometry: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    let mut polygons = geometry.0;
    if polygons.len() != 1 {
        return None;
    }
    let polygon = polygons.pop()?;
    if polygon.exterior().0.len() < 4 {
        return None;
    }
    if !polygon.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return None;
    }
    let area = polygon.unsigned_area();
    if !(area.is_finite() && area > 0.0) {
        return None;
    }
    Some(polygon)
}
