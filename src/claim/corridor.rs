//! Planar corridor buffering with round caps and joins.
//!
//! Each path segment is expanded into a capsule (a rectangle capped by two
//! half discs). The union of consecutive capsules is exactly a round-joined
//! buffer of the polyline, up to the arc approximation.

use std::f64::consts::PI;

use geo::{coord, BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use crate::geometry::union_all;

/// Segments shorter than this (meters) are buffered as a disc.
const MIN_SEGMENT_M: f64 = 1e-9;

/// Builds the capsule around segment `p -> q` with radius `r`.
///
/// `arc_segments` is the number of edges used for each half circle. The ring
/// is counter-clockwise.
pub fn capsule(p: Coord<f64>, q: Coord<f64>, r: f64, arc_segments: usize) -> Polygon<f64> {
    let n = arc_segments.max(2);
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len < MIN_SEGMENT_M {
        return disc(p, r, n);
    }
    let heading = dy.atan2(dx);
    let mut ring = Vec::with_capacity(2 * n + 3);
    for k in 0..=n {
        let a = heading - PI / 2.0 + PI * k as f64 / n as f64;
        ring.push(coord! { x: q.x + r * a.cos(), y: q.y + r * a.sin() });
    }
    for k in 0..=n {
        let a = heading + PI / 2.0 + PI * k as f64 / n as f64;
        ring.push(coord! { x: p.x + r * a.cos(), y: p.y + r * a.sin() });
    }
    Polygon::new(LineString::from(ring), Vec::new())
}

fn disc(c: Coord<f64>, r: f64, arc_segments: usize) -> Polygon<f64> {
    let n = 2 * arc_segments;
    let ring: Vec<Coord<f64>> = (0..n)
        .map(|k| {
            let a = 2.0 * PI * k as f64 / n as f64;
            coord! { x: c.x + r * a.cos(), y: c.y + r * a.sin() }
        })
        .collect();
    Polygon::new(LineString::from(ring), Vec::new())
}

/// Buffers a planar polyline by `r` and returns the capsules alongside their union.
pub fn buffer_path(path: &[Coord<f64>], r: f64, arc_segments: usize) -> (Vec<Polygon<f64>>, MultiPolygon<f64>) {
    let capsules: Vec<Polygon<f64>> = match path {
        [] => Vec::new(),
        [only] => vec![disc(*only, r, arc_segments.max(2))],
        _ => path
            .windows(2)
            .map(|w| capsule(w[0], w[1], r, arc_segments))
            .collect(),
    };
    let parts = capsules
        .iter()
        .map(|c| MultiPolygon::new(vec![c.clone()]))
        .collect();
    let merged = union_all(parts);
    (capsules, merged)
}

/// The area enclosed by a path whose ends meet within `close_distance`.
///
/// Returns `None` for open paths and for paths with fewer than three
/// distinct vertices, which cannot enclose anything. Self-crossing loops are
/// normalized through a self-union so the result is a valid polygon set.
pub fn loop_fill(path: &[Coord<f64>], close_distance: f64) -> Option<MultiPolygon<f64>> {
    let (first, last) = (*path.first()?, *path.last()?);
    let gap = ((last.x - first.x).powi(2) + (last.y - first.y).powi(2)).sqrt();
    if gap > close_distance {
        return None;
    }
    let mut ring: Vec<Coord<f64>> = path.to_vec();
    if gap > 0.0 {
        ring.push(first);
    }
    if !has_three_distinct(&ring) {
        return None;
    }
    let raw = MultiPolygon::new(vec![Polygon::new(LineString::from(ring), Vec::new())]);
    let normalized = raw.union(&raw);
    if normalized.0.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Whether `ring` holds at least three distinct vertices. Stops at the third.
fn has_three_distinct(ring: &[Coord<f64>]) -> bool {
    let Some(&a) = ring.first() else {
        return false;
    };
    let Some(&b) = ring.iter().find(|&&c| c != a) else {
        return false;
    };
    ring.iter().any(|&c| c != a && c != b)
}
