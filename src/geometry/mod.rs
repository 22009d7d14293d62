//! Geometry primitives shared by every pipeline stage.
//!
//! Routes enter as [`GeoPoint`] sequences; everything after ingestion uses the
//! `geo` crate types with `x = longitude`, `y = latitude` in geographic space
//! and `x = east`, `y = north` (meters) in a [`LocalProjection`] plane.

pub mod ops;
pub mod projection;

use geo::{coord, Coord, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

pub use ops::{empty_multipolygon, geodesic_area, rects_intersect, single_polygon, union_all};
pub use projection::LocalProjection;

/// Mean earth radius (IUGG) used by the local projection, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// Returns true if both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Converts to a `geo` coordinate in `(lon, lat)` order.
    pub fn to_coord(self) -> Coord<f64> {
        coord! { x: self.lon, y: self.lat }
    }

    /// Converts from a `geo` coordinate in `(lon, lat)` order.
    pub fn from_coord(c: Coord<f64>) -> Self {
        GeoPoint { lat: c.y, lon: c.x }
    }
}

/// Great-circle distance between two positions in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine::distance(Point::from(a.to_coord()), Point::from(b.to_coord()))
}
