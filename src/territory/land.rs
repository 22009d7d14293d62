//! A user's territory: a multipolygon plus its cached area and row version.

use geo::{BoundingRect, MultiPolygon, Rect};

use super::UserId;
use crate::geometry::empty_multipolygon;

/// The land one user currently holds.
///
/// `version` is the optimistic-concurrency stamp of the persisted row. A
/// territory that was never committed has version 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Territory {
    pub owner: UserId,
    /// Disjoint polygons in `(lon, lat)` degrees.
    pub geometry: MultiPolygon<f64>,
    /// Geodesic area of `geometry` in square meters.
    pub area: f64,
    pub version: u64,
}

impl Territory {
    /// An owner with no land and no persisted row.
    pub fn unclaimed(owner: UserId) -> Self {
        Territory {
            owner,
            geometry: empty_multipolygon(),
            area: 0.0,
            version: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    /// Whether a row for this territory has ever been committed.
    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Bounding box in `(lon, lat)` degrees, `None` when there is no land.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn unclaimed_territory_is_empty_and_unpersisted() {
        let t = Territory::unclaimed(UserId(1));
        assert!(t.is_empty());
        assert!(!t.is_persisted());
        assert!(t.bounds().is_none());
        assert_eq!(t.area, 0.0);
    }

    #[test]
    fn bounds_cover_geometry() {
        let mut t = Territory::unclaimed(UserId(1));
        t.geometry = MultiPolygon::new(vec![polygon![
            (x: 1.0, y: 2.0),
            (x: 3.0, y: 2.0),
            (x: 3.0, y: 5.0),
        ]]);
        let b = t.bounds().unwrap();
        assert_eq!((b.min().x, b.min().y, b.max().x, b.max().y), (1.0, 2.0, 3.0, 5.0));
    }
}
