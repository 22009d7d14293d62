//! Geometry payloads at the engine boundary.
//!
//! Routes arrive in several shapes: raw `[[lat, lon], ...]` arrays as stored
//! by clients, or GeoJSON `LineString`, `Feature` and `FeatureCollection`
//! objects in `[lon, lat]` order. [`decode_route`] turns any of them into one
//! `Vec<GeoPoint>`. Territories are persisted as GeoJSON `MultiPolygon`
//! documents via [`MultiPolygonDocument`].

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::geometry::GeoPoint;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed geometry payload: {0}")]
    Malformed(String),

    #[error("unsupported geometry type '{0}'")]
    UnsupportedType(String),

    #[error("no LineString found in {0}")]
    MissingLineString(&'static str),

    #[error("position {index} has {len} coordinates, need at least 2")]
    ShortPosition { index: usize, len: usize },

    #[error("ring {ring} of polygon {polygon} has {len} positions, need at least 4")]
    ShortRing { polygon: usize, ring: usize, len: usize },

    #[error("non-finite coordinate in polygon {polygon}")]
    NonFinite { polygon: usize },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoutePayload {
    Pairs(Vec<Vec<f64>>),
    Object(GeoObject),
}

/// The subset of GeoJSON object members the decoder looks at.
#[derive(Deserialize)]
struct GeoObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Option<serde_json::Value>,
    #[serde(default)]
    geometry: Option<Box<GeoObject>>,
    #[serde(default)]
    features: Vec<GeoObject>,
}

impl GeoObject {
    fn line_string(&self) -> Option<&serde_json::Value> {
        match self.kind.as_str() {
            "LineString" => self.coordinates.as_ref(),
            "Feature" => self.geometry.as_deref().and_then(GeoObject::line_string),
            _ => None,
        }
    }
}

/// Which component of a position holds the latitude.
#[derive(Clone, Copy)]
enum Order {
    LatLon,
    LonLat,
}

fn line_positions(coordinates: &serde_json::Value) -> Result<Vec<Vec<f64>>, DecodeError> {
    Vec::<Vec<f64>>::deserialize(coordinates).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn to_points(positions: &[Vec<f64>], order: Order) -> Result<Vec<GeoPoint>, DecodeError> {
    positions
        .iter()
        .enumerate()
        .map(|(index, p)| match (order, p.as_slice()) {
            (Order::LatLon, [lat, lon, ..]) => Ok(GeoPoint::new(*lat, *lon)),
            (Order::LonLat, [lon, lat, ..]) => Ok(GeoPoint::new(*lat, *lon)),
            _ => Err(DecodeError::ShortPosition { index, len: p.len() }),
        })
        .collect()
}

/// Decodes a route payload into points.
///
/// Coordinate validity (range, finiteness) is left to route ingestion; this
/// step only fixes the shape and axis order.
pub fn decode_route(payload: &str) -> Result<Vec<GeoPoint>, DecodeError> {
    let payload: RoutePayload =
        serde_json::from_str(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    match payload {
        RoutePayload::Pairs(pairs) => to_points(&pairs, Order::LatLon),
        RoutePayload::Object(object) => match object.kind.as_str() {
            "LineString" => {
                let coords = object.line_string().ok_or(DecodeError::MissingLineString("LineString"))?;
                to_points(&line_positions(coords)?, Order::LonLat)
            }
            "Feature" => {
                let coords = object.line_string().ok_or(DecodeError::MissingLineString("Feature"))?;
                to_points(&line_positions(coords)?, Order::LonLat)
            }
            "FeatureCollection" => {
                let coords = object
                    .features
                    .iter()
                    .find_map(GeoObject::line_string)
                    .ok_or(DecodeError::MissingLineString("FeatureCollection"))?;
                to_points(&line_positions(coords)?, Order::LonLat)
            }
            other => Err(DecodeError::UnsupportedType(other.to_string())),
        },
    }
}

/// A GeoJSON `MultiPolygon` geometry object.
///
/// Rings are stored exactly as held in memory, so a round trip through this
/// document preserves ring order, vertex order and holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygonDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

impl From<&MultiPolygon<f64>> for MultiPolygonDocument {
    fn from(mp: &MultiPolygon<f64>) -> Self {
        let ring = |ls: &LineString<f64>| ls.0.iter().map(|c| [c.x, c.y]).collect::<Vec<_>>();
        MultiPolygonDocument {
            kind: "MultiPolygon".to_string(),
            coordinates: mp
                .0
                .iter()
                .map(|p| {
                    std::iter::once(ring(p.exterior()))
                        .chain(p.interiors().iter().map(ring))
                        .collect()
                })
                .collect(),
        }
    }
}

impl TryFrom<MultiPolygonDocument> for MultiPolygon<f64> {
    type Error = DecodeError;

    fn try_from(doc: MultiPolygonDocument) -> Result<Self, Self::Error> {
        if doc.kind != "MultiPolygon" {
            return Err(DecodeError::UnsupportedType(doc.kind));
        }
        let mut polygons = Vec::with_capacity(doc.coordinates.len());
        for (pi, rings) in doc.coordinates.into_iter().enumerate() {
            let mut rings = rings.into_iter().enumerate().map(|(ri, positions)| {
                if positions.len() < 4 {
                    return Err(DecodeError::ShortRing {
                        polygon: pi,
                        ring: ri,
                        len: positions.len(),
                    });
                }
                if !positions.iter().flatten().all(|v| v.is_finite()) {
                    return Err(DecodeError::NonFinite { polygon: pi });
                }
                Ok(LineString::new(
                    positions.into_iter().map(|[x, y]| Coord { x, y }).collect(),
                ))
            });
            let exterior = match rings.next() {
                Some(ring) => ring?,
                None => {
                    return Err(DecodeError::ShortRing {
                        polygon: pi,
                        ring: 0,
                        len: 0,
                    })
                }
            };
            let interiors = rings.collect::<Result<Vec<_>, _>>()?;
            polygons.push(Polygon::new(exterior, interiors));
        }
        Ok(MultiPolygon::new(polygons))
    }
}
