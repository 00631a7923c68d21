use crate::constants::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_LOCATION, DEFAULT_RADIUS,
};

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use serde::Serialize;
use thiserror::Error;

/// A WGS84 coordinate, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    // Overpass returns shared nodes with identical coordinates, but we allow
    // for rounding in cached responses.
    pub fn same_as(&self, other: &GeoPoint) -> bool {
        (self.lat - other.lat).abs() < 1e-9 && (self.lon - other.lon).abs() < 1e-9
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A point on the local metric plane, `x` metres east and `y` metres north
/// of the map center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Polygon {
        exterior: Vec<GeoPoint>,
        holes: Vec<Vec<GeoPoint>>,
    },
    LineString {
        points: Vec<GeoPoint>,
    },
}

impl Geometry {
    pub fn is_polygon(&self) -> bool {
        matches!(self, Geometry::Polygon { .. })
    }

    /// Returns the geometry as a line: the points of a line string, or the
    /// closed exterior ring of a polygon.
    pub fn outline(&self) -> Vec<GeoPoint> {
        match self {
            Geometry::LineString { points } => points.clone(),
            Geometry::Polygon { exterior, .. } => {
                let mut ring = exterior.clone();
                if let Some(first) = exterior.first() {
                    ring.push(*first);
                }
                ring
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub id: i64,
    pub tags: Tags,
    pub geometry: Geometry,
}

/// What the user asked a map of: a free-text query to geocode, or a
/// coordinate pair written as `lat,lon`.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Query(String),
    Coordinates(GeoPoint),
}

impl From<&str> for Place {
    fn from(descriptor: &str) -> Self {
        let descriptor = descriptor.trim();

        let coordinates = descriptor.split_once(',').and_then(|(lat, lon)| {
            let lat = lat.trim().parse::<f64>().ok()?;
            let lon = lon.trim().parse::<f64>().ok()?;

            ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
                .then_some(GeoPoint::new(lat, lon))
        });

        match coordinates {
            Some(point) => Place::Coordinates(point),
            None => Place::Query(descriptor.to_string()),
        }
    }
}

impl Display for Place {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Place::Query(query) => write!(f, "{query}"),
            Place::Coordinates(point) => write!(f, "{point}"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dimension(u32);

#[derive(Clone, Debug, Error)]
#[error("{0} cannot be zero")]
pub struct DimensionCannotBeZeroError(&'static str);

impl Dimension {
    pub fn new(name: &'static str, raw: u32) -> Result<Self, DimensionCannotBeZeroError> {
        if raw == 0 {
            return Err(DimensionCannotBeZeroError(name));
        }

        Ok(Self(raw))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// The parameters of a single render: where, how far around it, and how big
/// the canvas is in inches.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    place: Place,
    radius: Dimension,
    width: Dimension,
    height: Dimension,
}

impl RenderRequest {
    pub fn new(
        location: &str,
        radius: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, DimensionCannotBeZeroError> {
        Ok(Self {
            place: Place::from(location),
            radius: Dimension::new("radius", radius)?,
            width: Dimension::new("canvas width", width)?,
            height: Dimension::new("canvas height", height)?,
        })
    }

    pub fn place(&self) -> &Place {
        &self.place
    }

    pub fn radius(&self) -> u32 {
        self.radius.get()
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }
}

impl Default for RenderRequest {
    fn default() -> Self {
        RenderRequest {
            place: Place::from(DEFAULT_LOCATION),
            radius: Dimension(DEFAULT_RADIUS),
            width: Dimension(DEFAULT_CANVAS_WIDTH),
            height: Dimension(DEFAULT_CANVAS_HEIGHT),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_place_parses_coordinates() {
        assert_eq!(
            Place::from(" 59.437, 24.745 "),
            Place::Coordinates(GeoPoint::new(59.437, 24.745))
        );
    }

    #[test]
    fn test_place_keeps_text_queries() {
        assert_eq!(
            Place::from("Old Town, Tallinn"),
            Place::Query("Old Town, Tallinn".to_string())
        );
        // Out of range latitudes are not coordinates
        assert_eq!(
            Place::from("120, 24"),
            Place::Query("120, 24".to_string())
        );
    }

    #[test]
    fn test_render_request_rejects_zero_dimensions() {
        assert!(RenderRequest::new("Tallinn", 0, 12, 12).is_err());
        assert!(RenderRequest::new("Tallinn", 1000, 0, 12).is_err());

        let error = RenderRequest::new("Tallinn", 1000, 12, 0).unwrap_err();
        assert_eq!(error.to_string(), "canvas height cannot be zero");
    }

    #[test]
    fn test_polygon_outline_is_closed() {
        let geometry = Geometry::Polygon {
            exterior: vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 1.0),
                GeoPoint::new(1.0, 1.0),
            ],
            holes: vec![],
        };

        let outline = geometry.outline();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline.first(), outline.last());
    }
}
