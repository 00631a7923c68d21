use crate::types::{GeoPoint, Point};

/// Equirectangular projection onto a plane tangent at `origin`, accurate
/// enough at the scale of a city district.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalProjection {
    origin: GeoPoint,
    lat_scale: f64,
    lon_scale: f64,
}

impl LocalProjection {
    pub fn new(origin: GeoPoint) -> Self {
        LocalProjection {
            origin,
            lat_scale: meters_per_degree_lat(origin.lat),
            lon_scale: meters_per_degree_lon(origin.lat),
        }
    }

    pub fn project(&self, point: GeoPoint) -> Point {
        Point::new(
            (point.lon - self.origin.lon) * self.lon_scale,
            (point.lat - self.origin.lat) * self.lat_scale,
        )
    }

    pub fn project_all(&self, points: &[GeoPoint]) -> Vec<Point> {
        points.iter().map(|point| self.project(*point)).collect()
    }
}

fn meters_per_degree_lat(lat_deg: f64) -> f64 {
    let lat = lat_deg.to_radians();
    111_132.92 - 559.82 * (2.0 * lat).cos() + 1.175 * (4.0 * lat).cos()
}

fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    let lat = lat_deg.to_radians();
    111_412.84 * lat.cos() - 93.5 * (3.0 * lat).cos()
}

pub(crate) fn is_closed(points: &[GeoPoint]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => points.len() > 1 && first.same_as(last),
        _ => false,
    }
}

/// Removes consecutive duplicates and the closing point of a ring, so that
/// the first point is not repeated at the end.
pub(crate) fn dedupe_ring_points(points: &mut Vec<GeoPoint>) {
    points.dedup_by(|a, b| a.same_as(b));

    if points.len() >= 2 && is_closed(points) {
        let _ = points.pop();
    }
}

/// Joins open way segments sharing end points into closed rings. Segments
/// that never close are dropped. Returned rings do not repeat their first
/// point.
pub(crate) fn assemble_rings(segments: Vec<Vec<GeoPoint>>) -> Vec<Vec<GeoPoint>> {
    let mut rings = Vec::new();
    let mut open = Vec::new();

    for segment in segments.into_iter().filter(|s| s.len() >= 2) {
        if is_closed(&segment) {
            rings.push(segment);
        } else {
            open.push(segment);
        }
    }

    while let Some(mut ring) = open.pop() {
        loop {
            if is_closed(&ring) {
                rings.push(ring);
                break;
            }

            let Some(tail) = ring.last().copied() else {
                break;
            };

            let next = open.iter().position(|segment| {
                segment.first().is_some_and(|p| p.same_as(&tail))
                    || segment.last().is_some_and(|p| p.same_as(&tail))
            });

            let Some(idx) = next else {
                break;
            };

            let mut segment = open.swap_remove(idx);
            if !segment.first().is_some_and(|p| p.same_as(&tail)) {
                segment.reverse();
            }
            ring.extend(segment.into_iter().skip(1));
        }
    }

    rings
        .into_iter()
        .filter_map(|mut ring| {
            dedupe_ring_points(&mut ring);
            (ring.len() >= 3).then_some(ring)
        })
        .collect()
}

/// Even-odd test of `point` against a ring, in degrees. Good enough to sort
/// inner rings into their outer rings.
pub(crate) fn ring_contains(ring: &[GeoPoint], point: &GeoPoint) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);

    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.lat > point.lat) != (b.lat > point.lat)
            && point.lon < (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}
