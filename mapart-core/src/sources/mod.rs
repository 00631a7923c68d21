mod cache;
mod overpass;

pub use overpass::OverpassSource;

use crate::{
    algos::layers::LayerSet,
    types::{Feature, GeoPoint},
};

use anyhow::Result;

/// Where map features come from.
pub trait FeatureSource {
    /// Resolves a free-form place name to its coordinates.
    fn geocode(&self, query: &str) -> Result<GeoPoint>;

    /// All features within `radius` metres of `center` that any of the
    /// fetched `layers` may select. Classification into layers is left to
    /// the caller.
    fn fetch(&self, center: GeoPoint, radius: f64, layers: &LayerSet) -> Result<Vec<Feature>>;
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::types::{Geometry, Tags};

    use std::cell::Cell;

    /// A fixed set of features around Tallinn's old town.
    pub(crate) struct StaticSource {
        pub center: GeoPoint,
        pub features: Vec<Feature>,
        pub fetches: Cell<u32>,
    }

    fn tags(entries: &[(&str, &str)]) -> Tags {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn square(center: GeoPoint, offset: f64, size: f64) -> Vec<GeoPoint> {
        let (lat, lon) = (center.lat + offset, center.lon + offset);
        vec![
            GeoPoint::new(lat, lon),
            GeoPoint::new(lat + size, lon),
            GeoPoint::new(lat + size, lon + size),
            GeoPoint::new(lat, lon + size),
        ]
    }

    impl StaticSource {
        pub fn old_town() -> Self {
            let center = GeoPoint::new(59.437, 24.745);

            let features = vec![
                Feature {
                    id: 1,
                    tags: tags(&[("building", "yes")]),
                    geometry: Geometry::Polygon {
                        exterior: square(center, 0.0001, 0.0002),
                        holes: Vec::new(),
                    },
                },
                Feature {
                    id: 2,
                    tags: tags(&[("leisure", "park")]),
                    geometry: Geometry::Polygon {
                        exterior: square(center, -0.001, 0.0005),
                        holes: Vec::new(),
                    },
                },
                Feature {
                    id: 3,
                    tags: tags(&[("highway", "residential"), ("name", "Pikk")]),
                    geometry: Geometry::LineString {
                        points: vec![center, GeoPoint::new(center.lat + 0.002, center.lon)],
                    },
                },
                Feature {
                    id: 4,
                    tags: tags(&[("highway", "cycleway")]),
                    geometry: Geometry::LineString {
                        points: vec![center, GeoPoint::new(center.lat, center.lon + 0.002)],
                    },
                },
                // A footprint mapped as an open way cannot be filled
                Feature {
                    id: 5,
                    tags: tags(&[("building", "yes")]),
                    geometry: Geometry::LineString {
                        points: square(center, 0.0003, 0.0001),
                    },
                },
            ];

            StaticSource {
                center,
                features,
                fetches: Cell::new(0),
            }
        }
    }

    impl FeatureSource for StaticSource {
        fn geocode(&self, query: &str) -> Result<GeoPoint> {
            if query.is_empty() {
                anyhow::bail!("Nothing found for an empty query");
            }
            Ok(self.center)
        }

        fn fetch(&self, _: GeoPoint, _: f64, _: &LayerSet) -> Result<Vec<Feature>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.features.clone())
        }
    }
}
