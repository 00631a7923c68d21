use crate::{
    algos::{
        Figure, MapDrawer,
        layers::{Layer, LayerSet},
        styles::{StyleSet, validate_styles},
    },
    sources::FeatureSource,
    types::{Feature, GeoPoint, Place},
};

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{Level, event, span};

/// The geometry a map was drawn from, grouped by the layer it was drawn in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBackup {
    pub center: GeoPoint,
    pub radius: f64,
    pub layers: BTreeMap<Layer, Vec<Feature>>,
}

impl MapBackup {
    pub fn features(&self, layer: Layer) -> &[Feature] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn feature_count(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    /// The backup as JSON, layers keyed by name and geometries tagged by kind.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Couldn't serialize the map backup")
    }
}

/// Draws the map of everything within `radius` metres of `place` on
/// `figure`.
pub fn plot<S: FeatureSource + ?Sized>(
    source: &S,
    place: &Place,
    radius: u32,
    figure: &mut Figure,
    layers: &LayerSet,
    styles: &StyleSet,
) -> Result<MapBackup> {
    let span = span!(Level::DEBUG, "plot");
    let _guard = span.enter();

    validate_styles(styles)?;

    if radius == 0 {
        anyhow::bail!("Radius must be greater than zero");
    }
    let radius = radius as f64;

    let plot_start = std::time::Instant::now();

    let center = match place {
        Place::Coordinates(point) => *point,
        Place::Query(query) => source
            .geocode(query)
            .with_context(|| format!("Failed to locate {query:?}"))?,
    };

    let geocoded_time = std::time::Instant::now();
    event!(
        tracing::Level::DEBUG,
        "Located {} at {} in {}ms",
        place,
        center,
        geocoded_time.duration_since(plot_start).as_millis()
    );

    let features = if layers.values().any(|selection| selection.is_fetched()) {
        source
            .fetch(center, radius, layers)
            .with_context(|| format!("Failed to fetch map features around {place}"))?
    } else {
        Vec::new()
    };

    let fetched_time = std::time::Instant::now();
    event!(
        tracing::Level::DEBUG,
        "Fetched {} features in {}ms",
        features.len(),
        fetched_time.duration_since(geocoded_time).as_millis()
    );

    let backup = MapBackup {
        center,
        radius,
        layers: classify(features, layers),
    };

    MapDrawer::new(figure, center, radius).draw(&backup, layers, styles);

    event!(
        tracing::Level::DEBUG,
        "Drew {} features in {}ms",
        backup.feature_count(),
        fetched_time.elapsed().as_millis()
    );

    Ok(backup)
}

// A feature lands in every layer that selects it.
fn classify(features: Vec<Feature>, layers: &LayerSet) -> BTreeMap<Layer, Vec<Feature>> {
    let mut grouped: BTreeMap<Layer, Vec<Feature>> = BTreeMap::new();

    let fetched = layers
        .iter()
        .filter(|(_, selection)| selection.is_fetched())
        .collect::<Vec<_>>();

    for feature in features {
        for (layer, selection) in &fetched {
            if selection.matches(&feature.tags) && selection.accepts(&feature.geometry) {
                grouped.entry(**layer).or_default().push(feature.clone());
            }
        }
    }

    grouped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        algos::{layers::default_layers, styles::default_styles},
        sources::fixture::StaticSource,
    };

    fn plot_old_town(place: &Place) -> Result<(MapBackup, String)> {
        let source = StaticSource::old_town();
        let mut figure = Figure::new(4.0, 4.0, 50.0)?;

        let backup = plot(
            &source,
            place,
            300,
            &mut figure,
            &default_layers()?,
            &default_styles()?,
        )?;

        Ok((backup, figure.into_document().to_string()))
    }

    #[test]
    fn test_plot_classifies_features() {
        let (backup, document) = plot_old_town(&Place::from("Old Town, Tallinn")).unwrap();

        assert_eq!(backup.radius, 300.0);
        assert!(backup.center.same_as(&GeoPoint::new(59.437, 24.745)));

        // The open building footprint is dropped
        let buildings = backup.features(Layer::Building);
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].id, 1);

        assert_eq!(backup.features(Layer::Green).len(), 1);
        assert!(backup.features(Layer::Water).is_empty());

        // Cycleways are not part of the street filter
        let streets = backup.features(Layer::Streets);
        assert_eq!(streets.len(), 1);
        assert_eq!(streets[0].id, 3);

        assert_eq!(backup.feature_count(), 3);

        for layer in ["background", "perimeter", "green", "streets", "building"] {
            assert!(document.contains(&format!(r#"id="{layer}""#)));
        }
    }

    #[test]
    fn test_backup_serializes_to_json() {
        let (backup, _) = plot_old_town(&Place::from("Old Town, Tallinn")).unwrap();

        let json: serde_json::Value = serde_json::from_str(&backup.to_json().unwrap()).unwrap();

        assert_eq!(json["radius"], 300.0);
        assert_eq!(json["center"]["lat"], 59.437);

        let layers = json["layers"].as_object().unwrap();
        let mut names = layers.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(names, vec!["building", "green", "streets"]);

        assert_eq!(layers["building"][0]["id"], 1);
        assert_eq!(layers["building"][0]["geometry"]["type"], "polygon");
        assert_eq!(layers["streets"][0]["geometry"]["type"], "line_string");
        assert_eq!(layers["streets"][0]["tags"]["highway"], "residential");
    }

    #[test]
    fn test_plot_skips_geocoding_coordinates() {
        let (backup, _) = plot_old_town(&Place::from("59.5, 24.8")).unwrap();

        assert!(backup.center.same_as(&GeoPoint::new(59.5, 24.8)));
    }

    #[test]
    fn test_plot_reports_unknown_places() {
        let error = plot_old_town(&Place::from("")).unwrap_err();

        assert!(format!("{error:#}").contains("Failed to locate"));
    }

    #[test]
    fn test_plot_rejects_invalid_styles() {
        let source = StaticSource::old_town();
        let mut figure = Figure::new(1.0, 1.0, 50.0).unwrap();
        let mut styles = default_styles().unwrap();
        styles.get_mut(&Layer::Water).unwrap().edge = Some("not a color".to_string());

        let result = plot(
            &source,
            &Place::from("Old Town"),
            100,
            &mut figure,
            &default_layers().unwrap(),
            &styles,
        );

        assert!(result.is_err());
        assert_eq!(source.fetches.get(), 0);
    }

    #[test]
    fn test_plot_without_fetched_layers() {
        let source = StaticSource::old_town();
        let mut figure = Figure::new(1.0, 1.0, 50.0).unwrap();
        let mut layers = default_layers().unwrap();
        layers.retain(|layer, _| *layer == Layer::Perimeter);

        let backup = plot(
            &source,
            &Place::from("Old Town"),
            100,
            &mut figure,
            &layers,
            &default_styles().unwrap(),
        )
        .unwrap();

        assert_eq!(backup.feature_count(), 0);
        assert_eq!(source.fetches.get(), 0);
    }
}
