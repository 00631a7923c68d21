mod algos;
mod config;
mod constants;
mod loader;
mod plot;
mod render;
mod sources;
mod types;

pub use algos::{
    Figure,
    layers::{GeometryKind, Layer, LayerSelection, LayerSet, TagValue, default_layers},
    osm_filter::{FilterParseError, OsmFilter},
    styles::{Hatch, HatchMark, LayerStyle, StyleError, StyleSet, default_styles, validate_styles},
};
pub use config::RendererConfig;
pub use constants::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_LOCATION, DEFAULT_RADIUS,
};
pub use loader::{LoadError, MapQuery, read_locations_file};
pub use plot::{MapBackup, plot};
pub use render::{draw_map, render_and_report, render_to};
pub use sources::{FeatureSource, OverpassSource};
pub use types::{
    DimensionCannotBeZeroError, Feature, GeoPoint, Geometry, Place, RenderRequest, Tags,
};
