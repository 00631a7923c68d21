use super::osm_filter::{FilterParseError, OsmFilter};
use crate::types::{Geometry, Tags};

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use serde::Serialize;

/// The named layers a map is made of. Variants are declared in the order
/// layers sharing a z-order are drawn in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    Perimeter,
    Green,
    Forest,
    Water,
    Parking,
    Streets,
    Building,
}

impl Display for Layer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Background => write!(f, "background"),
            Layer::Perimeter => write!(f, "perimeter"),
            Layer::Green => write!(f, "green"),
            Layer::Forest => write!(f, "forest"),
            Layer::Water => write!(f, "water"),
            Layer::Parking => write!(f, "parking"),
            Layer::Streets => write!(f, "streets"),
            Layer::Building => write!(f, "building"),
        }
    }
}

/// The accepted values of a tag key in a [LayerSelection].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Any,
    Exact(String),
    OneOf(Vec<String>),
}

impl TagValue {
    fn matches(&self, value: &str) -> bool {
        match self {
            TagValue::Any => true,
            TagValue::Exact(expected) => expected == value,
            TagValue::OneOf(values) => values.iter().any(|expected| expected == value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Areas,
    Lines,
}

/// What to fetch for a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSelection {
    // A feature is selected when any of these keys carries an accepted value.
    pub tags: BTreeMap<String, TagValue>,
    pub custom_filter: Option<OsmFilter>,
    // Half of the drawn stroke width, in metres, keyed by the `highway`
    // value of a line.
    pub width: BTreeMap<String, f64>,
    pub union: bool,
    pub geometry: GeometryKind,
}

impl Default for LayerSelection {
    fn default() -> Self {
        LayerSelection {
            tags: BTreeMap::new(),
            custom_filter: None,
            width: BTreeMap::new(),
            union: true,
            geometry: GeometryKind::Areas,
        }
    }
}

impl LayerSelection {
    /// Whether this layer needs features from the data source at all. The
    /// perimeter, for one, is derived from the query itself.
    pub fn is_fetched(&self) -> bool {
        !self.tags.is_empty() || self.custom_filter.is_some()
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        let by_tags = self.tags.iter().any(|(key, accepted)| {
            tags.get(key)
                .is_some_and(|value| accepted.matches(value))
        });

        by_tags
            || self
                .custom_filter
                .as_ref()
                .is_some_and(|filter| filter.matches(tags))
    }

    pub fn accepts(&self, geometry: &Geometry) -> bool {
        match self.geometry {
            GeometryKind::Areas => geometry.is_polygon(),
            GeometryKind::Lines => true,
        }
    }

    /// Half width of a line tagged `highway=<kind>`, defaulting to one metre.
    pub fn width_for(&self, tags: &Tags) -> f64 {
        tags.get("highway")
            .and_then(|kind| self.width.get(kind))
            .copied()
            .unwrap_or(1.0)
    }

    /// The Overpass QL statements fetching this layer around `around`,
    /// which must be an `(around:...)` clause.
    pub fn overpass_statements(&self, around: &str) -> Vec<String> {
        let mut statements = Vec::new();

        for (key, accepted) in &self.tags {
            let key = quote(key);
            let condition = match accepted {
                TagValue::Any => format!("[{key}]"),
                TagValue::Exact(value) => format!("[{key}={}]", quote(value)),
                TagValue::OneOf(values) => {
                    let alternatives = values
                        .iter()
                        .map(|value| regex::escape(value))
                        .collect::<Vec<_>>()
                        .join("|");
                    format!("[{key}~{}]", quote(&format!("^({alternatives})$")))
                }
            };

            statements.push(format!("way{condition}{around};"));
            statements.push(format!("relation{condition}{around};"));
        }

        if let Some(filter) = &self.custom_filter {
            statements.push(format!("way{filter}{around};"));
            if self.geometry == GeometryKind::Areas {
                statements.push(format!("relation{filter}{around};"));
            }
        }

        statements
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub type LayerSet = BTreeMap<Layer, LayerSelection>;

fn tags<const N: usize>(entries: [(&str, TagValue); N]) -> BTreeMap<String, TagValue> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn exact(value: &str) -> TagValue {
    TagValue::Exact(value.to_string())
}

fn one_of(values: &[&str]) -> TagValue {
    TagValue::OneOf(values.iter().map(ToString::to_string).collect())
}

/// The layers every map is drawn with.
pub fn default_layers() -> Result<LayerSet, FilterParseError> {
    let street_filter = concat!(
        r#"["highway"~"motorway|trunk|primary|"#,
        r#"secondary|tertiary|residential|service|"#,
        r#"unclassified|pedestrian|footway"]"#
    )
    .parse::<OsmFilter>()?;

    let street_widths = [
        ("motorway", 5.0),
        ("trunk", 5.0),
        ("primary", 4.5),
        ("secondary", 4.0),
        ("tertiary", 3.5),
        ("residential", 3.0),
        ("service", 2.0),
        ("unclassified", 2.0),
        ("pedestrian", 2.0),
        ("footway", 1.0),
    ]
    .into_iter()
    .map(|(kind, width)| (kind.to_string(), width))
    .collect();

    let mut layers = LayerSet::new();

    layers.insert(Layer::Perimeter, LayerSelection::default());
    layers.insert(
        Layer::Streets,
        LayerSelection {
            custom_filter: Some(street_filter),
            width: street_widths,
            geometry: GeometryKind::Lines,
            ..Default::default()
        },
    );
    layers.insert(
        Layer::Building,
        LayerSelection {
            tags: tags([
                ("building", TagValue::Any),
                ("landuse", exact("construction")),
            ]),
            union: false,
            ..Default::default()
        },
    );
    layers.insert(
        Layer::Water,
        LayerSelection {
            tags: tags([("natural", one_of(&["water", "bay"]))]),
            ..Default::default()
        },
    );
    layers.insert(
        Layer::Green,
        LayerSelection {
            tags: tags([
                ("landuse", exact("grass")),
                ("natural", one_of(&["island", "wood"])),
                ("leisure", exact("park")),
            ]),
            ..Default::default()
        },
    );
    layers.insert(
        Layer::Forest,
        LayerSelection {
            tags: tags([("landuse", exact("forest"))]),
            ..Default::default()
        },
    );
    layers.insert(
        Layer::Parking,
        LayerSelection {
            tags: tags([
                ("amenity", exact("parking")),
                ("highway", exact("pedestrian")),
                ("man_made", exact("pier")),
            ]),
            ..Default::default()
        },
    );

    Ok(layers)
}
