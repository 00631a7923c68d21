use super::layers::Layer;

use std::{collections::BTreeMap, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("Invalid color {color:?} for layer {layer}")]
    InvalidColor { layer: Layer, color: String },
    #[error("Unknown hatch symbol {0:?}")]
    InvalidHatch(char),
    #[error("Alpha of layer {0} must be between 0 and 1")]
    InvalidAlpha(Layer),
    #[error("Line width of layer {0} must be a non-negative number")]
    InvalidLineWidth(Layer),
}

/// One of the marks a hatch pattern is made of, in matplotlib notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HatchMark {
    // `/`
    NorthEast,
    // `\`
    SouthEast,
    // `|`
    Vertical,
    // `-`
    Horizontal,
    // `+`
    Cross,
    // `x`
    DiagonalCross,
    // `o`
    SmallCircle,
    // `O`
    LargeCircle,
    // `.`
    Dot,
    // `*`
    Star,
}

impl TryFrom<char> for HatchMark {
    type Error = StyleError;

    fn try_from(symbol: char) -> Result<Self, Self::Error> {
        Ok(match symbol {
            '/' => HatchMark::NorthEast,
            '\\' => HatchMark::SouthEast,
            '|' => HatchMark::Vertical,
            '-' => HatchMark::Horizontal,
            '+' => HatchMark::Cross,
            'x' | 'X' => HatchMark::DiagonalCross,
            'o' => HatchMark::SmallCircle,
            'O' => HatchMark::LargeCircle,
            '.' => HatchMark::Dot,
            '*' => HatchMark::Star,
            other => return Err(StyleError::InvalidHatch(other)),
        })
    }
}

/// A hatch pattern such as `ooo...`. Repeating a symbol makes its marks
/// denser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hatch {
    pattern: String,
    marks: BTreeMap<HatchMark, u32>,
}

impl Hatch {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// How many times `mark` was repeated in the pattern.
    pub fn count(&self, mark: HatchMark) -> u32 {
        self.marks.get(&mark).copied().unwrap_or(0)
    }

    pub fn iter_marks(&self) -> impl Iterator<Item = (HatchMark, u32)> + '_ {
        self.marks.iter().map(|(mark, count)| (*mark, *count))
    }
}

impl FromStr for Hatch {
    type Err = StyleError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let mut marks = BTreeMap::new();

        for symbol in pattern.chars() {
            *marks.entry(HatchMark::try_from(symbol)?).or_insert(0) += 1;
        }

        Ok(Hatch {
            pattern: pattern.to_string(),
            marks,
        })
    }
}

/// How a layer is drawn. Colors are CSS colors, line widths are in points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerStyle {
    pub fill: Option<String>,
    pub edge: Option<String>,
    pub hatch: Option<Hatch>,
    // Defaults to the edge color.
    pub hatch_color: Option<String>,
    pub line_width: Option<f64>,
    pub alpha: Option<f64>,
    pub zorder: i32,
    // When set, each feature gets one of these instead of `fill`.
    pub palette: Vec<String>,
}

impl LayerStyle {
    fn validate(&self, layer: Layer) -> Result<(), StyleError> {
        let colors = self
            .fill
            .iter()
            .chain(self.edge.iter())
            .chain(self.hatch_color.iter())
            .chain(self.palette.iter());

        for color in colors {
            if csscolorparser::parse(color).is_err() {
                return Err(StyleError::InvalidColor {
                    layer,
                    color: color.clone(),
                });
            }
        }

        if self.alpha.is_some_and(|alpha| !(0.0..=1.0).contains(&alpha)) {
            return Err(StyleError::InvalidAlpha(layer));
        }

        if self
            .line_width
            .is_some_and(|width| !(width.is_finite() && width >= 0.0))
        {
            return Err(StyleError::InvalidLineWidth(layer));
        }

        Ok(())
    }

    pub fn hatch_color(&self) -> Option<&str> {
        self.hatch_color.as_deref().or(self.edge.as_deref())
    }
}

pub type StyleSet = BTreeMap<Layer, LayerStyle>;

pub fn validate_styles(styles: &StyleSet) -> Result<(), StyleError> {
    styles
        .iter()
        .try_for_each(|(layer, style)| style.validate(*layer))
}

fn color(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// The styles every map is drawn with.
pub fn default_styles() -> Result<StyleSet, StyleError> {
    let dotted: Hatch = "ooo...".parse()?;

    let mut styles = StyleSet::new();

    styles.insert(
        Layer::Background,
        LayerStyle {
            fill: color("#F2F4CB"),
            edge: color("#dadbc1"),
            hatch: Some(dotted.clone()),
            zorder: -1,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Perimeter,
        LayerStyle {
            fill: color("#F2F4CB"),
            edge: color("#dadbc1"),
            line_width: Some(0.0),
            hatch: Some(dotted.clone()),
            zorder: 0,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Green,
        LayerStyle {
            fill: color("#D0F1BF"),
            edge: color("#2F3737"),
            line_width: Some(1.0),
            zorder: 1,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Forest,
        LayerStyle {
            fill: color("#64B96A"),
            edge: color("#2F3737"),
            line_width: Some(1.0),
            zorder: 1,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Water,
        LayerStyle {
            fill: color("#a1e3ff"),
            edge: color("#2F3737"),
            hatch: Some(dotted),
            hatch_color: color("#85c9e6"),
            line_width: Some(1.0),
            zorder: 2,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Parking,
        LayerStyle {
            fill: color("#F2F4CB"),
            edge: color("#2F3737"),
            line_width: Some(1.0),
            zorder: 3,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Streets,
        LayerStyle {
            fill: color("#2F3737"),
            edge: color("#475657"),
            alpha: Some(1.0),
            line_width: Some(0.0),
            zorder: 3,
            ..Default::default()
        },
    );
    styles.insert(
        Layer::Building,
        LayerStyle {
            palette: vec![
                "#FFC857".to_string(),
                "#E9724C".to_string(),
                "#C5283D".to_string(),
            ],
            edge: color("#2F3737"),
            line_width: Some(0.5),
            zorder: 4,
            ..Default::default()
        },
    );

    validate_styles(&styles)?;

    Ok(styles)
}
