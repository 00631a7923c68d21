mod figure;
mod hatch;

pub use figure::Figure;

use super::{
    RngHandler,
    geometry::LocalProjection,
    layers::{Layer, LayerSet},
    styles::{LayerStyle, StyleSet},
};
use crate::{
    constants::{CANVAS_MARGIN, DEFAULT_LINE_WIDTH, HATCH_LINE_WIDTH},
    plot::MapBackup,
    types::{Feature, GeoPoint, Geometry, Point},
};

use hatch::{fmt, hatch_pattern};
use rand::Rng;
use svg::{
    Node,
    node::element::{Circle, ClipPath, Group, Path, path::Data},
};
use tracing::event;

const PERIMETER_CLIP_ID: &str = "perimeter-clip";
const CIRCLE_SEGMENTS: usize = 256;

// Maps the local metric plane onto the canvas, north up, fitting a square
// of `2 * radius` metres into the shortest side.
struct ViewTransform {
    center_x: f64,
    center_y: f64,
    scale: f64,
}

impl ViewTransform {
    fn fit(figure: &Figure, radius: f64) -> Self {
        let width = figure.width_px() as f64;
        let height = figure.height_px() as f64;
        let usable = width.min(height) * (1.0 - 2.0 * CANVAS_MARGIN);

        ViewTransform {
            center_x: width / 2.0,
            center_y: height / 2.0,
            scale: usable / (2.0 * radius),
        }
    }

    fn apply(&self, point: Point) -> (f32, f32) {
        (
            (self.center_x + point.x * self.scale) as f32,
            (self.center_y - point.y * self.scale) as f32,
        )
    }

    fn length(&self, metres: f64) -> f64 {
        metres * self.scale
    }
}

fn hatch_id(layer: Layer) -> String {
    format!("hatch-{layer}")
}

fn ring_data(data: Data, ring: &[(f32, f32)]) -> Data {
    let Some((first, rest)) = ring.split_first() else {
        return data;
    };

    rest.iter()
        .fold(data.move_to(*first), |data, point| data.line_to(*point))
        .close()
}

fn pick_color<'s>(style: &'s LayerStyle, rng: &mut impl Rng) -> Option<&'s str> {
    (!style.palette.is_empty())
        .then(|| style.palette[rng.random_range(0..style.palette.len())].as_str())
}

/// The shapes painting one area: fill, hatch and edge, in that order.
#[derive(Default)]
struct AreaShape {
    fill: Option<Box<dyn Node>>,
    hatch: Option<Box<dyn Node>>,
    edge: Option<Box<dyn Node>>,
}

impl AreaShape {
    fn into_nodes(self) -> Vec<Box<dyn Node>> {
        self.fill
            .into_iter()
            .chain(self.hatch)
            .chain(self.edge)
            .collect()
    }

    // Paints every fill before any edge, so overlapping areas do not cover
    // each other's outlines. Edges shared by adjacent areas are still
    // stroked, unlike a true geometric union.
    fn merge(shapes: Vec<AreaShape>) -> Vec<Box<dyn Node>> {
        let mut fills = Vec::new();
        let mut hatches = Vec::new();
        let mut edges = Vec::new();

        for shape in shapes {
            fills.extend(shape.fill);
            hatches.extend(shape.hatch);
            edges.extend(shape.edge);
        }

        fills.into_iter().chain(hatches).chain(edges).collect()
    }
}

pub(crate) struct MapDrawer<'a> {
    figure: &'a mut Figure,
    projection: LocalProjection,
    view: ViewTransform,
    radius: f64,
}

impl<'a> MapDrawer<'a> {
    pub fn new(figure: &'a mut Figure, center: GeoPoint, radius: f64) -> Self {
        let view = ViewTransform::fit(figure, radius);

        MapDrawer {
            figure,
            projection: LocalProjection::new(center),
            view,
            radius,
        }
    }

    /// Paints every styled layer of `backup` in ascending z-order. All but
    /// the background are clipped to the perimeter.
    pub fn draw(&mut self, backup: &MapBackup, layers: &LayerSet, styles: &StyleSet) {
        self.figure.add_definition(
            ClipPath::new()
                .set("id", PERIMETER_CLIP_ID)
                .add(self.perimeter_circle()),
        );

        let mut ordered = styles.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|(layer, style)| (style.zorder, **layer));

        let mut rng = RngHandler::rng();
        let no_features = Vec::new();

        for (layer, style) in ordered {
            let layer = *layer;

            if let (Some(hatch), Some(color)) = (&style.hatch, style.hatch_color()) {
                let pattern = hatch_pattern(
                    &hatch_id(layer),
                    hatch,
                    color,
                    self.figure.dpi(),
                    self.figure.points_to_px(HATCH_LINE_WIDTH),
                );
                self.figure.add_definition(pattern);
            }

            let features = backup.layers.get(&layer).unwrap_or(&no_features);

            let nodes = match layer {
                Layer::Background => self
                    .paint_area(layer, style, self.background_data(), None)
                    .into_nodes(),
                Layer::Perimeter => self
                    .paint_area(layer, style, self.perimeter_data(), None)
                    .into_nodes(),
                Layer::Streets => {
                    let selection = layers.get(&layer);
                    features
                        .iter()
                        .flat_map(|feature| {
                            let half_width = selection
                                .map(|selection| selection.width_for(&feature.tags))
                                .unwrap_or(1.0);
                            self.paint_line(style, feature, half_width)
                        })
                        .collect()
                }
                _ => {
                    let union = layers.get(&layer).is_none_or(|selection| selection.union);
                    let layer_fill = pick_color(style, &mut rng);

                    let shapes = features
                        .iter()
                        .filter_map(|feature| {
                            let fill = if union {
                                layer_fill
                            } else {
                                pick_color(style, &mut rng)
                            };
                            self.polygon_data(feature)
                                .map(|data| self.paint_area(layer, style, data, fill))
                        })
                        .collect::<Vec<_>>();

                    if union {
                        AreaShape::merge(shapes)
                    } else {
                        shapes.into_iter().flat_map(AreaShape::into_nodes).collect()
                    }
                }
            };

            if nodes.is_empty() {
                continue;
            }

            event!(
                tracing::Level::DEBUG,
                "Drawing layer {} with {} features and {} nodes",
                layer,
                features.len(),
                nodes.len()
            );

            let group = nodes
                .into_iter()
                .fold(Group::new().set("id", layer.to_string()), |group, node| {
                    group.add(node)
                });

            if layer == Layer::Background {
                self.figure.add(group);
            } else {
                self.figure
                    .add(group.set("clip-path", format!("url(#{PERIMETER_CLIP_ID})")));
            }
        }
    }

    fn perimeter_circle(&self) -> Circle {
        let (cx, cy) = self.view.apply(Point::new(0.0, 0.0));

        Circle::new()
            .set("cx", fmt(cx as f64))
            .set("cy", fmt(cy as f64))
            .set("r", fmt(self.view.length(self.radius)))
    }

    fn perimeter_data(&self) -> Data {
        let ring = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                self.view.apply(Point::new(
                    self.radius * angle.cos(),
                    self.radius * angle.sin(),
                ))
            })
            .collect::<Vec<_>>();

        ring_data(Data::new(), &ring)
    }

    fn background_data(&self) -> Data {
        let r = self.radius;
        let ring = [(-r, -r), (r, -r), (r, r), (-r, r)]
            .into_iter()
            .map(|(x, y)| self.view.apply(Point::new(x, y)))
            .collect::<Vec<_>>();

        ring_data(Data::new(), &ring)
    }

    fn project(&self, points: &[GeoPoint]) -> Vec<(f32, f32)> {
        self.projection
            .project_all(points)
            .into_iter()
            .map(|point| self.view.apply(point))
            .collect()
    }

    fn polygon_data(&self, feature: &Feature) -> Option<Data> {
        let Geometry::Polygon { exterior, holes } = &feature.geometry else {
            return None;
        };

        if exterior.len() < 3 {
            return None;
        }

        let data = std::iter::once(exterior)
            .chain(holes.iter())
            .filter(|ring| ring.len() >= 3)
            .fold(Data::new(), |data, ring| ring_data(data, &self.project(ring)));

        Some(data)
    }

    fn paint_area(
        &self,
        layer: Layer,
        style: &LayerStyle,
        data: Data,
        fill: Option<&str>,
    ) -> AreaShape {
        let mut shape = AreaShape::default();

        if let Some(fill) = fill.or(style.fill.as_deref()) {
            shape.fill = Some(
                Path::new()
                    .set("d", data.clone())
                    .set("fill", fill)
                    .set("fill-opacity", fmt(style.alpha.unwrap_or(1.0)))
                    .set("fill-rule", "evenodd")
                    .set("stroke", "none")
                    .into(),
            );
        }

        if style.hatch.is_some() && style.hatch_color().is_some() {
            shape.hatch = Some(
                Path::new()
                    .set("d", data.clone())
                    .set("fill", format!("url(#{})", hatch_id(layer)))
                    .set("fill-rule", "evenodd")
                    .set("stroke", "none")
                    .into(),
            );
        }

        let line_width = style.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
        if let Some(edge) = style.edge.as_deref().filter(|_| line_width > 0.0) {
            shape.edge = Some(
                Path::new()
                    .set("d", data)
                    .set("fill", "none")
                    .set("stroke", edge)
                    .set("stroke-width", fmt(self.figure.points_to_px(line_width)))
                    .set("stroke-linejoin", "round")
                    .into(),
            );
        }

        shape
    }

    // Lines are drawn as round-capped strokes `2 * half_width` metres wide,
    // with the edge as a wider stroke underneath.
    fn paint_line(&self, style: &LayerStyle, feature: &Feature, half_width: f64) -> Vec<Box<dyn Node>> {
        let mut nodes: Vec<Box<dyn Node>> = Vec::new();

        let points = self.project(&feature.geometry.outline());
        let Some((first, rest)) = points.split_first() else {
            return nodes;
        };
        if rest.is_empty() {
            return nodes;
        }

        let data = rest
            .iter()
            .fold(Data::new().move_to(*first), |data, point| data.line_to(*point));

        let width = self.view.length(2.0 * half_width);
        let alpha = fmt(style.alpha.unwrap_or(1.0));

        let line_width = style.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
        if let Some(edge) = style.edge.as_deref().filter(|_| line_width > 0.0) {
            let edge_width = width + 2.0 * self.figure.points_to_px(line_width);
            nodes.push(
                Path::new()
                    .set("d", data.clone())
                    .set("fill", "none")
                    .set("stroke", edge)
                    .set("stroke-opacity", alpha.clone())
                    .set("stroke-width", fmt(edge_width))
                    .set("stroke-linecap", "round")
                    .set("stroke-linejoin", "round")
                    .into(),
            );
        }

        if let Some(fill) = style.fill.as_deref() {
            nodes.push(
                Path::new()
                    .set("d", data)
                    .set("fill", "none")
                    .set("stroke", fill)
                    .set("stroke-opacity", alpha)
                    .set("stroke-width", fmt(width))
                    .set("stroke-linecap", "round")
                    .set("stroke-linejoin", "round")
                    .into(),
            );
        }

        nodes
    }
}
