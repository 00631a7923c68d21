use crate::constants::{CANVAS_FACE_COLOR, POINTS_PER_INCH};

use std::path::Path;

use anyhow::{Context, Result};
use svg::{
    Document, Node,
    node::element::{Definitions, Rectangle},
};
use tracing::event;

// Keeps a mistyped canvas size from allocating gigabytes of pixels.
const MAX_CANVAS_PX: u32 = 16_384;

/// A drawing surface of a fixed physical size. Nodes are added in paint
/// order; the figure is consumed when it is rasterised.
#[derive(Debug)]
pub struct Figure {
    width_px: u32,
    height_px: u32,
    dpi: f64,
    definitions: Vec<Box<dyn Node>>,
    nodes: Vec<Box<dyn Node>>,
}

impl Figure {
    pub fn new(width_in: f64, height_in: f64, dpi: f64) -> Result<Self> {
        if !(width_in > 0.0 && height_in > 0.0 && dpi > 0.0) {
            anyhow::bail!(
                "Figure size and resolution must be positive, got {width_in}x{height_in} in at {dpi} dpi"
            );
        }

        let width_px = (width_in * dpi).round();
        let height_px = (height_in * dpi).round();

        if width_px < 1.0
            || height_px < 1.0
            || width_px > MAX_CANVAS_PX as f64
            || height_px > MAX_CANVAS_PX as f64
        {
            anyhow::bail!(
                "Figure of {width_px}x{height_px} pixels is outside of 1..={MAX_CANVAS_PX}"
            );
        }

        Ok(Figure {
            width_px: width_px as u32,
            height_px: height_px as u32,
            dpi,
            definitions: Vec::new(),
            nodes: Vec::new(),
        })
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Converts a length in points (1/72 inch) into pixels.
    pub fn points_to_px(&self, points: f64) -> f64 {
        points * self.dpi / POINTS_PER_INCH
    }

    pub(crate) fn add_definition<T: Into<Box<dyn Node>>>(&mut self, node: T) {
        self.definitions.push(node.into());
    }

    pub(crate) fn add<T: Into<Box<dyn Node>>>(&mut self, node: T) {
        self.nodes.push(node.into());
    }

    pub fn into_document(self) -> Document {
        let definitions = self
            .definitions
            .into_iter()
            .fold(Definitions::new(), |defs, node| defs.add(node));

        let face = Rectangle::new()
            .set("x", "0")
            .set("y", "0")
            .set("width", self.width_px.to_string())
            .set("height", self.height_px.to_string())
            .set("fill", CANVAS_FACE_COLOR);

        let document = Document::new()
            .set("width", self.width_px.to_string())
            .set("height", self.height_px.to_string())
            .set(
                "viewBox",
                format!("0 0 {} {}", self.width_px, self.height_px),
            )
            .add(definitions)
            .add(face);

        self.nodes
            .into_iter()
            .fold(document, |document, node| document.add(node))
    }

    /// Rasterises the figure and writes it as a PNG file.
    pub fn save_png(self, path: &Path) -> Result<()> {
        let (width, height) = (self.width_px, self.height_px);
        let svg_text = self.into_document().to_string();

        let tree = usvg::Tree::from_str(&svg_text, &usvg::Options::default())
            .context("Failed to parse the drawn figure")?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .with_context(|| format!("Couldn't create a {width}x{height} pixmap"))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        pixmap
            .save_png(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        event!(
            tracing::Level::DEBUG,
            "Saved {}x{} figure to {}",
            width,
            height,
            path.display()
        );

        Ok(())
    }
}
