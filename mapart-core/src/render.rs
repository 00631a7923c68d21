use crate::{
    algos::{Figure, layers::default_layers, styles::default_styles},
    config::RendererConfig,
    constants::OUTPUT_EXTENSION,
    plot::plot,
    sources::{FeatureSource, OverpassSource},
    types::RenderRequest,
};

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use tracing::{Level, event, span};
use uuid::Uuid;

/// Renders the requested map into the current directory with the settings
/// found in the environment. Prints and returns the name of the new file.
pub fn draw_map(request: &RenderRequest) -> Result<String> {
    let config = RendererConfig::from_env().context("Invalid renderer configuration")?;
    let source = OverpassSource::new(&config);
    let dir = std::env::current_dir().context("Couldn't resolve the current directory")?;

    render_and_report(
        &source,
        config.dpi,
        &dir,
        request,
        &mut std::io::stdout().lock(),
    )
}

/// Renders like [`render_to`], then writes the new file's name as a single
/// line to `out`.
pub fn render_and_report<S: FeatureSource + ?Sized, W: Write>(
    source: &S,
    dpi: f64,
    dir: &Path,
    request: &RenderRequest,
    out: &mut W,
) -> Result<String> {
    let filename = render_to(source, dpi, dir, request)?;

    writeln!(out, "{filename}").context("Couldn't report the rendered file")?;
    out.flush().context("Couldn't report the rendered file")?;

    Ok(filename)
}

/// Renders the requested map with features from `source` into a new PNG
/// file under `dir`, returning the file's name.
pub fn render_to<S: FeatureSource + ?Sized>(
    source: &S,
    dpi: f64,
    dir: &Path,
    request: &RenderRequest,
) -> Result<String> {
    let span = span!(Level::DEBUG, "render_map");
    let _guard = span.enter();

    let mut figure = Figure::new(request.width() as f64, request.height() as f64, dpi)?;

    let layers = default_layers()?;
    let styles = default_styles()?;

    plot(
        source,
        request.place(),
        request.radius(),
        &mut figure,
        &layers,
        &styles,
    )?;

    let filename = random_filename();
    figure.save_png(&dir.join(&filename))?;

    event!(
        tracing::Level::INFO,
        "Rendered {} within {}m into {}",
        request.place(),
        request.radius(),
        filename
    );

    Ok(filename)
}

// The first group of a random UUID, e.g. `1b4e28ba.png`.
fn random_filename() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}.{OUTPUT_EXTENSION}", &id[..8])
}
