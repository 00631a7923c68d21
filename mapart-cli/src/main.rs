use mapart_core::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_LOCATION, DEFAULT_RADIUS,
    RenderRequest, draw_map,
};

use anyhow::Result;
use clap::Parser;
use tracing::Level;

const LOG_LEVEL_VAR: &str = "MAPART_LOG";

#[derive(Parser, Debug)]
#[command(version, about = "Renders a stylized map of a place as a PNG", long_about = None)]
struct Args {
    /// Place to draw, either a name to look up or `lat,lon`
    #[arg(short, long, default_value = DEFAULT_LOCATION)]
    location: String,

    /// Distance in metres from the place to the edge of the map
    #[arg(short, long, default_value_t = DEFAULT_RADIUS)]
    radius: u32,

    /// Canvas width in inches
    #[arg(short = 'W', long, default_value_t = DEFAULT_CANVAS_WIDTH)]
    width: u32,

    /// Canvas height in inches
    #[arg(short = 'H', long, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    height: u32,
}

fn log_level() -> Level {
    std::env::var(LOG_LEVEL_VAR)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(Level::WARN)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Stdout only carries the name of the rendered file.
    tracing_subscriber::fmt()
        .with_max_level(log_level())
        .with_writer(std::io::stderr)
        .init();

    let request = RenderRequest::new(&args.location, args.radius, args.width, args.height)?;

    draw_map(&request)?;

    Ok(())
}
