use crate::{
    algos::styles::{Hatch, HatchMark},
    constants::HATCH_DENSITY,
};

use svg::node::element::{Circle, Path, Pattern, path::Data};

/// Builds an SVG pattern tile painting `hatch` in `color`, laid out the way
/// matplotlib lays out hatches: a tile is one inch wide and each repeated
/// symbol adds `HATCH_DENSITY` rows of marks to it.
pub(super) fn hatch_pattern(
    id: &str,
    hatch: &Hatch,
    color: &str,
    tile_px: f64,
    line_width_px: f64,
) -> Pattern {
    let mut pattern = Pattern::new()
        .set("id", id)
        .set("patternUnits", "userSpaceOnUse")
        .set("x", "0")
        .set("y", "0")
        .set("width", fmt(tile_px))
        .set("height", fmt(tile_px));

    let row_count = |marks: &[HatchMark]| -> u32 {
        marks.iter().map(|mark| hatch.count(*mark)).sum::<u32>() * HATCH_DENSITY
    };

    let mut lines = Data::new();

    let horizontal = row_count(&[HatchMark::Horizontal, HatchMark::Cross]);
    for i in 0..=horizontal {
        let y = tile_px * i as f64 / horizontal.max(1) as f64;
        if horizontal > 0 {
            lines = lines
                .move_to((0.0_f32, y as f32))
                .line_to((tile_px as f32, y as f32));
        }
    }

    let vertical = row_count(&[HatchMark::Vertical, HatchMark::Cross]);
    for i in 0..=vertical {
        let x = tile_px * i as f64 / vertical.max(1) as f64;
        if vertical > 0 {
            lines = lines
                .move_to((x as f32, 0.0_f32))
                .line_to((x as f32, tile_px as f32));
        }
    }

    // Diagonals run across the tile edges, so offsets start one tile to the
    // left to keep the tiling seamless.
    let north_east = row_count(&[HatchMark::NorthEast, HatchMark::DiagonalCross]) as i64;
    for i in -north_east..=north_east {
        if north_east > 0 {
            let x = tile_px * i as f64 / north_east as f64;
            lines = lines
                .move_to((x as f32, tile_px as f32))
                .line_to(((x + tile_px) as f32, 0.0_f32));
        }
    }

    let south_east = row_count(&[HatchMark::SouthEast, HatchMark::DiagonalCross]) as i64;
    for i in -south_east..=south_east {
        if south_east > 0 {
            let x = tile_px * i as f64 / south_east as f64;
            lines = lines
                .move_to((x as f32, 0.0_f32))
                .line_to(((x + tile_px) as f32, tile_px as f32));
        }
    }

    if horizontal + vertical > 0 || north_east + south_east > 0 {
        pattern = pattern.add(
            Path::new()
                .set("d", lines)
                .set("fill", "none")
                .set("stroke", color)
                .set("stroke-width", fmt(line_width_px)),
        );
    }

    for (mark, size, filled) in [
        (HatchMark::SmallCircle, 0.2, false),
        (HatchMark::LargeCircle, 0.35, false),
        (HatchMark::Dot, 0.1, true),
    ] {
        let rows = row_count(&[mark]);
        for (x, y) in shape_offsets(rows) {
            let circle = Circle::new()
                .set("cx", fmt(x * tile_px))
                .set("cy", fmt(y * tile_px))
                .set("r", fmt(size * tile_px / rows as f64));

            pattern = if filled {
                pattern.add(circle.set("fill", color))
            } else {
                pattern.add(
                    circle
                        .set("fill", "none")
                        .set("stroke", color)
                        .set("stroke-width", fmt(line_width_px)),
                )
            };
        }
    }

    let star_rows = row_count(&[HatchMark::Star]);
    if star_rows > 0 {
        let radius = tile_px / 3.0 / star_rows as f64;
        let stars = shape_offsets(star_rows)
            .into_iter()
            .fold(Data::new(), |data, (x, y)| {
                star(data, x * tile_px, y * tile_px, radius)
            });

        pattern = pattern.add(Path::new().set("d", stars).set("fill", color));
    }

    pattern
}

/// Centers of the shapes of a hatch with `rows` rows, as fractions of the
/// tile. Odd rows are shifted by half a column.
fn shape_offsets(rows: u32) -> Vec<(f64, f64)> {
    if rows == 0 {
        return Vec::new();
    }

    let step = 1.0 / rows as f64;
    let mut offsets = Vec::new();

    for row in 0..=rows {
        let y = row as f64 * step;
        if row % 2 == 0 {
            offsets.extend((0..=rows).map(|col| (col as f64 * step, y)));
        } else {
            offsets.extend((0..rows).map(|col| ((col as f64 + 0.5) * step, y)));
        }
    }

    offsets
}

fn star(mut data: Data, cx: f64, cy: f64, radius: f64) -> Data {
    let inner = radius * 0.382;

    for i in 0..10 {
        let r = if i % 2 == 0 { radius } else { inner };
        let angle = std::f64::consts::PI * (i as f64 / 5.0) - std::f64::consts::FRAC_PI_2;
        let point = ((cx + r * angle.cos()) as f32, (cy + r * angle.sin()) as f32);

        data = if i == 0 {
            data.move_to(point)
        } else {
            data.line_to(point)
        };
    }

    data.close()
}

pub(super) fn fmt(value: f64) -> String {
    format!("{value:.2}")
}
