pub const DEFAULT_LOCATION: &str = "Old Town, Tallinn";
pub const DEFAULT_RADIUS: u32 = 1000;
pub const DEFAULT_CANVAS_WIDTH: u32 = 12;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 12;

pub(crate) const DEFAULT_DPI: f64 = 100.0;
pub(crate) const POINTS_PER_INCH: f64 = 72.0;
// Matches matplotlib's `patch.linewidth` and `hatch.linewidth`.
pub(crate) const DEFAULT_LINE_WIDTH: f64 = 1.0;
pub(crate) const HATCH_LINE_WIDTH: f64 = 1.0;
pub(crate) const HATCH_DENSITY: u32 = 6;
// Fraction of the shortest canvas side left empty around the map.
pub(crate) const CANVAS_MARGIN: f64 = 0.02;
pub(crate) const CANVAS_FACE_COLOR: &str = "#ffffff";

pub(crate) const DEFAULT_OVERPASS_URLS: [&str; 2] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];
pub(crate) const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub(crate) const DEFAULT_HTTP_TIMEOUT_S: u64 = 60;

pub(crate) const REQUIRED_CSV_COLUMNS: [&str; 6] = [
    "query",
    "zoom",
    "city",
    "location_code",
    "year",
    "output_path",
];

pub(crate) const OUTPUT_EXTENSION: &str = "png";

#[cfg(test)]
pub(crate) const TEST_RANDOM_INITIAL: u64 = 0;
#[cfg(test)]
pub(crate) const TEST_RANDOM_INCREMENT: u64 = 0x9E37_79B9_7F4A_7C15;
