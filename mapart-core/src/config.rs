use crate::constants::{
    DEFAULT_DPI, DEFAULT_HTTP_TIMEOUT_S, DEFAULT_NOMINATIM_URL, DEFAULT_OVERPASS_URLS,
};

use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

const OVERPASS_URLS: &str = "MAPART_OVERPASS_URLS";
const NOMINATIM_URL: &str = "MAPART_NOMINATIM_URL";
const USER_AGENT: &str = "MAPART_USER_AGENT";
const HTTP_TIMEOUT_S: &str = "MAPART_HTTP_TIMEOUT_S";
const DPI: &str = "MAPART_DPI";
const DISABLE_CACHE: &str = "MAPART_DISABLE_CACHE";
const CACHE_DIR: &str = "MAPART_CACHE_DIR";

/// Runtime settings of the renderer, read from `MAPART_*` environment
/// variables.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub overpass_urls: Vec<String>,
    pub nominatim_url: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub dpi: f64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            overpass_urls: DEFAULT_OVERPASS_URLS
                .iter()
                .map(ToString::to_string)
                .collect(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: default_user_agent(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_S),
            dpi: DEFAULT_DPI,
            cache_dir: Some(default_cache_dir()),
        }
    }
}

impl RendererConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let overpass_urls = lookup(OVERPASS_URLS)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty())
            .unwrap_or(defaults.overpass_urls);

        let nominatim_url = lookup(NOMINATIM_URL).unwrap_or(defaults.nominatim_url);
        let user_agent = lookup(USER_AGENT).unwrap_or(defaults.user_agent);

        let http_timeout = parse_var::<u64>(&lookup, HTTP_TIMEOUT_S)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let dpi = parse_var::<f64>(&lookup, DPI)?.unwrap_or(defaults.dpi);
        if !(dpi.is_finite() && dpi > 0.0) {
            anyhow::bail!("{DPI} must be a positive number, got {dpi}");
        }

        let cache_disabled = lookup(DISABLE_CACHE)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        let cache_dir = if cache_disabled {
            None
        } else {
            lookup(CACHE_DIR).map(PathBuf::from).or(defaults.cache_dir)
        };

        Ok(RendererConfig {
            overpass_urls,
            nominatim_url,
            user_agent,
            http_timeout,
            dpi,
            cache_dir,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {name}: {value:?}"))
        })
        .transpose()
}

fn default_user_agent() -> String {
    format!("mapart/{}", env!("CARGO_PKG_VERSION"))
}

fn default_cache_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache").join("mapart");
    }
    std::env::temp_dir().join("mapart")
}
