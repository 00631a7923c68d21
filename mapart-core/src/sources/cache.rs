use std::path::PathBuf;

use anyhow::Result;
use tracing::event;

/// Raw responses of remote services stored on disk, keyed by the request
/// that produced them. A cache without a directory stores nothing.
#[derive(Debug, Clone)]
pub(crate) struct ResponseCache {
    dir: Option<PathBuf>,
}

impl ResponseCache {
    pub fn new(dir: Option<PathBuf>) -> Self {
        ResponseCache { dir }
    }

    /// Stable across builds, so entries outlive toolchain upgrades.
    pub fn key(kind: &str, request: &str) -> String {
        let hash = blake3::hash(request.as_bytes());
        let hex = hash.to_hex();

        format!("{kind}_{}", &hex.as_str()[..16])
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }

    pub fn load(&self, key: &str) -> Option<String> {
        let path = self.path(key)?;
        std::fs::read_to_string(path).ok()
    }

    pub fn save(&self, key: &str, data: &str) {
        let Some(path) = self.path(key) else {
            return;
        };

        let written = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(&path, data));

        if let Err(e) = written {
            event!(
                tracing::Level::WARN,
                "Couldn't cache response to {}: {}",
                path.display(),
                e
            );
        }
    }

    /// Parses the cached response for `key` when there is a usable one,
    /// otherwise performs `request` and caches its body. A failed request
    /// falls back to whatever the cache holds.
    pub fn fetch<T>(
        &self,
        key: &str,
        request: impl FnOnce() -> Result<String>,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<T> {
        if let Some(parsed) = self.load(key).and_then(|text| parse(&text).ok()) {
            event!(tracing::Level::DEBUG, "Using cached response {}", key);
            return Ok(parsed);
        }

        match request() {
            Ok(text) => {
                let parsed = parse(&text)?;
                self.save(key, &text);
                Ok(parsed)
            }
            Err(e) => match self.load(key) {
                Some(text) => {
                    event!(
                        tracing::Level::WARN,
                        "Request failed, falling back to cached response {}: {:#}",
                        key,
                        e
                    );
                    parse(&text)
                }
                None => Err(e),
            },
        }
    }
}
