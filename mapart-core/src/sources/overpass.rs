use super::{FeatureSource, cache::ResponseCache};
use crate::{
    algos::{
        geometry::{assemble_rings, dedupe_ring_points, is_closed, ring_contains},
        layers::LayerSet,
    },
    config::RendererConfig,
    types::{Feature, GeoPoint, Geometry, Tags},
};

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::event;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    #[serde(default)]
    tags: Tags,
    // `out geom` leaves null entries for nodes outside of the query area.
    #[serde(default)]
    geometry: Vec<Option<Coordinate>>,
    #[serde(default)]
    members: Vec<OverpassMember>,
}

#[derive(Debug, Deserialize)]
struct OverpassMember {
    #[serde(rename = "type")]
    member_type: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<Coordinate>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

fn to_points(geometry: &[Option<Coordinate>]) -> Vec<GeoPoint> {
    geometry
        .iter()
        .flatten()
        .map(|c| GeoPoint::new(c.lat, c.lon))
        .collect()
}

/// Features from an Overpass API endpoint, places from a Nominatim one.
/// Responses are cached on disk and reused when every endpoint fails.
#[derive(Debug, Clone)]
pub struct OverpassSource {
    overpass_urls: Vec<String>,
    nominatim_url: String,
    user_agent: String,
    timeout: Duration,
    cache: ResponseCache,
}

impl OverpassSource {
    pub fn new(config: &RendererConfig) -> Self {
        OverpassSource {
            overpass_urls: config.overpass_urls.clone(),
            nominatim_url: config.nominatim_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.http_timeout,
            cache: ResponseCache::new(config.cache_dir.clone()),
        }
    }

    fn block_on<F: std::future::Future<Output = Result<String>>>(
        &self,
        request: impl FnOnce(reqwest::Client) -> F,
    ) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the HTTP runtime")?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .context("Failed to build the HTTP client")?;

        runtime.block_on(request(client))
    }

    fn request_overpass(&self, query: &str) -> Result<String> {
        self.block_on(|client| async move {
            let mut errors = Vec::new();

            for url in &self.overpass_urls {
                event!(tracing::Level::DEBUG, "Querying {}", url);

                let response = match client.post(url).form(&[("data", query)]).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        errors.push(format!("{url}: request failed: {e}"));
                        continue;
                    }
                };

                let status = response.status();
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        errors.push(format!("{url}: response read failed: {e}"));
                        continue;
                    }
                };

                if status.is_success() {
                    return Ok(body);
                }

                let snippet = body.chars().take(256).collect::<String>();
                errors.push(format!("{url}: HTTP {status}: {snippet}"));
            }

            for error in &errors {
                event!(tracing::Level::WARN, "Overpass endpoint failed: {}", error);
            }

            anyhow::bail!("All Overpass endpoints failed: {}", errors.join(" | "))
        })
    }

    fn request_nominatim(&self, query: &str) -> Result<String> {
        self.block_on(|client| async move {
            let response = client
                .get(&self.nominatim_url)
                .query(&[("q", query), ("format", "json"), ("limit", "1")])
                .send()
                .await
                .context("Geocoding request failed")?
                .error_for_status()
                .context("Geocoding request was rejected")?;

            response
                .text()
                .await
                .context("Failed to read the geocoding response")
        })
    }
}

impl FeatureSource for OverpassSource {
    fn geocode(&self, query: &str) -> Result<GeoPoint> {
        let key = ResponseCache::key("nominatim", query);

        self.cache.fetch(
            &key,
            || self.request_nominatim(query),
            |text| parse_nominatim(text, query),
        )
    }

    fn fetch(&self, center: GeoPoint, radius: f64, layers: &LayerSet) -> Result<Vec<Feature>> {
        let query = build_query(center, radius, layers, self.timeout.as_secs());
        let key = ResponseCache::key("overpass", &query);

        event!(tracing::Level::DEBUG, "Overpass query: {}", query);

        let features = self
            .cache
            .fetch(&key, || self.request_overpass(&query), parse_overpass)?;

        event!(
            tracing::Level::INFO,
            "Fetched {} features around {}",
            features.len(),
            center
        );

        Ok(features)
    }
}

/// A single union query for every fetched layer around `center`, returning
/// elements with their geometry inlined.
fn build_query(center: GeoPoint, radius: f64, layers: &LayerSet, timeout_s: u64) -> String {
    let around = format!("(around:{radius:.1},{:.7},{:.7})", center.lat, center.lon);

    let statements = layers
        .values()
        .filter(|selection| selection.is_fetched())
        .flat_map(|selection| selection.overpass_statements(&around))
        .collect::<Vec<_>>()
        .concat();

    format!("[out:json][timeout:{timeout_s}];({statements});out geom;")
}

fn parse_nominatim(text: &str, query: &str) -> Result<GeoPoint> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(text).context("Malformed geocoding response")?;

    let place = places
        .first()
        .with_context(|| format!("Could not find any place matching {query:?}"))?;

    let lat = place.lat.parse::<f64>().context("Malformed latitude")?;
    let lon = place.lon.parse::<f64>().context("Malformed longitude")?;

    Ok(GeoPoint::new(lat, lon))
}

fn parse_overpass(text: &str) -> Result<Vec<Feature>> {
    let response: OverpassResponse =
        serde_json::from_str(text).context("Malformed Overpass response")?;

    let mut features = Vec::new();

    for element in response.elements {
        match element.element_type.as_str() {
            "way" => features.extend(parse_way(element)),
            "relation" => features.extend(parse_relation(element)),
            _ => {}
        }
    }

    Ok(features)
}

fn parse_way(element: OverpassElement) -> Option<Feature> {
    let mut points = to_points(&element.geometry);

    if points.len() < 2 {
        return None;
    }

    let geometry = if is_closed(&points) && points.len() >= 4 {
        dedupe_ring_points(&mut points);
        Geometry::Polygon {
            exterior: points,
            holes: Vec::new(),
        }
    } else {
        Geometry::LineString { points }
    };

    Some(Feature {
        id: element.id,
        tags: element.tags,
        geometry,
    })
}

// Only multipolygons are drawn; every outer ring becomes a polygon holding
// the inner rings that lie within it.
fn parse_relation(element: OverpassElement) -> Vec<Feature> {
    if element.tags.get("type").map(String::as_str) != Some("multipolygon") {
        return Vec::new();
    }

    let (inner, outer): (Vec<_>, Vec<_>) = element
        .members
        .iter()
        .filter(|member| member.member_type == "way")
        .partition(|member| member.role == "inner");

    let outer = assemble_rings(outer.iter().map(|m| to_points(&m.geometry)).collect());
    let mut inner = assemble_rings(inner.iter().map(|m| to_points(&m.geometry)).collect());

    outer
        .into_iter()
        .map(|exterior| {
            let (holes, rest) = inner.drain(..).partition(|ring: &Vec<GeoPoint>| {
                ring.first()
                    .is_some_and(|point| ring_contains(&exterior, point))
            });
            inner = rest;

            Feature {
                id: element.id,
                tags: element.tags.clone(),
                geometry: Geometry::Polygon { exterior, holes },
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algos::layers::default_layers;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {
                "type": "way",
                "id": 10,
                "tags": {"building": "yes"},
                "geometry": [
                    {"lat": 0.0, "lon": 0.0},
                    {"lat": 0.0, "lon": 1.0},
                    {"lat": 1.0, "lon": 1.0},
                    {"lat": 0.0, "lon": 0.0}
                ]
            },
            {
                "type": "way",
                "id": 11,
                "tags": {"highway": "residential"},
                "geometry": [
                    {"lat": 0.0, "lon": 0.0},
                    null,
                    {"lat": 2.0, "lon": 2.0}
                ]
            },
            {
                "type": "way",
                "id": 12,
                "geometry": [{"lat": 0.0, "lon": 0.0}]
            },
            {
                "type": "node",
                "id": 13,
                "lat": 0.0,
                "lon": 0.0
            },
            {
                "type": "relation",
                "id": 20,
                "tags": {"type": "multipolygon", "natural": "water"},
                "members": [
                    {
                        "type": "way",
                        "ref": 1,
                        "role": "outer",
                        "geometry": [
                            {"lat": 0.0, "lon": 0.0},
                            {"lat": 0.0, "lon": 10.0},
                            {"lat": 10.0, "lon": 10.0}
                        ]
                    },
                    {
                        "type": "way",
                        "ref": 2,
                        "role": "outer",
                        "geometry": [
                            {"lat": 10.0, "lon": 10.0},
                            {"lat": 10.0, "lon": 0.0},
                            {"lat": 0.0, "lon": 0.0}
                        ]
                    },
                    {
                        "type": "way",
                        "ref": 3,
                        "role": "inner",
                        "geometry": [
                            {"lat": 4.0, "lon": 4.0},
                            {"lat": 4.0, "lon": 6.0},
                            {"lat": 6.0, "lon": 6.0},
                            {"lat": 4.0, "lon": 4.0}
                        ]
                    },
                    {
                        "type": "node",
                        "ref": 4,
                        "role": "label"
                    }
                ]
            },
            {
                "type": "relation",
                "id": 21,
                "tags": {"type": "route", "route": "bus"},
                "members": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_overpass() {
        let features = parse_overpass(RESPONSE).unwrap();

        assert_eq!(features.len(), 3);

        let building = &features[0];
        assert_eq!(building.id, 10);
        assert_eq!(building.tags["building"], "yes");
        assert!(matches!(&building.geometry, Geometry::Polygon { exterior, holes } if exterior.len() == 3 && holes.is_empty()));

        // Missing nodes are skipped
        let street = &features[1];
        assert!(matches!(&street.geometry, Geometry::LineString { points } if points.len() == 2));

        let lake = &features[2];
        assert_eq!(lake.id, 20);
        assert_eq!(lake.tags["natural"], "water");
        match &lake.geometry {
            Geometry::Polygon { exterior, holes } => {
                assert_eq!(exterior.len(), 4);
                assert_eq!(holes.len(), 1);
                assert_eq!(holes[0].len(), 3);
            }
            other => panic!("Expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_overpass_rejects_garbage() {
        assert!(parse_overpass("<html>rate limited</html>").is_err());
        assert!(parse_overpass(r#"{"elements": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_nominatim() {
        let text = r#"[{"place_id": 1, "lat": "59.4372", "lon": "24.7453", "display_name": "Old Town"}]"#;

        let point = parse_nominatim(text, "Old Town, Tallinn").unwrap();
        assert!(point.same_as(&GeoPoint::new(59.4372, 24.7453)));

        let error = parse_nominatim("[]", "Nowhere").unwrap_err();
        assert!(error.to_string().contains("Nowhere"));
    }

    #[test]
    fn test_build_query() {
        let layers = default_layers().unwrap();
        let query = build_query(GeoPoint::new(59.437, 24.745), 1000.0, &layers, 60);

        assert!(query.starts_with("[out:json][timeout:60];("));
        assert!(query.ends_with(");out geom;"));
        assert!(query.contains(r#"way["building"](around:1000.0,59.4370000,24.7450000);"#));
        assert!(query.contains(r#"relation["landuse"="forest"](around:1000.0,59.4370000,24.7450000);"#));
        assert!(query.contains(r#"["natural"~"^(water|bay)$"]"#));
        // Streets are lines, they have no relations to fetch
        assert!(!query.contains(r#"relation["highway"~"#));
    }

    #[test]
    fn test_fetch_uses_cached_response_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config = RendererConfig {
            overpass_urls: vec!["http://127.0.0.1:9/api/interpreter".to_string()],
            nominatim_url: "http://127.0.0.1:9/search".to_string(),
            http_timeout: Duration::from_secs(1),
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let source = OverpassSource::new(&config);

        let layers = default_layers().unwrap();
        let center = GeoPoint::new(59.437, 24.745);

        assert!(source.fetch(center, 500.0, &layers).is_err());

        let query = build_query(center, 500.0, &layers, 1);
        ResponseCache::new(Some(dir.path().to_path_buf()))
            .save(&ResponseCache::key("overpass", &query), RESPONSE);

        assert_eq!(source.fetch(center, 500.0, &layers).unwrap().len(), 3);
    }
}
