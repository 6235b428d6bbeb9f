//! Forward and reverse geocoding against a Nominatim-compatible service.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::models::Polygon;

/// Sent on every request; public Nominatim instances reject anonymous clients.
pub const USER_AGENT: &str = "SpaceData-App/1.0";

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Geocoding service error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed geocoder response: {0}")]
    Malformed(String),
}

/// A place name resolved to a selection polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub polygon: Polygon,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
}

#[derive(Clone)]
pub struct Geocoder {
    client: Client,
    base_url: Url,
}

impl Geocoder {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Resolves a free-text query to a polygon around the best match.
    pub async fn resolve(&self, query: &str) -> Result<ResolvedLocation, GeocodeError> {
        let url = self.endpoint("search");
        let hits: Vec<SearchHit> = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(hit) = hits.into_iter().next() else {
            tracing::warn!("Location not found: {}", query);
            return Err(GeocodeError::NotFound(query.to_string()));
        };

        if let Some(polygon) = hit.boundingbox.as_deref().and_then(polygon_from_bounding_box) {
            return Ok(ResolvedLocation {
                polygon,
                display_name: hit.display_name,
            });
        }

        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|_| GeocodeError::Malformed(format!("bad latitude '{}'", hit.lat)))?;
        let lng: f64 = hit
            .lon
            .parse()
            .map_err(|_| GeocodeError::Malformed(format!("bad longitude '{}'", hit.lon)))?;

        let delta = heuristic_delta(&hit.display_name);
        Ok(ResolvedLocation {
            polygon: square_around(lat, lng, delta),
            display_name: hit.display_name,
        })
    }

    /// Address of the point, or `None` on any failure.
    pub async fn reverse_lookup(&self, lat: f64, lng: f64) -> Option<String> {
        let url = self.endpoint("reverse");
        let result = async {
            let hit: ReverseHit = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .query(&[
                    ("lat", lat.to_string()),
                    ("lon", lng.to_string()),
                    ("format", "json".to_string()),
                    ("accept-language", "en".to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok::<_, reqwest::Error>(hit.display_name)
        }
        .await;

        match result {
            Ok(name) => name.filter(|n| !n.is_empty()),
            Err(e) => {
                tracing::warn!("Reverse geocoding error at [{}, {}]: {}", lat, lng, e);
                None
            }
        }
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}/{}", url.path().trim_end_matches('/'), name);
        url.set_path(&path);
        url
    }
}

/// `[min_lat, max_lat, min_lng, max_lng]` strings to a four-corner polygon.
fn polygon_from_bounding_box(raw: &[String]) -> Option<Polygon> {
    let values: Vec<f64> = raw.iter().map(|v| v.parse().ok()).collect::<Option<_>>()?;
    let [min_lat, max_lat, min_lng, max_lng] = <[f64; 4]>::try_from(values).ok()?;
    Some(Polygon(vec![
        [min_lat, min_lng],
        [min_lat, max_lng],
        [max_lat, max_lng],
        [max_lat, min_lng],
    ]))
}

/// Half-width of the fallback square. Longer addresses are usually more
/// specific places, so they get a smaller box.
fn heuristic_delta(address: &str) -> f64 {
    let len = address.chars().count() as f64;
    (0.5 / (len / 20.0)).clamp(0.01, 0.2)
}

fn square_around(lat: f64, lng: f64, delta: f64) -> Polygon {
    Polygon(vec![
        [lat - delta, lng - delta],
        [lat - delta, lng + delta],
        [lat + delta, lng + delta],
        [lat + delta, lng - delta],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> Geocoder {
        Geocoder::new(Client::new(), server.uri().parse().unwrap())
    }

    #[test]
    fn test_heuristic_delta_bounds() {
        assert_eq!(heuristic_delta(""), 0.2);
        assert_eq!(heuristic_delta("Paris"), 0.2);
        // 100 chars -> 0.5 / 5 = 0.1
        assert!((heuristic_delta(&"x".repeat(100)) - 0.1).abs() < 1e-12);
        assert_eq!(heuristic_delta(&"x".repeat(5000)), 0.01);
    }

    #[test]
    fn test_unparseable_bounding_box_is_ignored() {
        let raw = vec!["41.3".to_string(), "abc".to_string(), "2.1".to_string(), "2.3".to_string()];
        assert!(polygon_from_bounding_box(&raw).is_none());
        assert!(polygon_from_bounding_box(&["1".to_string()]).is_none());
    }

    #[tokio::test]
    async fn test_resolve_uses_provider_bounding_box() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Barcelona"))
            .and(query_param("format", "json"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "lat": "41.38",
                "lon": "2.17",
                "display_name": "Barcelona, Catalonia, Spain",
                "boundingbox": ["41.3", "41.5", "2.1", "2.3"]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let resolved = geocoder(&server).resolve("Barcelona").await.unwrap();
        assert_eq!(resolved.display_name, "Barcelona, Catalonia, Spain");
        assert_eq!(
            resolved.polygon,
            Polygon(vec![[41.3, 2.1], [41.3, 2.3], [41.5, 2.3], [41.5, 2.1]])
        );
    }

    #[tokio::test]
    async fn test_resolve_without_bounding_box_builds_square() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "lat": "10.0",
                "lon": "20.0",
                "display_name": "Somewhere"
            }])))
            .mount(&server)
            .await;

        let resolved = geocoder(&server).resolve("Somewhere").await.unwrap();
        let delta = 0.2;
        assert_eq!(
            resolved.polygon,
            Polygon(vec![
                [10.0 - delta, 20.0 - delta],
                [10.0 - delta, 20.0 + delta],
                [10.0 + delta, 20.0 + delta],
                [10.0 + delta, 20.0 - delta],
            ])
        );
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Atlantis").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound(q) if q == "Atlantis"));
    }

    #[tokio::test]
    async fn test_resolve_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Paris").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reverse_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("accept-language", "en"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"display_name": "Balearic Sea"})),
            )
            .mount(&server)
            .await;

        let name = geocoder(&server).reverse_lookup(41.0, 2.5).await;
        assert_eq!(name.as_deref(), Some("Balearic Sea"));
    }

    #[tokio::test]
    async fn test_reverse_lookup_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(geocoder(&server).reverse_lookup(0.0, 0.0).await.is_none());

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})),
            )
            .mount(&server)
            .await;
        assert!(geocoder(&server).reverse_lookup(0.0, 0.0).await.is_none());
    }
}
