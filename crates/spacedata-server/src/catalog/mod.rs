//! Satellite imagery catalog client (STAC search with OData fallbacks).

pub mod auth;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::config::CatalogConfig;
use crate::models::{search_bbox, BoundingBox, Polygon, SearchResult};

pub use auth::TokenCache;

/// Asset keys checked for a preview image, in order of preference.
const PREVIEW_ASSETS: [&str; 4] = ["thumbnail", "preview", "overview", "browse"];

const DEFAULT_COLLECTION: &str = "sentinel-2-l2a";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Catalog returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed catalog response: {0}")]
    Malformed(String),

    #[error("Product not found: {0}")]
    NotFound(String),
}

/// STAC collection for a product type code. Unknown codes map to Sentinel-2 L2A.
pub fn collection_for(data_type: &str) -> &'static str {
    match data_type {
        "S2MSI2A" => "sentinel-2-l2a",
        "S1GRD" => "sentinel-1-grd",
        "S3OLCI" => "sentinel-3-olci",
        _ => DEFAULT_COLLECTION,
    }
}

/// Bounding box for a raw `coordinates` field, defaulting on bad input.
pub fn coordinates_to_bbox(raw: &str) -> BoundingBox {
    search_bbox(Polygon::parse(raw).as_ref())
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub data_type: String,
    pub polygon: Option<Polygon>,
    pub start_date: String,
    pub end_date: String,
    pub max_cloud_cover: f64,
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(
        data_type: impl Into<String>,
        polygon: Option<Polygon>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            data_type: data_type.into(),
            polygon,
            start_date: start_date.into(),
            end_date: end_date.into(),
            max_cloud_cover: 100.0,
            limit: 10,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        search_bbox(self.polygon.as_ref())
    }

    fn datetime_range(&self) -> String {
        format!("{}T00:00:00Z/{}T23:59:59Z", self.start_date, self.end_date)
    }

    fn to_stac_body(&self) -> Value {
        json!({
            "collections": [collection_for(&self.data_type)],
            "bbox": self.bbox(),
            "datetime": self.datetime_range(),
            "filter": {
                "op": "and",
                "args": [
                    {
                        "op": "<=",
                        "args": [{"property": "eo:cloud_cover"}, self.max_cloud_cover]
                    }
                ]
            },
            "limit": self.limit,
        })
    }
}

/// A product preview image.
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Which fallback produced the image, e.g. `stac_thumbnail`.
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    assets: Map<String, Value>,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
}

impl Feature {
    /// First preview asset with an `href`, with its key.
    fn preview_asset(&self) -> Option<(&'static str, &str)> {
        PREVIEW_ASSETS.iter().find_map(|key| {
            self.assets
                .get(*key)
                .and_then(|asset| asset.get("href"))
                .and_then(Value::as_str)
                .map(|href| (*key, href))
        })
    }

    fn footprint(&self) -> Option<BoundingBox> {
        match self.bbox.as_deref()? {
            [west, south, east, north] => Some(BoundingBox::from_array([*west, *south, *east, *north])),
            // 3D boxes: [w, s, zmin, e, n, zmax]
            [west, south, _, east, north, _] => {
                Some(BoundingBox::from_array([*west, *south, *east, *north]))
            }
            _ => None,
        }
    }

    fn into_result(self) -> SearchResult {
        let thumbnail_url = self.preview_asset().map(|(_, href)| href.to_string());
        let bbox = self.footprint();
        SearchResult {
            datetime: self
                .properties
                .get("datetime")
                .and_then(Value::as_str)
                .map(str::to_string),
            cloud_cover_percent: self
                .properties
                .get("eo:cloud_cover")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            thumbnail_url,
            bbox,
            raw_properties: Value::Object(self.properties),
            id: self.id,
        }
    }
}

pub struct CatalogClient {
    client: Client,
    stac_url: Url,
    odata_url: Url,
    tokens: TokenCache,
}

impl CatalogClient {
    pub fn new(client: Client, config: &CatalogConfig) -> Self {
        Self {
            tokens: TokenCache::new(
                client.clone(),
                config.token_url.clone(),
                config.credentials.clone(),
            ),
            client,
            stac_url: config.stac_url.clone(),
            odata_url: config.odata_url.clone(),
        }
    }

    /// Searches the STAC catalog, surfacing every failure.
    pub async fn try_search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, CatalogError> {
        let body = query.to_stac_body();
        tracing::info!(
            "Searching for satellite data with params: {}, {:?}, {}",
            query.data_type,
            query.bbox().to_array(),
            query.datetime_range()
        );
        tracing::debug!("STAC API payload: {}", body);

        let collection = self.stac_search(&body).await?;
        tracing::info!("Found {} results", collection.features.len());
        Ok(collection.features.into_iter().map(Feature::into_result).collect())
    }

    /// Like [`try_search`](Self::try_search) but logs failures and returns
    /// an empty list instead.
    pub async fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("Error searching for satellite data: {}", e);
                Vec::new()
            }
        }
    }

    /// Preview image for a product: STAC assets first, then the OData
    /// quicklook, then the OData thumbnail.
    pub async fn get_preview(&self, product_id: &str) -> Result<Preview, CatalogError> {
        tracing::info!("Getting preview image for product: {}", product_id);

        match self.stac_item(product_id).await {
            Ok(Some(feature)) => {
                for key in PREVIEW_ASSETS {
                    let Some(href) = feature
                        .assets
                        .get(key)
                        .and_then(|asset| asset.get("href"))
                        .and_then(Value::as_str)
                    else {
                        continue;
                    };
                    tracing::info!("Found thumbnail URL: {}", href);
                    match self.fetch_image(href, format!("stac_{key}")).await {
                        Ok(preview) => return Ok(preview),
                        Err(e) => tracing::warn!("STAC {} asset unavailable: {}", key, e),
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Error getting product metadata from STAC API: {}", e),
        }

        for (product, source) in [("Quicklook", "odata_quicklook"), ("Thumbnail", "odata_thumbnail")] {
            let url = format!(
                "{}('{}')/Products('{}')/$value",
                self.odata_base(),
                product_id,
                product
            );
            tracing::info!("Falling back to OData URL: {}", url);
            match self.fetch_image(&url, source.to_string()).await {
                Ok(preview) => return Ok(preview),
                Err(e) => tracing::warn!("Error getting {} from OData API: {}", source, e),
            }
        }

        tracing::error!("Failed to get product preview");
        Err(CatalogError::NotFound(product_id.to_string()))
    }

    /// Raw product metadata: the STAC item, else the OData product entry.
    pub async fn get_metadata(&self, product_id: &str) -> Result<Value, CatalogError> {
        tracing::info!("Getting metadata for product: {}", product_id);

        match self.stac_item_raw(product_id).await {
            Ok(Some(item)) => {
                tracing::info!("Found item in STAC API");
                return Ok(item);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Error getting item from STAC API: {}", e),
        }

        let url = format!("{}('{}')", self.odata_base(), product_id);
        let result = async {
            let response = self
                .authorized(self.client.get(&url))
                .await
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let response = check_status(response).await?;
            Ok::<Value, CatalogError>(response.json().await?)
        }
        .await;

        match result {
            Ok(item) => {
                tracing::info!("Found item in OData API");
                Ok(item)
            }
            Err(e) => {
                tracing::warn!("Error getting item from OData API: {}", e);
                tracing::error!("Failed to get product metadata");
                Err(CatalogError::NotFound(product_id.to_string()))
            }
        }
    }

    async fn stac_item(&self, product_id: &str) -> Result<Option<Feature>, CatalogError> {
        let Some(item) = self.stac_item_raw(product_id).await? else {
            return Ok(None);
        };
        serde_json::from_value(item)
            .map(Some)
            .map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    async fn stac_item_raw(&self, product_id: &str) -> Result<Option<Value>, CatalogError> {
        let body = json!({"ids": [product_id], "limit": 1});
        let response = self.stac_post(&body).await?;
        let mut collection: Value = response.json().await?;
        let first = collection
            .get_mut("features")
            .and_then(Value::as_array_mut)
            .filter(|features| !features.is_empty())
            .map(|features| features.swap_remove(0));
        Ok(first)
    }

    async fn stac_search(&self, body: &Value) -> Result<FeatureCollection, CatalogError> {
        let response = self.stac_post(body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    async fn stac_post(&self, body: &Value) -> Result<reqwest::Response, CatalogError> {
        let url = format!("{}/search", self.stac_url.as_str().trim_end_matches('/'));
        let response = self
            .authorized(self.client.post(url))
            .await
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn fetch_image(&self, url: &str, source: String) -> Result<Preview, CatalogError> {
        let response = self
            .authorized(self.client.get(url))
            .await
            .header(reqwest::header::ACCEPT, "image/*")
            .send()
            .await?;
        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok(Preview {
            bytes,
            content_type,
            source,
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn odata_base(&self) -> &str {
        self.odata_url.as_str().trim_end_matches('/')
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CatalogError::Upstream {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_BBOX;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> CatalogClient {
        let config = CatalogConfig {
            stac_url: format!("{}/stac", server.uri()).parse().unwrap(),
            odata_url: format!("{}/odata/v1/Products", server.uri()).parse().unwrap(),
            token_url: format!("{}/token", server.uri()).parse().unwrap(),
            credentials: None,
        };
        CatalogClient::new(Client::new(), &config)
    }

    fn barcelona() -> Polygon {
        Polygon(vec![[41.3, 2.1], [41.3, 2.3], [41.5, 2.3], [41.5, 2.1]])
    }

    #[test]
    fn test_collection_mapping() {
        assert_eq!(collection_for("S2MSI2A"), "sentinel-2-l2a");
        assert_eq!(collection_for("S1GRD"), "sentinel-1-grd");
        assert_eq!(collection_for("S3OLCI"), "sentinel-3-olci");
        assert_eq!(collection_for("LANDSAT8"), "sentinel-2-l2a");
    }

    #[test]
    fn test_coordinates_to_bbox() {
        assert_eq!(coordinates_to_bbox("garbage"), DEFAULT_BBOX);
        assert_eq!(coordinates_to_bbox("[[1,1],[2,2]]"), DEFAULT_BBOX);
        assert_eq!(
            coordinates_to_bbox("[[10,20],[12,21],[11,25]]").to_array(),
            [20.0, 10.0, 25.0, 12.0]
        );
    }

    #[test]
    fn test_stac_body_shape() {
        let query = SearchQuery::new("S1GRD", Some(barcelona()), "2023-04-15", "2023-04-22");
        let body = query.to_stac_body();
        assert_eq!(body["collections"], json!(["sentinel-1-grd"]));
        assert_eq!(body["bbox"], json!([2.1, 41.3, 2.3, 41.5]));
        assert_eq!(body["datetime"], "2023-04-15T00:00:00Z/2023-04-22T23:59:59Z");
        assert_eq!(body["filter"]["args"][0]["op"], "<=");
        assert_eq!(body["filter"]["args"][0]["args"][0]["property"], "eo:cloud_cover");
        assert_eq!(body["limit"], 10);
    }

    #[tokio::test]
    async fn test_search_maps_features() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stac/search"))
            .and(body_partial_json(json!({"collections": ["sentinel-2-l2a"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "id": "S2A_MSIL2A_20230418",
                        "bbox": [2.0, 41.0, 2.5, 41.6],
                        "properties": {"datetime": "2023-04-18T10:56:21Z", "eo:cloud_cover": 12.5},
                        "assets": {
                            "preview": {"href": "https://img/preview.jpg"},
                            "thumbnail": {"title": "no href"}
                        }
                    },
                    {"id": "bare", "properties": {}}
                ]
            })))
            .mount(&server)
            .await;

        let query = SearchQuery::new("S2MSI2A", Some(barcelona()), "2023-04-15", "2023-04-22");
        let results = catalog(&server).try_search(&query).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "S2A_MSIL2A_20230418");
        assert_eq!(results[0].cloud_cover_percent, 12.5);
        assert_eq!(results[0].thumbnail_url.as_deref(), Some("https://img/preview.jpg"));
        assert_eq!(results[0].bbox.unwrap().to_array(), [2.0, 41.0, 2.5, 41.6]);
        assert_eq!(results[1].cloud_cover_percent, 0.0);
        assert!(results[1].thumbnail_url.is_none());
        assert!(results[1].datetime.is_none());
    }

    #[tokio::test]
    async fn test_search_failure_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stac/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = catalog(&server);
        let query = SearchQuery::new("S2MSI2A", None, "2023-04-15", "2023-04-22");
        let err = client.try_search(&query).await.unwrap_err();
        assert!(matches!(err, CatalogError::Upstream { status: 500, .. }));
        assert!(client.search(&query).await.is_empty());
    }

    #[tokio::test]
    async fn test_preview_prefers_stac_asset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stac/search"))
            .and(body_partial_json(json!({"ids": ["P1"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{
                    "id": "P1",
                    "assets": {"thumbnail": {"href": format!("{}/img/p1.png", server.uri())}}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/p1.png"))
            .and(header("accept", "image/*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;

        let preview = catalog(&server).get_preview("P1").await.unwrap();
        assert_eq!(preview.bytes, vec![1, 2, 3]);
        assert_eq!(preview.content_type, "image/png");
        assert_eq!(preview.source, "stac_thumbnail");
    }

    #[tokio::test]
    async fn test_preview_falls_back_to_odata_thumbnail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stac/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odata/v1/Products('P2')/Products('Quicklook')/$value"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odata/v1/Products('P2')/Products('Thumbnail')/$value"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
            .mount(&server)
            .await;

        let preview = catalog(&server).get_preview("P2").await.unwrap();
        assert_eq!(preview.source, "odata_thumbnail");
        assert_eq!(preview.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_preview_exhausted_is_not_found() {
        let server = MockServer::start().await;
        let err = catalog(&server).get_preview("missing").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_metadata_falls_back_to_odata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stac/search"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odata/v1/Products('P3')"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Id": "P3", "Online": true})),
            )
            .mount(&server)
            .await;

        let metadata = catalog(&server).get_metadata("P3").await.unwrap();
        assert_eq!(metadata["Id"], "P3");
    }
}
