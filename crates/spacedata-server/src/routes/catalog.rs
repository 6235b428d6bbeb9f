//! Catalog search and product preview/metadata endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_body;
use crate::catalog::{collection_for, SearchQuery};
use crate::error::AppError;
use crate::models::{BoundingBox, Polygon, SearchResult};
use crate::state::AppState;

/// Creates the catalog router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/catalog/search", post(search))
        .route("/products/{id}/preview", get(preview))
        .route("/products/{id}/metadata", get(metadata))
        .with_state(state)
}

/// Request body for a catalog search.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSearchRequest {
    pub data_type: Option<String>,
    pub coordinates: Option<Polygon>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_cloud_cover: Option<f64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CatalogSearchResponse {
    pub collection: &'static str,
    pub bbox: BoundingBox,
    pub results: Vec<SearchResult>,
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<CatalogSearchRequest>, JsonRejection>,
) -> Result<Json<CatalogSearchResponse>, AppError> {
    let body = json_body(payload)?;
    let data_type = body.data_type.ok_or_else(|| AppError::missing_field("dataType"))?;
    let start_date = body.start_date.ok_or_else(|| AppError::missing_field("startDate"))?;
    let end_date = body.end_date.ok_or_else(|| AppError::missing_field("endDate"))?;

    let mut query = SearchQuery::new(data_type, body.coordinates, start_date, end_date);
    if let Some(max) = body.max_cloud_cover {
        query.max_cloud_cover = max.clamp(0.0, 100.0);
    }
    if let Some(limit) = body.limit {
        query.limit = limit.clamp(1, 100);
    }

    let results = state.catalog.try_search(&query).await?;
    Ok(Json(CatalogSearchResponse {
        collection: collection_for(&query.data_type),
        bbox: query.bbox(),
        results,
    }))
}

async fn preview(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    let preview = state.catalog.get_preview(&id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, preview.content_type),
            (header::HeaderName::from_static("x-preview-source"), preview.source),
        ],
        preview.bytes,
    )
        .into_response())
}

async fn metadata(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.catalog.get_metadata(&id).await?))
}
