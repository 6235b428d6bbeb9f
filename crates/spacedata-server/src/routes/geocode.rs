//! Place-name lookup for the selection map.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Polygon;
use crate::state::AppState;

/// Creates the geocoding router.
pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(geocode)).with_state(state)
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub polygon: Polygon,
    pub display_name: String,
}

async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, AppError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("q"))?;
    let resolved = state.geocoder.resolve(query.trim()).await?;
    Ok(Json(GeocodeResponse {
        polygon: resolved.polygon,
        display_name: resolved.display_name,
    }))
}
