//! Home-page assistant.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::error::AppError;
use crate::state::AppState;

/// Creates the assistant router.
pub fn router(state: AppState) -> Router {
    Router::new().route("/", post(ask)).with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub response: String,
}

async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AssistantRequest>, JsonRejection>,
) -> Result<Json<AssistantResponse>, AppError> {
    let query = json_body(payload)?
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("query"))?;
    let response = state.narrative.home_assistant_reply(&query).await;
    Ok(Json(AssistantResponse { response }))
}
