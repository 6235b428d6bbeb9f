//! HTTP routes for the SpaceData server.

pub mod assistant;
pub mod blockchain;
pub mod catalog;
pub mod geocode;
pub mod pages;
pub mod pricing;

use axum::extract::rejection::JsonRejection;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Creates the main router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router(state.clone()))
        .nest("/api", api_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Creates the JSON API routes.
fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/blockchain", blockchain::router(state.clone()))
        .nest("/assistant", assistant::router(state.clone()))
        .nest("/geocode", geocode::router(state.clone()))
        .nest("/pricing", pricing::router())
        .merge(catalog::router(state))
}

/// Unwraps a JSON body, turning rejections into a JSON 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}
