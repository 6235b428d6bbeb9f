//! Error types for the SpaceData server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use spacedata_attest::ErrorBody;

use crate::attestation::AttestationError;
use crate::catalog::CatalogError;
use crate::geocoding::GeocodeError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "Not found",
            AppError::BadRequest(_) => "Invalid request",
            AppError::NotConfigured(_) => "Service not configured",
            AppError::Upstream(_) => "Upstream service error",
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// Missing required JSON field.
    pub fn missing_field(name: &str) -> Self {
        AppError::BadRequest(format!("Missing required parameter: {name}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {}", msg);
                msg.clone()
            }
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::NotConfigured(msg) => {
                tracing::warn!("{}: {}", self.summary(), msg);
                msg.clone()
            }
        };

        let body = ErrorBody {
            success: false,
            error: self.summary().to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AttestationError> for AppError {
    fn from(err: AttestationError) -> Self {
        match err {
            AttestationError::NotConfigured(msg) => AppError::NotConfigured(msg),
            AttestationError::InvalidInput(msg) => AppError::BadRequest(msg),
            other @ (AttestationError::Transport(_)
            | AttestationError::Upstream { .. }
            | AttestationError::Malformed(_)
            | AttestationError::Contract(_)
            | AttestationError::Reverted(_)) => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => AppError::NotFound(format!("Product {id} not found")),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<GeocodeError> for AppError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::NotFound(query) => AppError::NotFound(format!("Location not found: {query}")),
            other => AppError::Upstream(other.to_string()),
        }
    }
}
