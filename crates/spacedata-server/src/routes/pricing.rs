//! Price quotes.

use axum::{extract::rejection::JsonRejection, routing::post, Json, Router};

use super::json_body;
use crate::error::AppError;
use crate::pricing::{quote, PriceQuote, QuoteRequest};

/// Creates the pricing router. Quotes are pure, so no state is needed.
pub fn router() -> Router {
    Router::new().route("/quote", post(create_quote))
}

async fn create_quote(payload: Result<Json<QuoteRequest>, JsonRejection>) -> Result<Json<PriceQuote>, AppError> {
    let request = json_body(payload)?;
    Ok(Json(quote(&request)))
}
