//! SpaceData Server - satellite data purchase and analysis backend
//!
//! This crate provides the HTTP server that ties together area geocoding,
//! the imagery catalog, the AI assistant and the blockchain attestation
//! workflow.

pub mod attestation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod models;
pub mod narrative;
pub mod pricing;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
