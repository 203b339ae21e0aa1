//! # apihub-api
//!
//! HTTP API layer for API Hub built on Axum.
//!
//! Serves the static endpoints (plugin listing, refresh, OpenAPI, health,
//! and a few demo endpoints), forwards every other request to the plugin
//! route table, and maps `AppError` to JSON error responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve, shutdown_signal};
pub use error::ApiError;
pub use state::AppState;
