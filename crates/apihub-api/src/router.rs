//! Route definitions for the API Hub HTTP API.
//!
//! Static routes are registered directly on the router and take precedence
//! over plugin routes on the same path. Everything else falls through to
//! the plugin route table.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(plugin_routes())
        .merge(misc_routes())
        .route("/swagger.json", get(handlers::openapi::swagger))
        .fallback(handlers::dispatch::dispatch)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(middleware::compression::build_compression_layer())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Plugin listing and refresh
fn plugin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/plugins", get(handlers::plugins::list_plugins))
        .route("/api/plugins/refresh", post(handlers::plugins::refresh_plugins))
}

/// Health and standalone endpoints
fn misc_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/hello", get(handlers::misc::hello))
        .route("/api/submit", post(handlers::misc::submit))
        .route("/api/visitor-count", get(handlers::misc::visitor_count))
        .route("/api/system-info", get(handlers::misc::system_info))
}
