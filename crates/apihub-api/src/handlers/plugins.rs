//! Plugin listing and manual refresh.

use apihub_plugin::PluginSnapshot;
use axum::Json;
use axum::extract::State;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/plugins
pub async fn list_plugins(State(state): State<AppState>) -> Json<PluginSnapshot> {
    Json(state.plugin_manager.plugin_data().await)
}

/// POST /api/plugins/refresh
pub async fn refresh_plugins(State(state): State<AppState>) -> Result<Json<PluginSnapshot>, ApiError> {
    let snapshot = state.plugin_manager.refresh_plugins().await?;
    state.plugin_manager.register_routes().await;
    Ok(Json(snapshot))
}
