//! Fallback handler that forwards requests to plugin routes.

use std::collections::HashMap;

use apihub_core::error::AppError;
use apihub_plugin::PluginRequest;
use axum::Json;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use crate::error::ApiError;
use crate::extractors::QueryMap;
use crate::extractors::body::decode;
use crate::state::AppState;

/// Any request not matched by a static route.
///
/// The body is decoded only after a route matched, so an unknown route is
/// always a 404 whatever the body holds.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    QueryMap(query): QueryMap,
    raw_body: Bytes,
) -> Result<Response, ApiError> {
    let path = uri.path();
    let Some(route) = state
        .plugin_manager
        .routes()
        .resolve(method.as_str(), path)
        .await
    else {
        return Err(AppError::not_found(format!("Cannot {method} {path}")).into());
    };

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body = decode(&content_type, &raw_body)?;

    debug!(plugin_id = %route.plugin_id, method = %method, path = %path, "Dispatching to plugin");

    let request = PluginRequest {
        method: method.as_str().to_ascii_lowercase(),
        path: path.to_string(),
        query,
        body,
        headers: header_map(&headers),
    };

    let response = route.handler.handle(request).await?;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(response.body)).into_response())
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
