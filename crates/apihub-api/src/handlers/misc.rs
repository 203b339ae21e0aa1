//! Small standalone endpoints.

use apihub_core::error::AppError;
use axum::Json;
use axum::extract::State;

use crate::dto::request::SubmitRequest;
use crate::dto::response::{
    CountResponse, HelloResponse, SubmitResponse, SubmittedFields, SystemInfoResponse,
};
use crate::error::ApiError;
use crate::extractors::RequestBody;
use crate::handlers::now_iso;
use crate::state::AppState;

/// GET /api/hello
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the API Hub!".to_string(),
        timestamp: now_iso(),
        status: "success".to_string(),
    })
}

/// POST /api/submit
pub async fn submit(RequestBody(body): RequestBody) -> Result<Json<SubmitResponse>, ApiError> {
    let request: SubmitRequest = if body.is_null() {
        SubmitRequest::default()
    } else {
        serde_json::from_value(body)
            .map_err(|e| AppError::validation(format!("Invalid submission: {e}")))?
    };

    let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
    match (non_empty(request.name), non_empty(request.message)) {
        (Some(name), Some(message)) => Ok(Json(SubmitResponse {
            status: "success".to_string(),
            received: SubmittedFields { name, message },
            timestamp: now_iso(),
        })),
        _ => Err(AppError::validation("Name and message are required.").into()),
    }
}

/// GET /api/visitor-count
pub async fn visitor_count(State(state): State<AppState>) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.record_visit(),
        timestamp: now_iso(),
    })
}

/// GET /api/system-info
pub async fn system_info(State(state): State<AppState>) -> Json<SystemInfoResponse> {
    Json(SystemInfoResponse {
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "online".to_string(),
    })
}
