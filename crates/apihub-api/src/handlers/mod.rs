//! Axum request handlers.

pub mod dispatch;
pub mod health;
pub mod misc;
pub mod openapi;
pub mod plugins;

/// Current time in the `2024-01-01T00:00:00.000Z` form.
pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
