//! Response DTOs.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// ISO-8601 response time.
    pub timestamp: String,
    /// Uptime in seconds.
    pub uptime: f64,
    /// Version.
    pub version: String,
    /// Number of loaded plugins.
    pub plugins: usize,
}

/// Greeting response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    /// Message.
    pub message: String,
    /// ISO-8601 response time.
    pub timestamp: String,
    /// Status.
    pub status: String,
}

/// Echo of an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Status.
    pub status: String,
    /// The accepted fields.
    pub received: SubmittedFields,
    /// ISO-8601 response time.
    pub timestamp: String,
}

/// Fields of an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedFields {
    /// Sender name.
    pub name: String,
    /// Message text.
    pub message: String,
}

/// Count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    /// Count value.
    pub count: u64,
    /// ISO-8601 response time.
    pub timestamp: String,
}

/// Host and process information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfoResponse {
    /// ISO-8601 response time.
    pub timestamp: String,
    /// Uptime in seconds.
    pub uptime: f64,
    /// Operating system.
    pub platform: String,
    /// CPU architecture.
    pub arch: String,
    /// Server version.
    pub version: String,
    /// Status.
    pub status: String,
}
