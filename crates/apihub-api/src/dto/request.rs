//! Request DTOs.

use serde::{Deserialize, Serialize};

/// `POST /api/submit` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Sender name.
    #[serde(default)]
    pub name: Option<String>,
    /// Message text.
    #[serde(default)]
    pub message: Option<String>,
}
