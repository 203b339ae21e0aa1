//! External AI API configuration.

use serde::{Deserialize, Serialize};

/// Settings for the third-party AI HTTP API wrapped by the AI handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the AI API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the chat endpoint, relative to `base_url`.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Path of the text-to-image endpoint, relative to `base_url`.
    #[serde(default = "default_image_path")]
    pub image_path: String,
    /// API key sent in the `api-key` header, if any.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            image_path: default_image_path(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepai.org".to_string()
}

fn default_chat_path() -> String {
    "/chat_response".to_string()
}

fn default_image_path() -> String {
    "/api/text2img".to_string()
}

fn default_timeout() -> u64 {
    60
}
