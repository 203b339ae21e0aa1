//! AI handlers backed by an external HTTP API.
//!
//! Both handlers post a multipart form to the configured API and wrap the
//! upstream JSON in the usual `{success, data, timestamp}` envelope.

use std::time::Duration;

use apihub_core::config::AiConfig;
use apihub_core::result::AppResult;
use apihub_plugin::{PluginHandler, PluginRequest, PluginResponse};
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::params;

const MAX_ERROR_BODY: usize = 512;

/// Thin client for the external AI API.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl AiClient {
    /// Creates a client honouring the configured timeout.
    pub fn new(config: AiConfig) -> HandlerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("apihub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HandlerError::ClientSetup(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Posts `fields` as a multipart form and returns the decoded response.
    ///
    /// A body that is not JSON is returned as a JSON string.
    pub async fn post_form(&self, path: &str, fields: Vec<(&'static str, String)>) -> HandlerResult<Value> {
        let url = self.endpoint(path);
        let form = fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let mut request = self.http.post(&url).header("accept", "*/*").multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.header("api-key", key);
        }

        debug!(url = %url, "Calling AI API");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "AI API returned an error");
            return Err(HandlerError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

fn preview(prompt: &str) -> String {
    prompt.chars().take(50).collect()
}

fn prompt_of(request: &PluginRequest) -> HandlerResult<String> {
    match request.param("prompt") {
        Some(Value::String(prompt)) if !prompt.is_empty() => Ok(prompt),
        _ => Err(HandlerError::invalid(
            "Parameter 'prompt' is required and must be a string",
        )),
    }
}

/// Options accepted by [`ChatHandler`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    /// Model used when the request names none.
    pub model: String,
    /// Chat style used when the request names none.
    pub chat_style: String,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "standard".to_string(),
            chat_style: "chat".to_string(),
        }
    }
}

/// Chat completion with optional history.
#[derive(Debug, Clone)]
pub struct ChatHandler {
    client: AiClient,
    options: ChatOptions,
}

impl ChatHandler {
    /// Builds the handler from manifest options.
    pub fn new(client: AiClient, options: &Value) -> HandlerResult<Self> {
        Ok(Self {
            client,
            options: params::options(options)?,
        })
    }

    fn messages_of(request: &PluginRequest) -> HandlerResult<Vec<Value>> {
        let messages = match request.body_field("messages") {
            None => return Ok(Vec::new()),
            Some(Value::Array(messages)) => messages.clone(),
            Some(_) => return Err(HandlerError::invalid("Parameter 'messages' must be an array")),
        };

        let well_formed = messages.iter().all(|m| {
            ["role", "content"]
                .iter()
                .all(|key| m.get(key).is_some_and(|v| !v.is_null() && v != ""))
        });
        if !well_formed {
            return Err(HandlerError::invalid(
                "Each message must have 'role' and 'content' properties",
            ));
        }
        Ok(messages)
    }

    async fn chat(&self, request: &PluginRequest) -> HandlerResult<Value> {
        let prompt = prompt_of(request)?;
        let messages = Self::messages_of(request)?;
        let chat_style = params::text(request, "chatStyle").unwrap_or_else(|| self.options.chat_style.clone());
        let model = params::text(request, "model").unwrap_or_else(|| self.options.model.clone());

        info!(prompt = %preview(&prompt), model = %model, "AI chat request");

        let history = if messages.is_empty() {
            json!([{ "role": "user", "content": prompt }])
        } else {
            Value::Array(messages.clone())
        };

        let response = self
            .client
            .post_form(
                &self.client.config().chat_path,
                vec![
                    ("chat_style", chat_style.clone()),
                    ("chatHistory", history.to_string()),
                    ("model", model.clone()),
                ],
            )
            .await?;

        Ok(json!({
            "success": true,
            "data": {
                "response": response,
                "input": {
                    "prompt": prompt,
                    "messages": messages,
                    "chatStyle": chat_style,
                    "model": model,
                },
            },
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for ChatHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(self.chat(&request).await?))
    }
}

/// Image quality levels.
pub const IMAGE_VERSIONS: [&str; 2] = ["hd", "standard"];

/// Options accepted by [`ImageHandler`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Version used when the request names none.
    pub version: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            version: "hd".to_string(),
        }
    }
}

/// Text-to-image generation.
#[derive(Debug, Clone)]
pub struct ImageHandler {
    client: AiClient,
    options: ImageOptions,
}

impl ImageHandler {
    /// Builds the handler from manifest options.
    pub fn new(client: AiClient, options: &Value) -> HandlerResult<Self> {
        let options: ImageOptions = params::options(options)?;
        if !IMAGE_VERSIONS.contains(&options.version.as_str()) {
            return Err(HandlerError::InvalidOptions(format!(
                "version must be one of: {}",
                IMAGE_VERSIONS.join(", ")
            )));
        }
        Ok(Self { client, options })
    }

    /// Validates the prompt and version of a request.
    pub fn validate(&self, request: &PluginRequest) -> HandlerResult<(String, String)> {
        let prompt = prompt_of(request)?;
        let length = prompt.chars().count();
        if length < 3 {
            return Err(HandlerError::invalid("Prompt must be at least 3 characters long"));
        }
        if length > 1000 {
            return Err(HandlerError::invalid("Prompt must be less than 1000 characters"));
        }

        let version = params::text(request, "version").unwrap_or_else(|| self.options.version.clone());
        if !IMAGE_VERSIONS.contains(&version.as_str()) {
            return Err(HandlerError::invalid(format!(
                "Invalid version. Must be one of: {}",
                IMAGE_VERSIONS.join(", ")
            )));
        }

        Ok((prompt, version))
    }

    async fn generate(&self, request: &PluginRequest) -> HandlerResult<Value> {
        let (prompt, version) = self.validate(request)?;
        info!(prompt = %preview(&prompt), version = %version, "AI image request");

        let response = self
            .client
            .post_form(
                &self.client.config().image_path,
                vec![
                    ("text", prompt.clone()),
                    ("image_generator_version", version.clone()),
                ],
            )
            .await?;

        let image_url = response
            .get("output_url")
            .or_else(|| response.get("url"))
            .cloned()
            .unwrap_or(Value::Null);
        let generation_time = response
            .get("generation_time")
            .cloned()
            .unwrap_or_else(|| json!("unknown"));
        let id = response
            .get("id")
            .cloned()
            .unwrap_or_else(|| json!(uuid::Uuid::new_v4().simple().to_string()));

        Ok(json!({
            "success": true,
            "data": {
                "image_url": image_url,
                "prompt": prompt,
                "version": version,
                "generation_time": generation_time,
                "id": id,
                "full_response": response,
            },
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for ImageHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(self.generate(&request).await?))
    }
}
