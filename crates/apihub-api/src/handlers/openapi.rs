//! OpenAPI document generated from the live plugin set.
//!
//! Each plugin param description follows the `"<type> (required) - text"`
//! convention: the leading word picks the schema type, `(required)` marks
//! the parameter required, and the text after ` - ` becomes the description.

use apihub_plugin::{PluginDescriptor, PluginSnapshot};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use serde_json::{Map, Value, json};

use crate::state::AppState;

const SCHEMA_TYPES: [&str; 4] = ["string", "number", "array", "object"];

/// A documented plugin parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDoc {
    /// Parameter name.
    pub name: String,
    /// JSON schema type.
    pub schema_type: &'static str,
    /// Whether the parameter is required.
    pub required: bool,
    /// Human-readable description.
    pub description: String,
}

impl ParamDoc {
    /// Interprets a param description string.
    pub fn parse(name: &str, raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        let schema_type = SCHEMA_TYPES
            .iter()
            .find(|t| lowered.starts_with(**t))
            .copied()
            .unwrap_or("string");
        let description = raw
            .split(" - ")
            .nth(1)
            .unwrap_or(raw)
            .to_string();

        Self {
            name: name.to_string(),
            schema_type,
            required: raw.contains("(required)"),
            description,
        }
    }
}

fn operation(plugin: &PluginDescriptor) -> Value {
    let params: Vec<ParamDoc> = plugin
        .params
        .iter()
        .map(|(name, raw)| ParamDoc::parse(name, raw))
        .collect();

    let mut op = Map::new();
    op.insert("tags".to_string(), json!([plugin.category]));
    op.insert(
        "operationId".to_string(),
        json!(plugin.name.split_whitespace().collect::<String>()),
    );
    op.insert("summary".to_string(), json!(plugin.description));

    if !params.is_empty() {
        if plugin.route_method() == "get" {
            let parameters: Vec<Value> = params
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "in": "query",
                        "required": p.required,
                        "description": p.description,
                        "schema": { "type": p.schema_type },
                    })
                })
                .collect();
            op.insert("parameters".to_string(), json!(parameters));
        } else {
            let properties: Map<String, Value> = params
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        json!({ "type": p.schema_type, "description": p.description }),
                    )
                })
                .collect();
            let required: Vec<&str> = params
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.as_str())
                .collect();
            op.insert(
                "requestBody".to_string(),
                json!({
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "object",
                                "properties": properties,
                                "required": required,
                            }
                        }
                    }
                }),
            );
        }
    }

    op.insert(
        "responses".to_string(),
        json!({
            "200": {
                "description": "Successful response",
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": {
                                "success": { "type": "boolean" },
                                "result": { "type": "object" },
                            }
                        }
                    }
                }
            }
        }),
    );

    Value::Object(op)
}

/// Builds an OpenAPI 3.0 document describing every loaded plugin.
pub fn openapi_document(snapshot: &PluginSnapshot, server_url: &str) -> Value {
    let mut paths: Map<String, Value> = Map::new();

    for plugin in &snapshot.plugins {
        let entry = paths
            .entry(plugin.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(plugin.route_method(), operation(plugin));
        }
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "API Hub",
            "description": "A REST API with plugin-based endpoints",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": server_url, "description": "Local server" }],
        "paths": paths,
    })
}

/// GET /swagger.json
pub async fn swagger(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", state.config.server.port));

    let snapshot = state.plugin_manager.plugin_data().await;
    Json(openapi_document(&snapshot, &format!("http://{host}")))
}
