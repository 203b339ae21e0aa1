//! Manifest loader: turns a plugin manifest on disk into a descriptor.
//!
//! The manifest is re-read from disk on every call, so a reload always
//! observes the current file content. Failures never escape as panics; the
//! caller receives a [`PluginError`] describing why the file was rejected.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::descriptor::{PluginDescriptor, plugin_id};
use crate::error::{PluginError, PluginResult};
use crate::handler::HandlerCatalog;

/// Capability to load an executable plugin unit from a path.
#[async_trait]
pub trait PluginLoader: Send + Sync + fmt::Debug {
    /// Root directory that identities are derived relative to.
    fn root(&self) -> &Path;

    /// Loads and validates the plugin at `path`.
    async fn load(&self, path: &Path) -> PluginResult<PluginDescriptor>;
}

/// Loads JSON plugin manifests and resolves their handlers from a catalog.
#[derive(Debug)]
pub struct ManifestLoader {
    /// Plugin root directory.
    root: PathBuf,
    /// Handlers available to manifests.
    catalog: Arc<HandlerCatalog>,
}

impl ManifestLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    /// Validates manifest `content` as if it had been read from `path`.
    pub fn parse(&self, path: &Path, content: &str) -> PluginResult<PluginDescriptor> {
        let manifest: Value = serde_json::from_str(content)
            .map_err(|e| PluginError::load(path, format!("malformed JSON: {e}")))?;

        let fields = manifest
            .as_object()
            .ok_or_else(|| PluginError::invalid(path, "manifest must be a JSON object"))?;

        let name = required_string(path, fields, "name")?;
        let category = required_string(path, fields, "category")?;
        let method = required_string(path, fields, "method")?;
        let route = required_string(path, fields, "path")?;

        let description = fields
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let handler_name = fields
            .get("handler")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::invalid(path, "'handler' must name a registered handler"))?
            .to_string();

        let options = fields.get("options").cloned().unwrap_or(Value::Null);
        let handler = match self.catalog.build(&handler_name, &options) {
            Some(Ok(handler)) => handler,
            Some(Err(e)) => {
                return Err(PluginError::invalid(
                    path,
                    format!("handler '{handler_name}' rejected its options: {}", e.message),
                ));
            }
            None => {
                return Err(PluginError::UnknownHandler {
                    path: path.to_path_buf(),
                    handler: handler_name,
                });
            }
        };

        Ok(PluginDescriptor {
            id: plugin_id(&self.root, path),
            name,
            description,
            category,
            method: method.trim().to_ascii_uppercase(),
            path: route,
            params: params_of(fields),
            handler_name,
            handler,
            file_path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl PluginLoader for ManifestLoader {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn load(&self, path: &Path) -> PluginResult<PluginDescriptor> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::load(path, e.to_string()))?;
        self.parse(path, &content)
    }
}

fn required_string(path: &Path, fields: &Map<String, Value>, key: &str) -> PluginResult<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PluginError::invalid(path, format!("'{key}' must be a string")))
}

fn params_of(fields: &Map<String, Value>) -> BTreeMap<String, String> {
    let Some(params) = fields.get("params").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    params
        .iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), text)
        })
        .collect()
}
