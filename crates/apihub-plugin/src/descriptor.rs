//! Plugin descriptor: the validated, routable representation of a plugin.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::handler::PluginHandler;

/// One routable capability loaded from a manifest.
///
/// The serialized shape is the wire contract of the plugin listing
/// endpoint and the OpenAPI generator; field names must stay stable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Identity derived from the manifest path relative to the plugin root.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Grouping category.
    pub category: String,
    /// Upper-case HTTP method as declared.
    pub method: String,
    /// Route path, e.g. `/api/tools/calculator`.
    pub path: String,
    /// Parameter name → human-readable constraint, documentation only.
    pub params: BTreeMap<String, String>,
    /// Name of the catalog handler backing this plugin.
    #[serde(rename = "handler")]
    pub handler_name: String,
    /// The executable handler.
    #[serde(skip)]
    pub handler: Arc<dyn PluginHandler>,
    /// Absolute path of the manifest this descriptor was loaded from.
    pub file_path: PathBuf,
}

impl PluginDescriptor {
    /// Lower-case method used as the dispatch key.
    pub fn route_method(&self) -> String {
        self.method.to_ascii_lowercase()
    }

    /// Returns whether the manifest lives at or below `dir`.
    pub fn is_nested_under(&self, dir: &Path) -> bool {
        self.file_path.starts_with(dir)
    }
}

/// Derives a plugin identity from its manifest path.
///
/// The identity is the path relative to `root`, joined with `/` and with
/// the final extension stripped, so `<root>/tools/calculator.json` becomes
/// `tools/calculator` on every platform.
pub fn plugin_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .with_extension("")
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
