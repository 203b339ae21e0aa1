//! Plugin discovery and hot-reload configuration.

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Root directory scanned for plugin manifests.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// File extension (without the dot) that marks a plugin manifest.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Reserved entry-point file name that is never loaded as a plugin.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Directory names skipped during scanning and watching.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    /// Whether to watch the plugin tree and hot-reload on changes.
    #[serde(default = "default_true")]
    pub watch: bool,
    /// Delay before reloading a changed manifest, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            extension: default_extension(),
            index_file: default_index_file(),
            excluded_dirs: default_excluded_dirs(),
            watch: default_true(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./plugins".to_string()
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_index_file() -> String {
    "index.json".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    vec!["node_modules".to_string(), "target".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    100
}
