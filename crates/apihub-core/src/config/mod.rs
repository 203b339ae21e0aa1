//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a default, so an empty configuration
//! directory still yields a runnable server.

pub mod ai;
pub mod app;
pub mod logging;
pub mod plugin;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::ai::AiConfig;
pub use self::app::{CorsConfig, ServerConfig};
pub use self::logging::LoggingConfig;
pub use self::plugin::PluginConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "APIHUB";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Plugin discovery and hot-reload settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// External AI API settings used by the AI handlers.
    #[serde(default)]
    pub ai: AiConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `APIHUB_` (nested keys separated by `__`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from_dir(Path::new("config"), env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from_dir(dir: &Path, env: &str) -> Result<Self, AppError> {
        let default_file = dir.join("default");
        let env_file = dir.join(env);

        let config = config::Config::builder()
            .add_source(config::File::with_name(&default_file.to_string_lossy()).required(false))
            .add_source(config::File::with_name(&env_file.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_empty_directory_uses_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load_from_dir(temp.path(), "test").expect("load");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.plugins.directory, "./plugins");
        assert_eq!(config.plugins.debounce_ms, 100);
        assert!(config.plugins.watch);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_environment_overlay_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            temp.path().join("default.toml"),
            "[server]\nport = 4000\n\n[plugins]\ndirectory = \"/srv/plugins\"\n",
        )
        .expect("write default");
        std::fs::write(temp.path().join("staging.toml"), "[server]\nport = 5000\n")
            .expect("write overlay");

        let config = AppConfig::load_from_dir(temp.path(), "staging").expect("load");

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.plugins.directory, "/srv/plugins");
    }
}
