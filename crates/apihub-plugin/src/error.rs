//! Error type for the plugin subsystem.
//!
//! Every failure that can happen while loading, binding, or watching a
//! plugin is captured here and recovered locally by the caller. Only the
//! initial scan of the plugin root escalates, via `From<PluginError> for
//! AppError`.

use std::path::PathBuf;

use apihub_core::error::AppError;
use thiserror::Error;

/// Unified error type for plugin loading, binding, and watching.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The manifest could not be read or parsed.
    #[error("Failed to load plugin '{}': {reason}", path.display())]
    Load {
        /// Manifest path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The manifest parsed but does not satisfy the descriptor shape.
    #[error("Invalid plugin format '{}': {reason}", path.display())]
    Invalid {
        /// Manifest path.
        path: PathBuf,
        /// Which check failed.
        reason: String,
    },

    /// The manifest names a handler that is not in the catalog.
    #[error("Plugin '{}' references unknown handler '{handler}'", path.display())]
    UnknownHandler {
        /// Manifest path.
        path: PathBuf,
        /// The handler name that could not be resolved.
        handler: String,
    },

    /// The descriptor declares a method the router cannot bind.
    #[error("Unsupported HTTP method '{method}' for plugin '{plugin_id}'")]
    UnsupportedMethod {
        /// Plugin identity.
        plugin_id: String,
        /// The declared method.
        method: String,
    },

    /// A directory could not be armed for change notifications.
    #[error("Failed to watch directory '{}': {source}", path.display())]
    WatchSetup {
        /// Directory path.
        path: PathBuf,
        /// Underlying watcher error.
        #[source]
        source: notify::Error,
    },

    /// A directory could not be listed.
    #[error("Failed to scan directory '{}': {source}", path.display())]
    Scan {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    /// Creates a load error for the given path.
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation error for the given path.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        match &err {
            PluginError::Scan { .. } => AppError::storage(err.to_string()),
            _ => AppError::plugin(err.to_string()),
        }
    }
}

/// Convenience alias for plugin subsystem results.
pub type PluginResult<T> = Result<T, PluginError>;
