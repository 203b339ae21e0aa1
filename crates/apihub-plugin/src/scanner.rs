//! Directory scanner: walks the plugin tree and drives the loader.
//!
//! The walk uses an explicit worklist instead of recursion. A directory
//! that cannot be listed is logged and skipped, except for the directory
//! the scan was started from, whose failure is returned to the caller.

use std::path::{Path, PathBuf};

use apihub_core::config::PluginConfig;
use tracing::{debug, warn};

use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, PluginResult};
use crate::loader::PluginLoader;

/// Rules deciding which entries are plugins and which directories to skip.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Manifest extension without the dot.
    pub extension: String,
    /// Reserved entry-point file name.
    pub index_file: String,
    /// Directory names never descended into.
    pub excluded_dirs: Vec<String>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self::from_config(&PluginConfig::default())
    }
}

impl ScanRules {
    /// Builds rules from the plugin configuration section.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self {
            extension: config.extension.trim_start_matches('.').to_string(),
            index_file: config.index_file.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }

    /// Returns whether the file name marks a plugin manifest.
    pub fn is_plugin_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name != self.index_file
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.extension)
    }

    /// Returns whether the directory name is excluded from scanning.
    pub fn is_excluded_dir(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.excluded_dirs.iter().any(|ex| ex == name))
    }
}

/// Result of walking a directory tree.
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    /// Every non-excluded directory visited, starting with the scan root.
    pub directories: Vec<PathBuf>,
    /// Plugin manifests found, in walk order.
    pub plugin_files: Vec<PathBuf>,
}

/// Outcome of scanning a tree and loading every manifest in it.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Directories visited.
    pub directories: Vec<PathBuf>,
    /// Successfully loaded descriptors.
    pub loaded: Vec<PluginDescriptor>,
    /// Per-file failures; these never abort the scan.
    pub failures: Vec<PluginError>,
}

/// Recursively enumerates plugin manifests.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    rules: ScanRules,
}

impl DirectoryScanner {
    /// Creates a scanner with the given rules.
    pub fn new(rules: ScanRules) -> Self {
        Self { rules }
    }

    /// Returns the scan rules.
    pub fn rules(&self) -> &ScanRules {
        &self.rules
    }

    /// Walks `dir` and everything below it.
    pub async fn discover(&self, dir: &Path) -> PluginResult<Discovery> {
        let mut discovery = Discovery::default();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(source) if current == dir => {
                    return Err(PluginError::Scan {
                        path: current,
                        source,
                    });
                }
                Err(e) => {
                    warn!(dir = %current.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            };

            discovery.directories.push(current.clone());

            let mut children = Vec::new();
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => children.push(entry.path()),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(dir = %current.display(), error = %e, "Failed to read directory entry");
                        break;
                    }
                }
            }
            children.sort();

            let mut subdirs = Vec::new();
            for child in children {
                let Ok(metadata) = tokio::fs::symlink_metadata(&child).await else {
                    continue;
                };

                if metadata.is_dir() {
                    if self.rules.is_excluded_dir(&child) {
                        debug!(dir = %child.display(), "Skipping excluded directory");
                    } else {
                        subdirs.push(child);
                    }
                } else if self.rules.is_plugin_file(&child) && is_regular_file(&child).await {
                    discovery.plugin_files.push(child);
                }
            }

            // Reverse so the worklist pops subdirectories in name order.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(discovery)
    }

    /// Walks `dir` and loads every manifest found with `loader`.
    pub async fn scan(&self, dir: &Path, loader: &dyn PluginLoader) -> PluginResult<ScanReport> {
        let discovery = self.discover(dir).await?;
        let mut report = ScanReport {
            directories: discovery.directories,
            ..Default::default()
        };

        for file in discovery.plugin_files {
            match loader.load(&file).await {
                Ok(descriptor) => report.loaded.push(descriptor),
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping plugin that failed to load");
                    report.failures.push(e);
                }
            }
        }

        Ok(report)
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
