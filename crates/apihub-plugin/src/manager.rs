//! Plugin manager: drives loading, reloading, removal, and route binding.
//!
//! The manager ties the loader, scanner, registry, and route table
//! together. Per-file failures are logged and swallowed here; only a
//! failure to read the plugin root during a full scan reaches the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use apihub_core::config::PluginConfig;
use apihub_core::result::AppResult;
use tracing::{error, info, warn};

use crate::descriptor::{PluginDescriptor, plugin_id};
use crate::error::PluginResult;
use crate::handler::HandlerCatalog;
use crate::loader::{ManifestLoader, PluginLoader};
use crate::registry::{PluginRegistry, PluginSnapshot};
use crate::routes::RouteTable;
use crate::scanner::{DirectoryScanner, ScanRules};

/// Manages the full lifecycle of plugins loaded from a directory tree.
#[derive(Debug)]
pub struct PluginManager {
    /// Absolute plugin root.
    root: PathBuf,
    /// Loader for individual manifests.
    loader: Arc<dyn PluginLoader>,
    /// Tree walker.
    scanner: DirectoryScanner,
    /// Live descriptors.
    registry: Arc<PluginRegistry>,
    /// Dynamic routes.
    routes: Arc<RouteTable>,
    /// Whether newly loaded descriptors are bound immediately.
    routes_attached: AtomicBool,
}

impl PluginManager {
    /// Creates a manager loading JSON manifests from `config.directory`.
    pub fn new(
        config: &PluginConfig,
        catalog: Arc<HandlerCatalog>,
        routes: Arc<RouteTable>,
    ) -> Self {
        let root = absolute_root(Path::new(&config.directory));
        let loader = Arc::new(ManifestLoader::new(root.clone(), catalog));
        Self::with_loader(loader, ScanRules::from_config(config), routes)
    }

    /// Creates a manager around an arbitrary loader.
    pub fn with_loader(
        loader: Arc<dyn PluginLoader>,
        rules: ScanRules,
        routes: Arc<RouteTable>,
    ) -> Self {
        Self {
            root: loader.root().to_path_buf(),
            loader,
            scanner: DirectoryScanner::new(rules),
            registry: Arc::new(PluginRegistry::new()),
            routes,
            routes_attached: AtomicBool::new(false),
        }
    }

    /// Returns the absolute plugin root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the scan rules.
    pub fn rules(&self) -> &ScanRules {
        self.scanner.rules()
    }

    /// Returns the tree walker.
    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Returns the route table.
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Derives the identity a manifest at `path` would have.
    pub fn plugin_id_for(&self, path: &Path) -> String {
        plugin_id(&self.root, path)
    }

    /// Scans the whole plugin root. A missing or unreadable root is an error.
    pub async fn load_plugins(&self) -> AppResult<PluginSnapshot> {
        info!(root = %self.root.display(), "Loading plugins");
        let loaded = self.scan_directory(&self.root).await?;
        info!(count = loaded, "Plugins loaded");
        Ok(self.plugin_data().await)
    }

    /// Scans `dir` recursively and installs every valid manifest found.
    ///
    /// Returns the number of descriptors installed.
    pub async fn scan_directory(&self, dir: &Path) -> PluginResult<usize> {
        let report = self.scanner.scan(dir, self.loader.as_ref()).await?;
        let loaded = report.loaded.len();

        for descriptor in report.loaded {
            self.install(descriptor).await;
        }

        if !report.failures.is_empty() {
            warn!(
                dir = %dir.display(),
                failed = report.failures.len(),
                "Some plugins failed to load"
            );
        }

        Ok(loaded)
    }

    /// Loads one manifest and installs it, replacing any previous version.
    pub async fn load_plugin(&self, path: &Path) -> PluginResult<PluginDescriptor> {
        match self.loader.load(path).await {
            Ok(descriptor) => {
                self.install(descriptor.clone()).await;
                Ok(descriptor)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid plugin");
                Err(e)
            }
        }
    }

    /// Removes the current descriptor for `path`, then loads it again.
    ///
    /// A failed reload leaves no descriptor and no route for that identity.
    pub async fn reload_plugin(&self, path: &Path) -> PluginResult<PluginDescriptor> {
        let id = self.plugin_id_for(path);
        self.remove_plugin(&id).await;

        let descriptor = self.load_plugin(path).await?;
        info!(plugin_id = %id, path = %path.display(), "Plugin reloaded");
        Ok(descriptor)
    }

    /// Removes a plugin and unbinds its routes.
    pub async fn remove_plugin(&self, plugin_id: &str) -> Option<PluginDescriptor> {
        let removed = self.registry.remove(plugin_id).await;
        self.routes.unbind_plugin(plugin_id).await;
        removed
    }

    /// Removes every plugin whose manifest lived at or below `dir`.
    pub async fn remove_under(&self, dir: &Path) -> Vec<PluginDescriptor> {
        let removed = self.registry.remove_under(dir).await;
        for descriptor in &removed {
            self.routes.unbind_plugin(&descriptor.id).await;
        }
        removed
    }

    /// Binds every registered descriptor and keeps binding future loads.
    ///
    /// Safe to call repeatedly. Returns the number of routes bound.
    pub async fn register_routes(&self) -> usize {
        self.routes_attached.store(true, Ordering::SeqCst);

        let mut bound = 0;
        for descriptor in self.registry.all().await {
            if self.bind(&descriptor).await {
                bound += 1;
            }
        }
        bound
    }

    /// Drops every descriptor and route, then rescans the whole root.
    pub async fn refresh_plugins(&self) -> AppResult<PluginSnapshot> {
        info!("Manually refreshing all plugins");

        self.registry.clear().await;
        self.routes.clear().await;

        let snapshot = self.load_plugins().await?;
        info!(count = snapshot.plugins.len(), "Plugin refresh complete");
        Ok(snapshot)
    }

    /// Returns an immutable view of the registry.
    pub async fn plugin_data(&self) -> PluginSnapshot {
        self.registry.snapshot().await
    }

    /// Returns the number of loaded plugins.
    pub async fn plugin_count(&self) -> usize {
        self.registry.count().await
    }

    async fn install(&self, descriptor: PluginDescriptor) {
        if self.registry.insert(descriptor.clone()).await.is_some() {
            self.routes.unbind_plugin(&descriptor.id).await;
        }

        if self.routes_attached.load(Ordering::SeqCst) {
            self.bind(&descriptor).await;
        }
    }

    async fn bind(&self, descriptor: &PluginDescriptor) -> bool {
        match self.routes.bind(descriptor).await {
            Ok(()) => true,
            Err(e) => {
                warn!(plugin_id = %descriptor.id, error = %e, "Route not registered");
                false
            }
        }
    }
}

fn absolute_root(dir: &Path) -> PathBuf {
    std::path::absolute(dir).unwrap_or_else(|e| {
        error!(dir = %dir.display(), error = %e, "Cannot resolve plugin root, using it as given");
        dir.to_path_buf()
    })
}
