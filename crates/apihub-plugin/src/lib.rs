//! # apihub-plugin
//!
//! Plugin framework for API Hub. Provides:
//!
//! - JSON manifest loading with handlers resolved from a compiled-in catalog
//! - Recursive directory scanning with exclusion rules
//! - A registry indexed by identity and by category
//! - A dynamic `(method, path)` route table consulted by the HTTP layer
//! - Filesystem watching with debounced, coalesced hot reload

pub mod descriptor;
pub mod error;
pub mod handler;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod routes;
pub mod scanner;
pub mod watcher;

pub use descriptor::{PluginDescriptor, plugin_id};
pub use error::{PluginError, PluginResult};
pub use handler::{FnHandler, HandlerCatalog, HandlerFactory, PluginHandler, PluginRequest, PluginResponse};
pub use loader::{ManifestLoader, PluginLoader};
pub use manager::PluginManager;
pub use registry::{PluginRegistry, PluginSnapshot};
pub use routes::{BoundRoute, RouteTable};
pub use scanner::{DirectoryScanner, ScanRules};
pub use watcher::{ChangeHint, DirectoryWatcher, FsEvent, NotifyWatcher, WatchManager};
