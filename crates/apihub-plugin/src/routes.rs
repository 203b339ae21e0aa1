//! Route table: binds plugin handlers to `(method, path)` pairs.
//!
//! The axum router is immutable once built, so plugin routes live here and
//! are consulted by the HTTP layer's fallback handler. Binding is keyed by
//! `(method, path)`: a later bind replaces an earlier one. Unbinding is by
//! owner, so removing a plugin never drops a route another plugin took over.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, PluginResult};
use crate::handler::PluginHandler;

/// Lower-case methods the table can dispatch.
pub const SUPPORTED_METHODS: [&str; 7] = ["get", "post", "put", "patch", "delete", "head", "options"];

/// A handler bound to a route.
#[derive(Debug, Clone)]
pub struct BoundRoute {
    /// Identity of the plugin that owns the route.
    pub plugin_id: String,
    /// Lower-case method.
    pub method: String,
    /// Normalized path.
    pub path: String,
    /// Handler to invoke.
    pub handler: Arc<dyn PluginHandler>,
}

/// Dynamic `(method, path)` → handler table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<(String, String), BoundRoute>>,
}

impl RouteTable {
    /// Creates an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `method` (any case) can be bound.
    pub fn supports_method(&self, method: &str) -> bool {
        let method = method.to_ascii_lowercase();
        SUPPORTED_METHODS.contains(&method.as_str())
    }

    /// Binds a descriptor's handler under its method and path.
    pub async fn bind(&self, descriptor: &PluginDescriptor) -> PluginResult<()> {
        let method = descriptor.route_method();
        if !self.supports_method(&method) {
            return Err(PluginError::UnsupportedMethod {
                plugin_id: descriptor.id.clone(),
                method: descriptor.method.clone(),
            });
        }

        let path = normalize_path(&descriptor.path);
        let route = BoundRoute {
            plugin_id: descriptor.id.clone(),
            method: method.clone(),
            path: path.clone(),
            handler: Arc::clone(&descriptor.handler),
        };

        let previous = self
            .routes
            .write()
            .await
            .insert((method.clone(), path.clone()), route);

        if let Some(previous) = previous.filter(|p| p.plugin_id != descriptor.id) {
            warn!(
                method = %descriptor.method,
                path = %path,
                previous_owner = %previous.plugin_id,
                plugin_id = %descriptor.id,
                "Route taken over by another plugin"
            );
        }

        info!(method = %descriptor.method, path = %path, plugin_id = %descriptor.id, "Route registered");
        Ok(())
    }

    /// Unbinds every route owned by `plugin_id`. Returns how many were removed.
    pub async fn unbind_plugin(&self, plugin_id: &str) -> usize {
        let mut routes = self.routes.write().await;
        let before = routes.len();
        routes.retain(|_, route| route.plugin_id != plugin_id);
        before - routes.len()
    }

    /// Finds the route for a request. `HEAD` falls back to a `GET` binding.
    pub async fn resolve(&self, method: &str, path: &str) -> Option<BoundRoute> {
        let method = method.to_ascii_lowercase();
        let path = normalize_path(path);
        let routes = self.routes.read().await;

        routes.get(&(method.clone(), path.clone())).cloned().or_else(|| {
            if method == "head" {
                routes.get(&("get".to_string(), path)).cloned()
            } else {
                None
            }
        })
    }

    /// Returns `(method, path, plugin_id)` for every bound route, sorted.
    pub async fn list(&self) -> Vec<(String, String, String)> {
        let routes = self.routes.read().await;
        let mut listed: Vec<(String, String, String)> = routes
            .values()
            .map(|r| (r.method.clone(), r.path.clone(), r.plugin_id.clone()))
            .collect();
        listed.sort();
        listed
    }

    /// Returns the number of bound routes.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Returns whether no route is bound.
    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }

    /// Unbinds everything.
    pub async fn clear(&self) {
        self.routes.write().await.clear();
    }
}

/// Normalizes a route path: leading slash, no trailing slash except root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::handler::{FnHandler, PluginResponse};

    fn descriptor(id: &str, method: &str, path: &str) -> PluginDescriptor {
        PluginDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category: "Tools".to_string(),
            method: method.to_string(),
            path: path.to_string(),
            params: BTreeMap::new(),
            handler_name: "noop".to_string(),
            handler: Arc::new(FnHandler::new("noop", |_| async {
                Ok(PluginResponse::ok(serde_json::Value::Null))
            })),
            file_path: PathBuf::from(format!("/plugins/{id}.json")),
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/tools/"), "/api/tools");
        assert_eq!(normalize_path("api/tools"), "/api/tools");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[tokio::test]
    async fn test_bind_and_resolve_case_insensitive() {
        let table = RouteTable::new();
        table
            .bind(&descriptor("tools/calculator", "POST", "/api/tools/calculator"))
            .await
            .expect("bind");

        let route = table.resolve("post", "/api/tools/calculator/").await;
        assert_eq!(route.map(|r| r.plugin_id), Some("tools/calculator".to_string()));
        assert!(table.resolve("GET", "/api/tools/calculator").await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected() {
        let table = RouteTable::new();
        let result = table.bind(&descriptor("tools/x", "FETCH", "/api/x")).await;
        assert!(matches!(result, Err(PluginError::UnsupportedMethod { .. })));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_conflicting_bind_replaces_and_unbind_respects_owner() {
        let table = RouteTable::new();
        table.bind(&descriptor("a", "GET", "/api/same")).await.expect("bind a");
        table.bind(&descriptor("b", "GET", "/api/same")).await.expect("bind b");

        assert_eq!(table.len().await, 1);
        assert_eq!(table.unbind_plugin("a").await, 0);
        assert_eq!(
            table.resolve("GET", "/api/same").await.map(|r| r.plugin_id),
            Some("b".to_string())
        );
        assert_eq!(table.unbind_plugin("b").await, 1);
        assert!(table.resolve("GET", "/api/same").await.is_none());
    }

    #[tokio::test]
    async fn test_rebinding_same_descriptor_is_idempotent() {
        let table = RouteTable::new();
        let d = descriptor("utils/uuid", "GET", "/api/utils/uuid");
        table.bind(&d).await.expect("first");
        table.bind(&d).await.expect("second");
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_head_falls_back_to_get() {
        let table = RouteTable::new();
        table.bind(&descriptor("tools/hello", "GET", "/api/tools/hello")).await.expect("bind");
        assert!(table.resolve("HEAD", "/api/tools/hello").await.is_some());
    }
}
