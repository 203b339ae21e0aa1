//! Plugin registry: the live set of descriptors and their category index.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::descriptor::PluginDescriptor;

/// Immutable view of the registry, serialized by the listing endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSnapshot {
    /// Every registered descriptor, ordered by identity.
    pub plugins: Vec<PluginDescriptor>,
    /// Category → members in insertion order.
    pub categories: BTreeMap<String, Vec<PluginDescriptor>>,
    /// Identity → descriptor.
    pub plugin_map: BTreeMap<String, PluginDescriptor>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Plugin ID → descriptor.
    by_identity: HashMap<String, PluginDescriptor>,
    /// Category → plugin IDs in insertion order; never empty.
    by_category: HashMap<String, Vec<String>>,
}

impl RegistryState {
    fn remove(&mut self, plugin_id: &str) -> Option<PluginDescriptor> {
        let descriptor = self.by_identity.remove(plugin_id)?;

        if let Some(members) = self.by_category.get_mut(&descriptor.category) {
            members.retain(|id| id != plugin_id);
            if members.is_empty() {
                self.by_category.remove(&descriptor.category);
            }
        }

        Some(descriptor)
    }
}

/// Registry of all loaded plugins.
///
/// Both indexes live behind one lock so every mutation leaves them
/// consistent: each descriptor in `by_category[c]` has category `c`, and
/// the category index covers exactly the identity index.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor, replacing any descriptor with the same identity.
    ///
    /// Returns the replaced descriptor, if any.
    pub async fn insert(&self, descriptor: PluginDescriptor) -> Option<PluginDescriptor> {
        let mut state = self.state.write().await;
        let replaced = state.remove(&descriptor.id);

        state
            .by_category
            .entry(descriptor.category.clone())
            .or_default()
            .push(descriptor.id.clone());

        info!(
            plugin_id = %descriptor.id,
            name = %descriptor.name,
            category = %descriptor.category,
            "Plugin loaded"
        );

        state.by_identity.insert(descriptor.id.clone(), descriptor);
        replaced
    }

    /// Removes a descriptor by identity.
    pub async fn remove(&self, plugin_id: &str) -> Option<PluginDescriptor> {
        let removed = self.state.write().await.remove(plugin_id);
        if let Some(descriptor) = &removed {
            info!(plugin_id = %plugin_id, name = %descriptor.name, "Plugin removed");
        }
        removed
    }

    /// Removes every descriptor whose manifest lives at or below `dir`.
    pub async fn remove_under(&self, dir: &Path) -> Vec<PluginDescriptor> {
        let mut state = self.state.write().await;

        let ids: Vec<String> = state
            .by_identity
            .values()
            .filter(|d| d.is_nested_under(dir))
            .map(|d| d.id.clone())
            .collect();

        let removed: Vec<PluginDescriptor> = ids.iter().filter_map(|id| state.remove(id)).collect();

        for descriptor in &removed {
            info!(plugin_id = %descriptor.id, name = %descriptor.name, "Plugin removed");
        }
        removed
    }

    /// Removes everything.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.by_identity.clear();
        state.by_category.clear();
    }

    /// Gets a descriptor by identity.
    pub async fn get(&self, plugin_id: &str) -> Option<PluginDescriptor> {
        self.state.read().await.by_identity.get(plugin_id).cloned()
    }

    /// Checks whether a plugin is registered.
    pub async fn contains(&self, plugin_id: &str) -> bool {
        self.state.read().await.by_identity.contains_key(plugin_id)
    }

    /// Returns plugin count.
    pub async fn count(&self) -> usize {
        self.state.read().await.by_identity.len()
    }

    /// Returns all descriptors ordered by identity.
    pub async fn all(&self) -> Vec<PluginDescriptor> {
        let state = self.state.read().await;
        let mut plugins: Vec<PluginDescriptor> = state.by_identity.values().cloned().collect();
        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        plugins
    }

    /// Returns a detached copy of both indexes.
    pub async fn snapshot(&self) -> PluginSnapshot {
        let state = self.state.read().await;

        let plugin_map: BTreeMap<String, PluginDescriptor> = state
            .by_identity
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();

        let categories = state
            .by_category
            .iter()
            .map(|(category, ids)| {
                let members = ids
                    .iter()
                    .filter_map(|id| state.by_identity.get(id).cloned())
                    .collect();
                (category.clone(), members)
            })
            .collect();

        PluginSnapshot {
            plugins: plugin_map.values().cloned().collect(),
            categories,
            plugin_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::handler::{FnHandler, PluginResponse};

    fn descriptor(id: &str, category: &str) -> PluginDescriptor {
        PluginDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category: category.to_string(),
            method: "GET".to_string(),
            path: format!("/api/{id}"),
            params: BTreeMap::new(),
            handler_name: "noop".to_string(),
            handler: Arc::new(FnHandler::new("noop", |_| async {
                Ok(PluginResponse::ok(serde_json::Value::Null))
            })),
            file_path: PathBuf::from(format!("/plugins/{id}.json")),
        }
    }

    #[tokio::test]
    async fn test_insert_indexes_by_identity_and_category() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("tools/calculator", "Tools")).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.plugins.len(), 1);
        assert!(snapshot.plugin_map.contains_key("tools/calculator"));
        assert_eq!(snapshot.categories["Tools"].len(), 1);
    }

    #[tokio::test]
    async fn test_reinsert_same_identity_keeps_single_membership() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("tools/calculator", "Tools")).await;
        let replaced = registry.insert(descriptor("tools/calculator", "Tools")).await;

        assert!(replaced.is_some());
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.plugins.len(), 1);
        assert_eq!(snapshot.categories["Tools"].len(), 1);
    }

    #[tokio::test]
    async fn test_reinsert_with_new_category_moves_membership() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("tools/calculator", "Tools")).await;
        registry.insert(descriptor("tools/calculator", "Math")).await;

        let snapshot = registry.snapshot().await;
        assert!(!snapshot.categories.contains_key("Tools"));
        assert_eq!(snapshot.categories["Math"].len(), 1);
    }

    #[tokio::test]
    async fn test_remove_deletes_empty_category() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("utils/uuid", "Utils")).await;
        registry.insert(descriptor("tools/hello", "Tools")).await;

        assert!(registry.remove("utils/uuid").await.is_some());
        assert!(registry.remove("utils/uuid").await.is_none());

        let snapshot = registry.snapshot().await;
        assert!(!snapshot.categories.contains_key("Utils"));
        assert!(!snapshot.plugin_map.contains_key("utils/uuid"));
        assert_eq!(snapshot.categories["Tools"].len(), 1);
    }

    #[tokio::test]
    async fn test_category_keeps_insertion_order() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("tools/zeta", "Tools")).await;
        registry.insert(descriptor("tools/alpha", "Tools")).await;

        let snapshot = registry.snapshot().await;
        let ids: Vec<&str> = snapshot.categories["Tools"]
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["tools/zeta", "tools/alpha"]);
    }

    #[tokio::test]
    async fn test_remove_under_directory() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("ai/chat", "AI")).await;
        registry.insert(descriptor("ai/image", "AI")).await;
        registry.insert(descriptor("tools/hello", "Tools")).await;

        let removed = registry.remove_under(Path::new("/plugins/ai")).await;

        assert_eq!(removed.len(), 2);
        assert_eq!(registry.count().await, 1);
        assert!(!registry.snapshot().await.categories.contains_key("AI"));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = PluginRegistry::new();
        registry.insert(descriptor("tools/hello", "Tools")).await;
        let mut snapshot = registry.snapshot().await;
        snapshot.plugins.clear();
        snapshot.categories.clear();

        assert_eq!(registry.snapshot().await.plugins.len(), 1);
    }
}
