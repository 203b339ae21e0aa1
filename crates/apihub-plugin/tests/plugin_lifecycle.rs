//! Lifecycle tests for scanning, hot reload, removal, and watch bookkeeping.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apihub_core::config::PluginConfig;
use apihub_plugin::{
    ChangeHint, DirectoryWatcher, FnHandler, FsEvent, HandlerCatalog, ManifestLoader, PluginDescriptor,
    PluginLoader, PluginManager, PluginResponse, PluginResult, RouteTable, ScanRules, WatchManager,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Default)]
struct RecordingWatcher {
    calls: Arc<Mutex<Vec<(&'static str, PathBuf)>>>,
}

impl RecordingWatcher {
    fn count(&self, op: &str, dir: &Path) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(o, d)| *o == op && d == dir)
            .count()
    }
}

impl DirectoryWatcher for RecordingWatcher {
    fn watch(&mut self, dir: &Path) -> PluginResult<()> {
        self.calls.lock().expect("calls lock").push(("watch", dir.to_path_buf()));
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> PluginResult<()> {
        self.calls.lock().expect("calls lock").push(("unwatch", dir.to_path_buf()));
        Ok(())
    }
}

#[derive(Debug)]
struct CountingLoader {
    inner: ManifestLoader,
    loads: AtomicUsize,
}

#[async_trait]
impl PluginLoader for CountingLoader {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    async fn load(&self, path: &Path) -> PluginResult<PluginDescriptor> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(path).await
    }
}

/// Holds every load open for a while after the manifest was read.
#[derive(Debug)]
struct SlowLoader {
    inner: ManifestLoader,
    delay: Duration,
}

#[async_trait]
impl PluginLoader for SlowLoader {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    async fn load(&self, path: &Path) -> PluginResult<PluginDescriptor> {
        let loaded = self.inner.load(path).await;
        tokio::time::sleep(self.delay).await;
        loaded
    }
}

fn catalog() -> Arc<HandlerCatalog> {
    let mut catalog = HandlerCatalog::new();
    catalog.register(
        "echo",
        Arc::new(FnHandler::new("echo", |req| async move {
            Ok(PluginResponse::ok(json!({ "success": true, "path": req.path })))
        })),
    );
    Arc::new(catalog)
}

fn manifest(name: &str, category: &str, path: &str) -> Value {
    json!({
        "name": name,
        "category": category,
        "method": "GET",
        "path": path,
        "description": format!("{name} plugin"),
        "handler": "echo"
    })
}

fn write(root: &Path, relative: &str, value: &Value) -> PathBuf {
    let file = root.join(relative);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(&file, value.to_string()).expect("write manifest");
    file
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    manager: Arc<PluginManager>,
}

fn fixture() -> Fixture {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    let config = PluginConfig {
        directory: root.display().to_string(),
        ..Default::default()
    };
    let manager = Arc::new(PluginManager::new(&config, catalog(), Arc::new(RouteTable::new())));
    Fixture {
        _temp: temp,
        root,
        manager,
    }
}

async fn watching(manager: &Arc<PluginManager>) -> (Arc<WatchManager>, RecordingWatcher, mpsc::UnboundedSender<FsEvent>) {
    let watch = WatchManager::new(Arc::clone(manager), Duration::from_millis(10));
    let backend = RecordingWatcher::default();
    let (tx, rx) = mpsc::unbounded_channel();
    watch.start_with(Box::new(backend.clone()), rx).await;
    (watch, backend, tx)
}

#[tokio::test]
async fn test_startup_scan_groups_by_category() {
    let fx = fixture();
    write(&fx.root, "tools/calculator.json", &manifest("Calculator", "Tools", "/api/tools/calculator"));
    write(&fx.root, "utils/uuid.json", &manifest("UUID", "Utils", "/api/utils/uuid"));
    write(&fx.root, "index.json", &json!({ "not": "a plugin" }));

    let snapshot = fx.manager.load_plugins().await.expect("scan");

    assert_eq!(snapshot.plugins.len(), 2);
    assert_eq!(snapshot.categories.keys().collect::<Vec<_>>(), vec!["Tools", "Utils"]);
    assert!(snapshot.plugin_map.contains_key("tools/calculator"));
    assert!(snapshot.plugin_map.contains_key("utils/uuid"));
}

#[tokio::test]
async fn test_missing_root_aborts_startup() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = PluginConfig {
        directory: temp.path().join("absent").display().to_string(),
        ..Default::default()
    };
    let manager = PluginManager::new(&config, catalog(), Arc::new(RouteTable::new()));
    assert!(manager.load_plugins().await.is_err());
}

#[tokio::test]
async fn test_invalid_plugin_is_skipped() {
    let fx = fixture();
    write(&fx.root, "tools/calculator.json", &manifest("Calculator", "Tools", "/api/tools/calculator"));
    let mut broken = manifest("Broken", "Tools", "/api/tools/broken");
    broken.as_object_mut().expect("object").remove("handler");
    write(&fx.root, "tools/broken.json", &broken);

    let snapshot = fx.manager.load_plugins().await.expect("scan");

    assert_eq!(snapshot.plugins.len(), 1);
    assert!(!snapshot.plugin_map.contains_key("tools/broken"));
}

#[tokio::test]
async fn test_modified_plugin_is_reloaded_in_place() {
    let fx = fixture();
    let file = write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));
    fx.manager.load_plugins().await.expect("scan");
    fx.manager.register_routes().await;
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    let mut edited = manifest("Hello", "Tools", "/api/tools/hello");
    edited["description"] = json!("Says hello, updated");
    std::fs::write(&file, edited.to_string()).expect("rewrite");
    watch.handle_event(FsEvent::new(&file, ChangeHint::Modified)).await;

    let registry = fx.manager.registry();
    assert_eq!(registry.count().await, 1);
    let descriptor = registry.get("tools/hello").await.expect("still loaded");
    assert_eq!(descriptor.description, "Says hello, updated");
    assert!(fx.manager.routes().resolve("GET", "/api/tools/hello").await.is_some());
}

#[tokio::test]
async fn test_new_plugin_file_is_loaded_and_bound() {
    let fx = fixture();
    std::fs::create_dir_all(fx.root.join("tools")).expect("mkdir");
    fx.manager.load_plugins().await.expect("scan");
    fx.manager.register_routes().await;
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    let file = write(&fx.root, "tools/fresh.json", &manifest("Fresh", "Tools", "/api/tools/fresh"));
    watch.handle_event(FsEvent::new(&file, ChangeHint::Created)).await;

    assert!(fx.manager.registry().contains("tools/fresh").await);
    assert!(fx.manager.routes().resolve("GET", "/api/tools/fresh").await.is_some());
}

#[tokio::test]
async fn test_deleted_plugin_is_removed_with_route_and_category() {
    let fx = fixture();
    let file = write(&fx.root, "utils/uuid.json", &manifest("UUID", "Utils", "/api/utils/uuid"));
    write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));
    fx.manager.load_plugins().await.expect("scan");
    fx.manager.register_routes().await;
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    std::fs::remove_file(&file).expect("delete");
    watch.handle_event(FsEvent::new(&file, ChangeHint::Removed)).await;

    let snapshot = fx.manager.plugin_data().await;
    assert!(!snapshot.plugin_map.contains_key("utils/uuid"));
    assert!(!snapshot.categories.contains_key("Utils"));
    assert!(fx.manager.routes().resolve("GET", "/api/utils/uuid").await.is_none());
    assert!(fx.manager.routes().resolve("GET", "/api/tools/hello").await.is_some());
}

#[tokio::test]
async fn test_reload_failure_leaves_plugin_unloaded() {
    let fx = fixture();
    let file = write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));
    fx.manager.load_plugins().await.expect("scan");
    fx.manager.register_routes().await;
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    std::fs::write(&file, "{ broken").expect("corrupt");
    watch.handle_event(FsEvent::new(&file, ChangeHint::Modified)).await;

    assert!(!fx.manager.registry().contains("tools/hello").await);
    assert!(fx.manager.routes().resolve("GET", "/api/tools/hello").await.is_none());
}

#[tokio::test]
async fn test_deleted_directory_cascades_and_releases_watch() {
    let fx = fixture();
    write(&fx.root, "ai/chat.json", &manifest("Chat", "AI", "/api/ai/chat"));
    write(&fx.root, "ai/image.json", &manifest("Image", "AI", "/api/ai/image"));
    write(&fx.root, "ai/nested/text.json", &manifest("Text", "AI", "/api/ai/text"));
    write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));
    fx.manager.load_plugins().await.expect("scan");
    let (watch, backend, _tx) = watching(&fx.manager).await;

    let ai = fx.root.join("ai");
    assert!(watch.is_watching(&ai).await);
    assert!(watch.is_watching(&ai.join("nested")).await);

    std::fs::remove_dir_all(&ai).expect("remove ai");
    watch.handle_event(FsEvent::new(&ai, ChangeHint::Removed)).await;

    let snapshot = fx.manager.plugin_data().await;
    assert_eq!(snapshot.plugins.len(), 1);
    assert!(!snapshot.categories.contains_key("AI"));
    assert!(!watch.is_watching(&ai).await);
    assert!(!watch.is_watching(&ai.join("nested")).await);
    assert_eq!(backend.count("unwatch", &ai), 1);
    assert!(watch.is_watching(&fx.root).await);
}

#[tokio::test]
async fn test_new_directory_is_watched_and_scanned() {
    let fx = fixture();
    fx.manager.load_plugins().await.expect("scan");
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    write(&fx.root, "downloader/url-info.json", &manifest("URL Info", "Downloader", "/api/downloader/url-info"));
    let dir = fx.root.join("downloader");
    watch.handle_event(FsEvent::new(&dir, ChangeHint::Created)).await;

    assert!(watch.is_watching(&dir).await);
    assert!(fx.manager.registry().contains("downloader/url-info").await);
}

#[tokio::test]
async fn test_excluded_directory_is_ignored() {
    let fx = fixture();
    fx.manager.load_plugins().await.expect("scan");
    let (watch, _backend, _tx) = watching(&fx.manager).await;

    write(&fx.root, "node_modules/pkg/plugin.json", &manifest("Hidden", "Hidden", "/api/hidden"));
    let dir = fx.root.join("node_modules");
    watch.handle_event(FsEvent::new(&dir, ChangeHint::Created)).await;

    assert!(!watch.is_watching(&dir).await);
    assert_eq!(fx.manager.plugin_count().await, 0);
}

#[tokio::test]
async fn test_watching_twice_arms_one_watch() {
    let fx = fixture();
    std::fs::create_dir_all(fx.root.join("tools")).expect("mkdir");
    let (watch, backend, _tx) = watching(&fx.manager).await;
    let tools = fx.root.join("tools");

    assert!(!watch.watch_directory(&tools).await);
    assert_eq!(watch.watch_tree(&fx.root).await, 0);
    assert_eq!(backend.count("watch", &tools), 1);
    assert_eq!(backend.count("watch", &fx.root), 1);
}

#[tokio::test]
async fn test_overlapping_reloads_are_coalesced() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    let file = write(&root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));

    let loader = Arc::new(CountingLoader {
        inner: ManifestLoader::new(root.clone(), catalog()),
        loads: AtomicUsize::new(0),
    });
    let manager = Arc::new(PluginManager::with_loader(
        loader.clone(),
        ScanRules::default(),
        Arc::new(RouteTable::new()),
    ));
    let watch = WatchManager::new(manager, Duration::from_millis(50));

    tokio::join!(
        watch.schedule_reload(file.clone()),
        watch.schedule_reload(file.clone()),
        watch.schedule_reload(file.clone()),
        watch.schedule_reload(file.clone()),
    );

    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    assert!(watch.manager().registry().contains("tools/hello").await);
}

#[tokio::test]
async fn test_deletion_during_reload_leaves_plugin_unloaded() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    let file = write(&root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));

    let loader = Arc::new(SlowLoader {
        inner: ManifestLoader::new(root.clone(), catalog()),
        delay: Duration::from_millis(200),
    });
    let manager = Arc::new(PluginManager::with_loader(
        loader,
        ScanRules::default(),
        Arc::new(RouteTable::new()),
    ));
    manager.register_routes().await;
    let watch = WatchManager::new(Arc::clone(&manager), Duration::from_millis(10));

    let reload = tokio::spawn({
        let watch = Arc::clone(&watch);
        let file = file.clone();
        async move { watch.handle_event(FsEvent::new(file, ChangeHint::Modified)).await }
    });

    // Delete while the reload holds a freshly read manifest.
    tokio::time::sleep(Duration::from_millis(80)).await;
    std::fs::remove_file(&file).expect("delete");
    watch.handle_event(FsEvent::new(&file, ChangeHint::Removed)).await;
    reload.await.expect("reload task");

    assert!(!manager.registry().contains("tools/hello").await);
    assert!(manager.routes().resolve("GET", "/api/tools/hello").await.is_none());
}

#[tokio::test]
async fn test_unsupported_method_is_listed_but_not_routed() {
    let fx = fixture();
    let mut fetch = manifest("Fetcher", "Tools", "/api/tools/fetcher");
    fetch["method"] = json!("FETCH");
    write(&fx.root, "tools/fetcher.json", &fetch);
    write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));

    fx.manager.load_plugins().await.expect("scan");
    let bound = fx.manager.register_routes().await;

    let snapshot = fx.manager.plugin_data().await;
    assert!(snapshot.plugin_map.contains_key("tools/fetcher"));
    assert_eq!(snapshot.categories["Tools"].len(), 2);
    assert_eq!(bound, 1);
    assert!(fx.manager.routes().resolve("FETCH", "/api/tools/fetcher").await.is_none());
    assert!(fx.manager.routes().resolve("GET", "/api/tools/hello").await.is_some());
}

#[tokio::test]
async fn test_stop_releases_everything_and_is_idempotent() {
    let fx = fixture();
    std::fs::create_dir_all(fx.root.join("tools")).expect("mkdir");
    let (watch, backend, _tx) = watching(&fx.manager).await;

    watch.stop().await;
    watch.stop().await;

    assert!(watch.watched_directories().await.is_empty());
    assert_eq!(backend.count("unwatch", &fx.root), 1);
    assert_eq!(backend.count("unwatch", &fx.root.join("tools")), 1);
}

#[tokio::test]
async fn test_refresh_rebuilds_registry_from_disk() {
    let fx = fixture();
    let file = write(&fx.root, "tools/hello.json", &manifest("Hello", "Tools", "/api/tools/hello"));
    fx.manager.load_plugins().await.expect("scan");
    fx.manager.register_routes().await;

    std::fs::remove_file(&file).expect("delete");
    write(&fx.root, "utils/uuid.json", &manifest("UUID", "Utils", "/api/utils/uuid"));
    let snapshot = fx.manager.refresh_plugins().await.expect("refresh");

    assert_eq!(snapshot.plugins.len(), 1);
    assert!(snapshot.plugin_map.contains_key("utils/uuid"));
    assert!(fx.manager.routes().resolve("GET", "/api/tools/hello").await.is_none());
    assert!(fx.manager.routes().resolve("GET", "/api/utils/uuid").await.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_native_watcher_picks_up_new_plugin() {
    let fx = fixture();
    std::fs::create_dir_all(fx.root.join("tools")).expect("mkdir");
    fx.manager.load_plugins().await.expect("scan");
    let watch = WatchManager::new(Arc::clone(&fx.manager), Duration::from_millis(50));
    watch.start().await.expect("start watcher");

    write(&fx.root, "tools/live.json", &manifest("Live", "Tools", "/api/tools/live"));

    let mut loaded = false;
    for _ in 0..100 {
        if fx.manager.registry().contains("tools/live").await {
            loaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    watch.stop().await;
    assert!(loaded, "new manifest was not picked up by the native watcher");
}
