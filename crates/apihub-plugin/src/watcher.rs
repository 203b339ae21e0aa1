//! Filesystem watch manager: keeps the registry in sync with the plugin tree.
//!
//! One non-recursive watch is held per directory (the root plus every
//! discovered subdirectory). Raw notifications are forwarded over a channel
//! and each one is handled on its own task, so unrelated paths reload
//! concurrently. Reloads of the same identity go through a gate that allows
//! one in-flight reload and coalesces anything arriving meanwhile into a
//! single follow-up.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{PluginError, PluginResult};
use crate::manager::PluginManager;

/// Best-effort change classification reported by the OS.
///
/// Only used for logging; handling always re-checks the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeHint {
    /// Entry appeared.
    Created,
    /// Entry content or metadata changed.
    Modified,
    /// Entry disappeared.
    Removed,
    /// Anything else.
    Other,
}

impl From<&EventKind> for ChangeHint {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(_) | EventKind::Access(_) => Self::Modified,
            EventKind::Remove(_) => Self::Removed,
            _ => Self::Other,
        }
    }
}

/// A change notification for one entry inside a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Reported change kind.
    pub hint: ChangeHint,
}

impl FsEvent {
    /// Creates an event.
    pub fn new(path: impl Into<PathBuf>, hint: ChangeHint) -> Self {
        Self {
            path: path.into(),
            hint,
        }
    }
}

/// Primitive that arms and releases a watch on a single directory.
pub trait DirectoryWatcher: Send + fmt::Debug {
    /// Starts watching `dir` (non-recursively).
    fn watch(&mut self, dir: &Path) -> PluginResult<()>;

    /// Stops watching `dir`.
    fn unwatch(&mut self, dir: &Path) -> PluginResult<()>;
}

/// [`DirectoryWatcher`] backed by the platform's native notification API.
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
}

impl fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatcher").finish_non_exhaustive()
    }
}

impl NotifyWatcher {
    /// Creates a watcher forwarding every relevant notification to `events`.
    pub fn new(events: mpsc::UnboundedSender<FsEvent>) -> notify::Result<Self> {
        let inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_read_only_access(&event.kind) {
                    return;
                }
                let hint = ChangeHint::from(&event.kind);
                for path in event.paths {
                    if events.send(FsEvent::new(path, hint)).is_err() {
                        debug!("Watch event channel closed");
                        return;
                    }
                }
            }
            Err(e) => warn!(error = %e, "Filesystem watcher error"),
        })?;

        Ok(Self { inner })
    }
}

impl DirectoryWatcher for NotifyWatcher {
    fn watch(&mut self, dir: &Path) -> PluginResult<()> {
        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| PluginError::WatchSetup {
                path: dir.to_path_buf(),
                source,
            })
    }

    fn unwatch(&mut self, dir: &Path) -> PluginResult<()> {
        self.inner
            .unwatch(dir)
            .map_err(|source| PluginError::WatchSetup {
                path: dir.to_path_buf(),
                source,
            })
    }
}

fn is_read_only_access(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Access(access) if *access != AccessKind::Close(AccessMode::Write))
}

#[derive(Debug, Default)]
struct WatchSet {
    backend: Option<Box<dyn DirectoryWatcher>>,
    watched: BTreeSet<PathBuf>,
}

/// Reacts to filesystem notifications under the plugin root.
#[derive(Debug)]
pub struct WatchManager {
    /// Plugin lifecycle operations.
    manager: Arc<PluginManager>,
    /// Backend plus the set of watched directories.
    watch_set: Mutex<WatchSet>,
    /// Delay before reloading a changed manifest.
    debounce: Duration,
    /// Plugin ID → whether another reload was requested while one runs.
    reloads: Mutex<HashMap<String, bool>>,
    /// Event dispatcher task.
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl WatchManager {
    /// Creates a watch manager. Nothing is watched until [`start`](Self::start).
    pub fn new(manager: Arc<PluginManager>, debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            manager,
            watch_set: Mutex::new(WatchSet::default()),
            debounce,
            reloads: Mutex::new(HashMap::new()),
            dispatcher: Mutex::new(None),
        })
    }

    /// Returns the plugin manager driven by this watcher.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Watches the plugin tree using native notifications.
    ///
    /// Returns the number of directories watched.
    pub async fn start(self: &Arc<Self>) -> PluginResult<usize> {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = NotifyWatcher::new(tx).map_err(|source| PluginError::WatchSetup {
            path: self.manager.root().to_path_buf(),
            source,
        })?;
        Ok(self.start_with(Box::new(backend), rx).await)
    }

    /// Watches the plugin tree with an explicit backend and event source.
    pub async fn start_with(
        self: &Arc<Self>,
        backend: Box<dyn DirectoryWatcher>,
        events: mpsc::UnboundedReceiver<FsEvent>,
    ) -> usize {
        self.watch_set.lock().await.backend = Some(backend);

        let handle = tokio::spawn(dispatch_events(Arc::downgrade(self), events));
        if let Some(previous) = self.dispatcher.lock().await.replace(handle) {
            previous.abort();
        }

        let root = self.manager.root().to_path_buf();
        let watched = self.watch_tree(&root).await;
        info!(root = %root.display(), directories = watched, "File watching enabled");
        watched
    }

    /// Watches a single directory. Returns `false` if it was already watched
    /// or the watch could not be armed.
    pub async fn watch_directory(&self, dir: &Path) -> bool {
        let mut guard = self.watch_set.lock().await;
        let set = &mut *guard;

        if set.watched.contains(dir) {
            return false;
        }
        let Some(backend) = set.backend.as_mut() else {
            debug!(dir = %dir.display(), "Watcher not started, ignoring watch request");
            return false;
        };

        match backend.watch(dir) {
            Ok(()) => {
                set.watched.insert(dir.to_path_buf());
                info!(dir = %dir.display(), "Watching directory");
                true
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Directory will not be monitored");
                false
            }
        }
    }

    /// Watches `dir` and every non-excluded directory below it.
    ///
    /// Returns the number of directories newly watched.
    pub async fn watch_tree(&self, dir: &Path) -> usize {
        let directories = match self.manager.scanner().discover(dir).await {
            Ok(discovery) => discovery.directories,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot walk directory for watching");
                return 0;
            }
        };

        let mut added = 0;
        for directory in directories {
            if self.watch_directory(&directory).await {
                added += 1;
            }
        }
        added
    }

    /// Returns whether `dir` is in the watch set.
    pub async fn is_watching(&self, dir: &Path) -> bool {
        self.watch_set.lock().await.watched.contains(dir)
    }

    /// Returns the watch set, sorted.
    pub async fn watched_directories(&self) -> Vec<PathBuf> {
        self.watch_set.lock().await.watched.iter().cloned().collect()
    }

    /// Handles one notification to completion.
    pub async fn handle_event(&self, event: FsEvent) {
        let FsEvent { path, hint } = event;
        let rules = self.manager.rules();
        debug!(path = %path.display(), hint = ?hint, "Filesystem change");

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                if rules.is_excluded_dir(&path) {
                    return;
                }
                info!(dir = %path.display(), "Directory detected");
                self.watch_tree(&path).await;
                if let Err(e) = self.manager.scan_directory(&path).await {
                    warn!(dir = %path.display(), error = %e, "Failed to scan directory");
                }
            }
            Ok(metadata) if metadata.is_file() => {
                if rules.is_plugin_file(&path) {
                    info!(path = %path.display(), hint = ?hint, "Plugin file changed");
                    self.schedule_reload(path).await;
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if rules.is_plugin_file(&path) {
                    info!(path = %path.display(), "Plugin file deleted");
                    self.handle_file_deletion(&path).await;
                } else {
                    self.handle_directory_deletion(&path).await;
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot inspect changed entry"),
        }
    }

    /// Removes the plugin loaded from a deleted manifest.
    ///
    /// If a reload of the same identity is in flight, the deletion is handed
    /// to that reload as a follow-up pass, which finds the file gone and
    /// leaves the plugin unloaded.
    pub async fn handle_file_deletion(&self, path: &Path) {
        let plugin_id = self.manager.plugin_id_for(path);

        {
            let mut reloads = self.reloads.lock().await;
            if let Some(pending) = reloads.get_mut(&plugin_id) {
                *pending = true;
                debug!(plugin_id = %plugin_id, "Reload in flight, deferring removal to it");
                return;
            }
        }

        self.manager.remove_plugin(&plugin_id).await;
    }

    /// Removes every plugin under a deleted directory and releases the
    /// watches on it and on anything nested inside it.
    pub async fn handle_directory_deletion(&self, dir: &Path) {
        let removed = self.manager.remove_under(dir).await;

        let mut guard = self.watch_set.lock().await;
        let set = &mut *guard;
        let released: Vec<PathBuf> = set
            .watched
            .iter()
            .filter(|watched| watched.starts_with(dir))
            .cloned()
            .collect();

        for watched in &released {
            set.watched.remove(watched);
            if let Some(backend) = set.backend.as_mut() {
                if let Err(e) = backend.unwatch(watched) {
                    debug!(dir = %watched.display(), error = %e, "Watch already released");
                }
            }
            info!(dir = %watched.display(), "Stopped watching deleted directory");
        }

        if !removed.is_empty() || !released.is_empty() {
            info!(
                dir = %dir.display(),
                plugins = removed.len(),
                watches = released.len(),
                "Directory deleted"
            );
        }
    }

    /// Debounces and reloads a manifest, coalescing overlapping requests.
    pub async fn schedule_reload(&self, path: PathBuf) {
        let plugin_id = self.manager.plugin_id_for(&path);

        {
            let mut reloads = self.reloads.lock().await;
            if let Some(pending) = reloads.get_mut(&plugin_id) {
                *pending = true;
                debug!(plugin_id = %plugin_id, "Reload already in flight, coalescing");
                return;
            }
            reloads.insert(plugin_id.clone(), false);
        }

        loop {
            tokio::time::sleep(self.debounce).await;

            if let Err(e) = self.manager.reload_plugin(&path).await {
                warn!(plugin_id = %plugin_id, error = %e, "Reload left plugin unloaded");
            }

            let mut reloads = self.reloads.lock().await;
            if reloads.get(&plugin_id).copied().unwrap_or(false) {
                reloads.insert(plugin_id.clone(), false);
                continue;
            }
            reloads.remove(&plugin_id);
            break;
        }
    }

    /// Releases every watch and stops event dispatch. Safe to call twice.
    pub async fn stop(&self) {
        let mut guard = self.watch_set.lock().await;
        let set = &mut *guard;
        let watched = std::mem::take(&mut set.watched);

        if let Some(mut backend) = set.backend.take() {
            for dir in &watched {
                if let Err(e) = backend.unwatch(dir) {
                    debug!(dir = %dir.display(), error = %e, "Failed to release watch");
                }
                info!(dir = %dir.display(), "Stopped watching");
            }
        }
        drop(guard);

        if let Some(handle) = self.dispatcher.lock().await.take() {
            handle.abort();
        }
    }
}

async fn dispatch_events(manager: Weak<WatchManager>, mut events: mpsc::UnboundedReceiver<FsEvent>) {
    while let Some(event) = events.recv().await {
        let Some(manager) = manager.upgrade() else {
            break;
        };
        tokio::spawn(async move {
            manager.handle_event(event).await;
        });
    }
    debug!("Watch event dispatcher stopped");
}
