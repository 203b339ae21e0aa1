//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use apihub_core::config::AppConfig;
use apihub_plugin::PluginManager;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Plugin lifecycle, registry, and route table
    pub plugin_manager: Arc<PluginManager>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
    /// In-memory visitor counter
    pub visitor_count: Arc<AtomicU64>,
}

impl AppState {
    /// Creates state with a fresh uptime clock and visitor counter.
    pub fn new(config: Arc<AppConfig>, plugin_manager: Arc<PluginManager>) -> Self {
        Self {
            config,
            plugin_manager,
            started_at: Instant::now(),
            visitor_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Increments the visitor counter and returns the new value.
    pub fn record_visit(&self) -> u64 {
        self.visitor_count.fetch_add(1, Ordering::SeqCst) + 1
    }
}
