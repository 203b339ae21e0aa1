//! API Hub Server: plugin-driven REST API
//!
//! Main entry point that wires all crates together and starts the server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use apihub_api::AppState;
use apihub_core::config::AppConfig;
use apihub_core::error::AppError;
use apihub_plugin::{PluginManager, RouteTable, WatchManager};

/// Command-line overrides for the configuration files.
#[derive(Debug, Parser)]
#[command(name = "apihub-server", version, about = "Plugin-driven REST API server")]
struct Cli {
    /// Directory holding `default.toml` and environment overlays.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Environment overlay to apply (defaults to `$APIHUB_ENV` or `development`).
    #[arg(long)]
    env: Option<String>,

    /// Plugin root directory.
    #[arg(long)]
    plugins_dir: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Disable filesystem watching and hot reload.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files, environment, and CLI overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig, AppError> {
    let env = cli
        .env
        .clone()
        .or_else(|| std::env::var("APIHUB_ENV").ok())
        .unwrap_or_else(|| "development".to_string());

    let mut config = AppConfig::load_from_dir(&cli.config_dir, &env)?;

    if let Some(dir) = &cli.plugins_dir {
        config.plugins.directory = dir.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.no_watch {
        config.plugins.watch = false;
    }

    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting API Hub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Handler catalog ──────────────────────────────────
    let catalog = Arc::new(apihub_handlers::builtin_catalog(&config.ai)?);

    // ── Step 2: Initial plugin scan ──────────────────────────────
    let plugin_manager = Arc::new(PluginManager::new(
        &config.plugins,
        catalog,
        Arc::new(RouteTable::new()),
    ));
    let snapshot = plugin_manager.load_plugins().await?;

    // ── Step 3: Bind plugin routes ───────────────────────────────
    let bound = plugin_manager.register_routes().await;
    tracing::info!(plugins = snapshot.plugins.len(), routes = bound, "Plugin routes registered");

    // ── Step 4: File watching ────────────────────────────────────
    let watch_manager = if config.plugins.watch {
        let watcher = WatchManager::new(
            Arc::clone(&plugin_manager),
            Duration::from_millis(config.plugins.debounce_ms),
        );
        match watcher.start().await {
            Ok(_) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "File watching disabled");
                None
            }
        }
    } else {
        tracing::info!("File watching disabled by configuration");
        None
    };

    // ── Step 5: Serve ────────────────────────────────────────────
    let state = AppState::new(Arc::new(config), plugin_manager);
    let result = apihub_api::serve(state, apihub_api::shutdown_signal()).await;

    if let Some(watcher) = watch_manager {
        watcher.stop().await;
    }
    tracing::info!("Server stopped");

    result
}
