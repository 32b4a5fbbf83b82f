//! Fueltrack Service - HTTP API and weather sync.
//!
//! Run with: `cargo run -p fueltrack-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use fueltrack_service::{AppState, Config, WeatherSync, api};
use fueltrack_store::Store;

/// Fueltrack Service - heating-oil tracking REST API.
#[derive(Parser, Debug)]
#[command(name = "fueltrack-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Disable the background weather sync (API only mode).
    #[arg(long)]
    no_sync: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fueltrack_service=info".parse()?)
                .add_directive("fueltrack_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_validated(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let config = Config::load_default()?;
            config.validate()?;
            config
        }
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;
    store.seed_settings(&config.setting_defaults())?;

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    let sync_enabled = config.sync.enabled && !args.no_sync;

    let state = AppState::new(store, config)?;

    let sync_task = if sync_enabled {
        Some(WeatherSync::new(Arc::clone(&state)).start())
    } else {
        info!("Weather sync disabled");
        None
    };

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::clone(&state));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sync.signal_stop();
    if let Some(task) = sync_task
        && let Err(e) = task.await
    {
        warn!("Weather sync task ended abnormally: {}", e);
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
