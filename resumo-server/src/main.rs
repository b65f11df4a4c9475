//! resumo-server - book-summary reading service
//!
//! Serves the JSON API and media files over one SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use resumo_common::config::{ConfigOverrides, ServerConfig};
use resumo_common::db::init_database;
use resumo_server::{build_router, AppState};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for resumo-server
///
/// Host, port and folders fall back to `RESUMO_*` environment variables,
/// then the config file, then built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "resumo-server")]
#[command(about = "Book-summary reading service")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Folder with audio/, pdf/ and covers/ (default: <root>/media)
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Config file (replaces the platform config lookup)
    #[arg(short, long, env = "RESUMO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resumo_server=info,resumo_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting resumo-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let config = ServerConfig::resolve(&ConfigOverrides {
        root_folder: args.root_folder,
        host: args.host,
        port: args.port,
        media_dir: args.media_dir,
        config_file: args.config,
    })
    .context("Failed to resolve configuration")?;

    info!("Root folder: {}", config.root_folder.display());
    info!("Database: {}", config.database_path.display());
    info!("Media folder: {}", config.media_dir.display());
    if !config.media_dir.is_dir() {
        warn!("Media folder does not exist yet; media requests will return 404");
    }

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Database initialization failed");
        }
    };

    let state = AppState::new(pool, config.media_dir.clone());
    let app = build_router(state).layer(CorsLayer::permissive());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("resumo-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
