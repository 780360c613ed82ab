//! wortschatz-web - German verb and noun trainer
//!
//! Serves the trainer UI and JSON API over CSV word lists, with optional
//! mirroring of practice progress to a GitHub repository.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wortschatz_common::config::{load_toml_config, AppConfig, ConfigOverrides};
use wortschatz_common::{ProgressMirror, RecordStore};
use wortschatz_web::{build_router, AppState};

/// Command-line arguments for wortschatz-web
#[derive(Parser, Debug)]
#[command(name = "wortschatz-web")]
#[command(about = "German vocabulary trainer web service")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5000)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory holding verbs.csv, nouns.csv and progress.json
    #[arg(short, long, env = "WORTSCHATZ_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "WORTSCHATZ_CONFIG")]
    config: Option<PathBuf>,

    /// Session signing key
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// GitHub token enabling the remote progress mirror
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Repository holding the progress document (owner/name)
    #[arg(long, env = "GITHUB_REPO")]
    github_repo: Option<String>,

    /// Branch the progress document is committed to
    #[arg(long, env = "GITHUB_BRANCH")]
    github_branch: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            port: self.port,
            secret_key: self.secret_key.clone(),
            github_token: self.github_token.clone(),
            github_repo: self.github_repo.clone(),
            github_branch: self.github_branch.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration file")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "wortschatz_web={level},wortschatz_common={level},tower_http={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Wortschatz (wortschatz-web) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::resolve(args.overrides(), toml_config)
        .context("Invalid configuration")?;
    info!("Data directory: {}", config.data_dir.display());

    let store = RecordStore::from_config(&config);
    store
        .ensure_data_dir()
        .context("Failed to create data directory")?;

    let mirror = ProgressMirror::from_config(&config)
        .context("Failed to initialize progress mirror")?;

    let app = build_router(AppState::new(store, mirror));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("wortschatz-web listening on http://{}", addr);

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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
