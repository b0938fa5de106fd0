//! Guard Notes server entry point.
//!
//! `guardnotes serve` (the default) opens the storage backend, runs the
//! bootstrap routine and starts the Axum HTTP server with graceful shutdown.
//! `guardnotes seed` runs only the bootstrap routine and exits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use guardnotes_core::bootstrap::{self, BootstrapReport};
use guardnotes_core::password::PasswordHasher;
use guardnotes_storage::{MemoryStore, Migrator, Repository};

use guardnotes_server::config::{ServerConfig, StorageBackendType};
use guardnotes_server::routes;
use guardnotes_server::state::AppState;

/// Guard Notes credentials dashboard server.
#[derive(Parser)]
#[command(name = "guardnotes", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bootstrap routine, then serve the HTTP API (default).
    Serve {
        /// Address to bind; overrides `GUARDNOTES_BIND_ADDR` and `PORT`.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Apply migrations and create the default user, then exit.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Seed => {
            let (repo, migrator) = open_storage(&config).await?;
            let report = run_bootstrap(&config, migrator.as_ref(), repo.as_ref()).await?;
            info!(
                migrated = report.migrated,
                default_user = ?report.default_user,
                "seed complete"
            );
            Ok(())
        }
        Command::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            serve(config).await
        }
    }
}

/// Load `.env` before the configuration is read. A missing file is fine.
#[allow(clippy::print_stderr)]
fn load_dotenv() {
    match dotenvy::dotenv() {
        Err(err) if !err.not_found() => {
            eprintln!("WARNING: failed to load .env file: {err}");
        }
        _ => {}
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!(storage = ?config.storage_backend, "Guard Notes starting");

    let (repo, migrator) = open_storage(&config).await?;
    run_bootstrap(&config, migrator.as_ref(), repo.as_ref()).await?;

    let state = Arc::new(AppState::new(repo, config.notification_capacity));
    let app = routes::app(state).layer(tower::limit::ConcurrencyLimitLayer::new(
        config.max_concurrent_requests,
    ));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Guard Notes server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Guard Notes server stopped");
    Ok(())
}

/// Open the configured backend, returned once as a repository and once as
/// the migrator for the bootstrap routine.
async fn open_storage(
    config: &ServerConfig,
) -> anyhow::Result<(Arc<dyn Repository>, Arc<dyn Migrator>)> {
    match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            let store = Arc::new(MemoryStore::new());
            let repo: Arc<dyn Repository> = Arc::clone(&store) as _;
            let migrator: Arc<dyn Migrator> = store;
            Ok((repo, migrator))
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL storage");
            let store = Arc::new(
                guardnotes_storage::PostgresStore::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL")?,
            );
            let repo: Arc<dyn Repository> = Arc::clone(&store) as _;
            let migrator: Arc<dyn Migrator> = store;
            Ok((repo, migrator))
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!("PostgreSQL backend requested but feature 'postgres-backend' is not enabled");
        }
    }
}

/// Run migrations and the default-user seed. Any failure aborts startup.
async fn run_bootstrap(
    config: &ServerConfig,
    migrator: &dyn Migrator,
    repo: &dyn Repository,
) -> anyhow::Result<BootstrapReport> {
    let hasher = PasswordHasher::new().context("failed to initialise password hasher")?;
    bootstrap::run(&config.bootstrap, migrator, repo, &hasher)
        .await
        .context("bootstrap failed")
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
