//! warden server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite snapshot store, hydrates the registry, starts the reader-event
//! worker, and serves the JSON API under `/api`.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use settings::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use warden_api::{ApiState, api_router};
use warden_core::{
  Registry,
  ingest::{EventIngestor, topic_filter},
  store::SnapshotStore,
};
use warden_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Warden access-control registry")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  // Open SQLite store.
  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let registry = Arc::new(Registry::new(store));
  hydrate(&registry).await?;

  // Reader events.
  let (events, rx) = EventIngestor::<SqliteStore>::channel(server_cfg.event_queue);
  let ingestor = EventIngestor::new(Arc::clone(&registry), server_cfg.namespace.clone());
  let worker = tokio::spawn(ingestor.run(rx));
  tracing::info!(filter = %topic_filter(&server_cfg.namespace), "accepting reader events on /api/events");

  let app = Router::new().nest("/api", api_router(ApiState { registry, events }));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router (and with it the last event sender) is gone; let the worker
  // drain what is left in the queue.
  worker.await.context("event ingestor task failed")?;
  tracing::info!("shut down cleanly");

  Ok(())
}

/// Load the stored snapshot into `registry`.
///
/// An unreadable store is survivable and leaves the registry empty. A record we
/// cannot parse is not, since the next save would overwrite it.
async fn hydrate<S: SnapshotStore>(registry: &Registry<S>) -> anyhow::Result<()> {
  match registry.load().await {
    Ok(()) => Ok(()),
    Err(e @ warden_core::Error::Malformed(_)) => {
      Err(e).context("refusing to start over a malformed snapshot")
    }
    Err(e) => {
      tracing::error!(error = %e, "failed to load registry, starting empty");
      Ok(())
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}
