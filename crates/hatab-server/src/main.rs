//! hatab-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), builds the
//! data layer from the configured CSV extracts, and serves the KPI API over
//! HTTP.
//!
//! # Checking a dataset
//!
//! To build the data layer and print its quality reports without serving:
//!
//! ```
//! cargo run -p hatab-server -- --check
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use hatab_core::source::{KpiSource, SourceCell};
use hatab_data::DataLayer;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Hatab supply-chain KPI server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Build the data layer, print its quality reports as JSON and exit.
  #[arg(long)]
  check: bool,
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

  // Build the data layer off the async runtime; it is CPU and file bound.
  let data_cfg = server_cfg.data.clone();
  let layer = tokio::task::spawn_blocking(move || DataLayer::build(&data_cfg))
    .await
    .context("data layer build panicked")?
    .with_context(|| {
      format!("failed to build data layer from {}", server_cfg.data.data_dir.display())
    })?;

  if cli.check {
    let reports = serde_json::to_string_pretty(&layer.quality_reports())
      .context("failed to serialise quality reports")?;
    println!("{reports}");
    return Ok(());
  }

  let cell = Arc::new(SourceCell::new());
  cell
    .init(layer)
    .context("data layer was already published")?;

  let app = hatab_api::api_router(cell);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
