//! Detection API
//!
//! Serves the detection boundary: liveness, an echo route and `POST /detect`,
//! which validates and flattens a transaction without scoring it.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use transaction_synthesizer::{
    api::{create_routes, AppState},
    config::AppConfig,
    FeatureExtractor,
};

#[derive(Debug, Parser)]
#[command(name = "detection-api", version, about = "Serve the fraud detection boundary")]
struct Args {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(bind) = args.bind {
        config.api.bind_addr = bind;
    }

    config.logging.init("detection_api")?;

    let extractor = FeatureExtractor::new();
    info!(
        "Feature extractor initialized ({} features: {:?})",
        extractor.feature_count(),
        extractor.feature_names()
    );

    let app = create_routes(AppState::new(extractor));

    let listener = TcpListener::bind(&config.api.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.bind_addr))?;
    info!("Detection API running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Detection API shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
