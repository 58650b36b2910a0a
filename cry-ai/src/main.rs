//! cry-ai - Infant cry classification service
//!
//! Accepts an audio clip over HTTP and answers with one of `hunger`,
//! `tiredness`, `discomfort`, `needs attention` or `burping` plus a
//! confidence score.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use cry_ai::audio::FormatNormalizer;
use cry_ai::classifier::{ClassifierAdapter, CryModel, ForestModel};
use cry_ai::config::{Cli, ServiceConfig};
use cry_ai::{build_router, AppState, CryPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = cry_common::config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = ServiceConfig::resolve(&cli, toml_config);

    cry_ai::logging::init_logging(&config.logging)?;

    info!("Starting cry-ai v{}", env!("CARGO_PKG_VERSION"));
    info!(
        model = %config.model_path.display(),
        storage = %config.storage_dir.display(),
        transcoder = %config.transcoder.binary,
        "Configuration resolved"
    );

    let model = ForestModel::load(&config.model_path).with_context(|| {
        format!(
            "Failed to load classifier model from {}",
            config.model_path.display()
        )
    })?;
    info!(
        n_features = model.n_features(),
        n_classes = model.n_classes(),
        trees = model.n_trees(),
        "Classifier ready"
    );

    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create storage directory {}",
                config.storage_dir.display()
            )
        })?;

    let pipeline = CryPipeline::new(
        FormatNormalizer::new(config.transcoder.clone()),
        ClassifierAdapter::new(Arc::new(model)),
        config.storage_dir.clone(),
    );

    let transcoder = pipeline.transcoder_status().await;
    info!(
        available = transcoder.available,
        version = transcoder.version.as_deref().unwrap_or("-"),
        "Transcoder status"
    );

    let state = AppState::new(Arc::new(pipeline), config.max_upload_bytes);
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on http://{}", addr);
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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
