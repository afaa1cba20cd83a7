use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::dispatcher::JobDispatcher;
use crate::infrastructure::storage::ObjectStorage;
use crate::infrastructure::storage::s3::StorageService;
use crate::workers::pipeline::EncodePipeline;
use crate::workers::transcoder::FfmpegEngine;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("invalid configuration")?;
    for dir in [config.uploads_dir(), config.outputs_dir()] {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
    }

    let s3 = StorageService::new(
        &config.minio_url,
        &config.minio_bucket,
        &config.minio_region,
        &config.minio_access_key,
        &config.minio_secret_key,
    );
    s3.ensure_bucket().await.context("prepare bucket")?;
    let storage: Arc<dyn ObjectStorage> = Arc::new(s3);

    let dispatcher = JobDispatcher::new(config.encode_queue_capacity);
    let pipeline = Arc::new(EncodePipeline::new(
        storage.clone(),
        Arc::new(FfmpegEngine::new(&config.ffmpeg_bin)),
    ));
    let workers = dispatcher.run(config.encode_workers, pipeline);
    info!(
        workers = config.encode_workers,
        capacity = config.encode_queue_capacity,
        "🎥 Encode workers running"
    );

    let state = state::AppState::new(config.clone(), storage, dispatcher.clone());
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind((config.server_host.as_str(), config.server_port))
        .await
        .context("bind listener")?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dispatcher))
        .await
        .context("server error")?;

    workers.drain(config.shutdown_grace).await;
    info!("Server shut down gracefully");
    Ok(())
}

/// Closes the encode queue first so uploads still waiting for a slot get a
/// 503 instead of holding the server open.
async fn shutdown_signal(dispatcher: JobDispatcher) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }

    dispatcher.shutdown();
}
