//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ttm_api::{create_router, metrics, ApiConfig, AppState};
use ttm_media::{check_ffmpeg, FfmpegEncoder};
use ttm_pipeline::HttpPipelineClient;
use ttm_storage::{ArtifactStore, R2Client};
use ttm_worker::{GenerationDeps, GenerationService, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    init_tracing()?;

    info!("Starting ttm-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        "API config: host={}, port={}, max_concurrent_jobs={}",
        config.host, config.port, worker_config.max_concurrent_jobs
    );

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    match check_ffmpeg() {
        Ok(path) => info!("Using FFmpeg at {}", path.display()),
        Err(e) => warn!("{}; jobs will fail at the encoding step", e),
    }

    let pipeline = HttpPipelineClient::from_env().context("Failed to create pipeline client")?;
    info!("Generation pipeline at {}", pipeline.config().base_url);

    let artifacts: Option<Arc<dyn ArtifactStore>> = match R2Client::from_env() {
        Ok(client) => {
            info!("Uploading artifacts to bucket {}", client.bucket());
            Some(Arc::new(client) as Arc<dyn ArtifactStore>)
        }
        Err(e) => {
            info!("Artifact uploads disabled: {}", e);
            None
        }
    };

    let deps = GenerationDeps {
        pipeline: Arc::new(pipeline),
        encoder: Arc::new(FfmpegEncoder::default()),
        artifacts,
    };
    let (service, executor) = GenerationService::new(worker_config, deps);
    let executor = Arc::new(executor);

    let executor_task = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.run().await })
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;
    let app = create_router(AppState::new(config, service), metrics_handle);

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    executor.shutdown();
    match executor_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Job executor stopped with error: {}", e),
        Err(e) => warn!("Job executor task failed: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("ttm=info".parse().context("Invalid log directive")?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
