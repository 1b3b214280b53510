//! CLI entry point: validates the source/target roots and oracle
//! credentials, enqueues an initial scan if the store is empty, then runs
//! the control plane and the worker pool concurrently against one JobStore.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wts_config::{Config, OracleProvider};
use wts_core::{PathsState, ProgressTracker, WorkerPool};
use wts_store::{JobStore, JobType};

/// Organize a directory of unsorted music into `Artist/Album (Year)/…`.
#[derive(Debug, Parser)]
#[command(name = "wts", version, about)]
struct Cli {
    /// Hosted model name (requires the provider's credential environment variable)
    #[arg(long, conflicts_with = "inference_url", required_unless_present = "inference_url")]
    model: Option<String>,

    /// HTTP endpoint of an OpenAI-compatible local inference server
    #[arg(long, required_unless_present = "model")]
    inference_url: Option<String>,

    /// Root directory to scan for unsorted music
    #[arg(long)]
    source_dir: PathBuf,

    /// Root directory organized albums are copied into
    #[arg(long)]
    target_dir: PathBuf,

    /// Control-plane bind port
    #[arg(long)]
    port: Option<u16>,

    /// Number of concurrent worker tasks
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if !cli.source_dir.is_dir() {
        anyhow::bail!("--source-dir '{}' does not exist or is not a directory", cli.source_dir.display());
    }
    std::fs::create_dir_all(&cli.target_dir)?;

    let mut config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(model) = cli.model {
        config.oracle.model = model;
    }
    if let Some(url) = cli.inference_url {
        config.oracle.provider = OracleProvider::Llama;
        config.oracle.base_url = url;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(workers) = cli.workers {
        config.worker.worker_count = workers;
    }

    tracing::info!(
        provider = %config.oracle.provider,
        model = %config.oracle.model,
        environment = %config.environment,
        "starting whats-that-sound"
    );

    let store = JobStore::connect(&config.store).await?;
    let oracle: Arc<dyn wts_oracle::Oracle> = Arc::from(wts_oracle::build_oracle(&config.oracle)?);
    let paths = PathsState::shared(cli.source_dir.clone(), cli.target_dir.clone());
    let progress = Arc::new(ProgressTracker::new());

    if store.is_empty().await? {
        tracing::info!(source = %cli.source_dir.display(), "store is empty, enqueueing initial scan");
        store
            .enqueue(&cli.source_dir.display().to_string(), JobType::Scan, None, None, None)
            .await?;
    }

    let worker_pool = WorkerPool::new(
        store.clone(),
        oracle,
        paths.clone(),
        progress.clone(),
        config.worker.clone(),
        &config.store,
    );

    let app_state = wts_api::AppState {
        store: store.clone(),
        paths,
        progress,
        environment: config.environment,
    };
    let router = wts_api::build_router(app_state, config.server.cors_allowed_origins.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control plane listening");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server_shutdown = shutdown_tx.subscribe();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let mut rx = server_shutdown;
                let _ = rx.recv().await;
            })
            .await
    });

    let pool_shutdown = shutdown_tx.subscribe();
    let pool = tokio::spawn(async move { worker_pool.run(pool_shutdown).await });

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight work");
    let _ = shutdown_tx.send(());

    let _ = pool.await;
    server.await??;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
