//! Server bootstrap: wires storage, the pipeline, and the worker into an
//! Axum app and runs it until shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;

use slidehub_core::config::AppConfig;
use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_core::traits::generator::TileGenerator;
use slidehub_entity::publish::PublishOptions;
use slidehub_service::converter::VipsTileGenerator;
use slidehub_service::{JobRegistry, Orchestrator};
use slidehub_storage::{ChunkSpool, ConfigStoreResolver, SessionStore, SessionSweeper, StoreResolver};
use slidehub_worker::jobs::{ConversionHandler, SessionSweepJob};
use slidehub_worker::{CronScheduler, PipelineQueue, WorkerRunner};

use crate::router::build_router;
use crate::state::AppState;

/// Everything the server runs, assembled but not yet started.
#[derive(Debug)]
pub struct ServerParts {
    /// State shared by the HTTP handlers.
    pub state: AppState,
    /// Consumer of the pipeline queue.
    pub runner: WorkerRunner,
    /// Session expiry sweep for the cron scheduler.
    pub sweep: SessionSweepJob,
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Wire the session store, job registry, orchestrator, and worker.
///
/// The queue is created first so the orchestrator can dispatch into it and
/// the worker can consume from it without a reference cycle.
pub async fn assemble(
    config: AppConfig,
    generator: Arc<dyn TileGenerator>,
    resolver: Arc<dyn StoreResolver>,
) -> AppResult<ServerParts> {
    let spool = ChunkSpool::new(config.storage.chunks_dir()).await?;
    let sessions = SessionStore::new(spool);
    let registry = JobRegistry::new();

    let (queue, receiver) = PipelineQueue::new(config.worker.queue_capacity);
    let orchestrator = Orchestrator::new(
        sessions.clone(),
        registry,
        generator,
        resolver,
        Arc::new(queue.clone()),
        &config,
    );

    let handler = Arc::new(ConversionHandler::new(orchestrator.clone()));
    let runner = WorkerRunner::new(receiver, handler, config.worker.clone());
    let sweep = SessionSweepJob::new(SessionSweeper::new(
        sessions,
        Duration::from_secs(config.session.ttl_seconds),
    ));

    Ok(ServerParts {
        state: AppState::new(Arc::new(config), orchestrator, queue),
        runner,
        sweep,
    })
}

/// Runs the SlideHub server until Ctrl+C or SIGTERM.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting SlideHub server...");

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Object store and tile generator ──────────────────
    tracing::info!(
        provider = config.publisher.provider.as_str(),
        bucket = %config.publisher.bucket,
        "Configuring object store"
    );
    let resolver: Arc<dyn StoreResolver> =
        Arc::new(ConfigStoreResolver::new(config.publisher.clone()));
    let generator: Arc<dyn TileGenerator> =
        Arc::new(VipsTileGenerator::new(config.converter.clone()));
    check_default_store(resolver.as_ref()).await;

    // ── Step 3: Sessions, registry, pipeline, and worker ─────────
    let ServerParts {
        state,
        runner,
        sweep,
    } = assemble(config.clone(), generator, resolver).await?;

    // ── Step 4: Scheduled session sweep ──────────────────────────
    let mut scheduler = CronScheduler::new().await?;
    scheduler
        .register_session_sweep(&config.session.sweep_cron, sweep)
        .await?;
    scheduler.start().await?;

    // ── Step 5: Start the worker ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(runner.run(shutdown_rx));
    tracing::info!(
        concurrency = config.worker.concurrency,
        queue_capacity = config.worker.queue_capacity,
        "Pipeline worker started"
    );

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("SlideHub server listening on {}", addr);

    let signal_tx = shutdown_tx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signal_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Drain the worker and stop the scheduler ──────────
    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(
        config
            .server
            .shutdown_grace_seconds
            .max(config.worker.drain_timeout_seconds),
    );
    match tokio::time::timeout(grace, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Worker task failed"),
        Err(_) => tracing::warn!(
            grace_seconds = grace.as_secs(),
            "Worker did not stop within the shutdown grace period"
        ),
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }

    tracing::info!("SlideHub server stopped");
    Ok(())
}

/// Probe the default destination. Failures are only logged.
async fn check_default_store(resolver: &dyn StoreResolver) {
    let store = match resolver.resolve(&PublishOptions::default()).await {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "Default object store could not be configured");
            return;
        }
    };
    match store.health_check().await {
        Ok(true) => tracing::info!(provider = store.provider_type(), "Default object store reachable"),
        Ok(false) => tracing::warn!(provider = store.provider_type(), "Default object store is not reachable"),
        Err(e) => tracing::warn!(
            provider = store.provider_type(),
            error = %e,
            "Default object store health check failed"
        ),
    }
}

/// Create the chunk, upload, and output directories under the data root.
///
/// Jobs do not survive a restart, so anything left in the upload and output
/// directories by a previous process is removed. Chunk spools are left to
/// the session sweep.
pub async fn create_data_directories(config: &AppConfig) -> AppResult<()> {
    let dirs = [
        config.storage.chunks_dir(),
        config.storage.uploads_dir(),
        config.storage.output_dir(),
    ];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::internal(format!("Failed to create dir '{}': {e}", dir.display()))
        })?;
    }

    for dir in [config.storage.uploads_dir(), config.storage.output_dir()] {
        let removed = clear_stale_job_dirs(&dir).await?;
        if removed > 0 {
            tracing::info!(path = %dir.display(), removed, "Removed files left by earlier jobs");
        }
    }

    Ok(())
}

async fn clear_stale_job_dirs(dir: &Path) -> AppResult<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let result = if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale job files"),
        }
    }
    Ok(removed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
