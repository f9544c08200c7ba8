//! cryptq daemon - composition root
//! Wires SQLite inventories, the streaming engine and one worker pool per category

mod config;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat};
use cryptq_core::application::worker::{completion_channel, shutdown_channel, Completion, Worker};
use cryptq_core::application::{processor_for, RecoveryService};
use cryptq_core::domain::{OperationCategory, QueueRouting};
use cryptq_core::port::id_provider::UuidProvider;
use cryptq_core::port::time_provider::SystemTimeProvider;
use cryptq_core::port::{CryptoEngine, JobInventory, KeyProvider, QueueInventory};
use cryptq_infra_crypto::{FsKeyring, StaticOwnerResolver, StreamingCryptoEngine};
use cryptq_infra_sqlite::{create_pool, run_migrations, SqliteJobInventory, SqliteQueueInventory};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("cryptq=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

fn database_url(db_path: &str) -> Result<String> {
    if db_path.starts_with("sqlite:") {
        return Ok(db_path.to_string());
    }
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    Ok(format!("sqlite://{}", db_path))
}

/// Submitters resolve owners from this file and workers load their keys from
/// the keyring; a malformed file stops start-up, dangling key references are reported
async fn check_owner_directory(path: &Path, keys: &dyn KeyProvider) -> Result<usize> {
    if !path.exists() {
        warn!(path = %path.display(), "No owner directory, submissions will be rejected");
        return Ok(0);
    }
    let owners = StaticOwnerResolver::load(path)
        .await
        .map_err(|e| anyhow::anyhow!("Owner directory rejected: {}", e))?;
    let unresolved = owners.unresolved_keys(keys).await;
    info!(
        owners = owners.len(),
        unresolved_keys = unresolved.len(),
        "Owner directory checked against keyring"
    );
    Ok(unresolved.len())
}

fn log_completion(completion: &Completion) {
    match &completion.result {
        Ok(report) => info!(
            job_id = %completion.job_id,
            task_id = %completion.task_id,
            output = %report.output_path.display(),
            bytes_written = report.bytes_written,
            duration_ms = report.duration_ms,
            "Job completed"
        ),
        Err(e) => warn!(
            job_id = %completion.job_id,
            task_id = %completion.task_id,
            error = %e.detail(),
            "Job failed"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env()?;
    init_logging(config.log_format)?;
    info!("cryptq v{} starting...", VERSION);

    // 2. Database
    info!(db_path = %config.db_path, "Initializing database...");
    let pool = create_pool(&database_url(&config.db_path)?)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_inventory: Arc<dyn JobInventory> =
        Arc::new(SqliteJobInventory::new(pool.clone(), time_provider.clone()));
    let queue_inventory: Arc<dyn QueueInventory> = Arc::new(SqliteQueueInventory::new(
        pool.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let keys: Arc<dyn KeyProvider> = Arc::new(FsKeyring::new(&config.keyring_dir));
    let engine: Arc<dyn CryptoEngine> = Arc::new(
        StreamingCryptoEngine::new(config.engine.clone())
            .map_err(|e| anyhow::anyhow!("Engine configuration rejected: {}", e))?,
    );

    check_owner_directory(&config.owners_file, keys.as_ref()).await?;

    // 4. Crash recovery
    info!("Running crash recovery...");
    let recovery_service = RecoveryService::new(
        job_inventory.clone(),
        queue_inventory.clone(),
        time_provider.clone(),
        None,
    );
    match recovery_service.recover_orphaned_jobs().await {
        Ok(count) => info!(recovered_jobs = count, "Crash recovery completed"),
        Err(e) => error!(error = ?e, "Crash recovery failed"),
    }

    // 5. Completion listener
    let (completions, mut completion_rx) = completion_channel();
    let listener = tokio::spawn(async move {
        while let Some(completion) = completion_rx.recv().await {
            log_completion(&completion);
        }
    });

    // 6. Worker pools
    let (shutdown_tx, _) = shutdown_channel();
    let routing = QueueRouting::default();
    let mut worker_handles = Vec::new();
    for category in OperationCategory::ALL {
        let queue = routing.queue_for(category).to_string();
        let processor = processor_for(category, engine.clone(), keys.clone());
        for n in 0..config.workers_per_queue {
            let worker = Worker::new(
                queue.clone(),
                job_inventory.clone(),
                queue_inventory.clone(),
                processor.clone(),
                completions.clone(),
            );
            let token = shutdown_tx.token();
            worker_handles.push(tokio::spawn(async move {
                if let Err(e) = worker.run(token).await {
                    error!(queue = %worker.queue(), worker = n, error = ?e, "Worker failed");
                }
            }));
        }
        info!(queue = %queue, workers = config.workers_per_queue, "Worker pool started");
    }
    drop(completions);

    info!("System ready. Waiting for tasks...");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: workers finish their current task, then the listener drains
    shutdown_tx.shutdown();
    let drain = async {
        for handle in worker_handles {
            let _ = handle.await;
        }
        let _ = listener.await;
    };
    if tokio::time::timeout(std::time::Duration::from_secs(30), drain)
        .await
        .is_err()
    {
        warn!("Timed out waiting for workers to stop");
    }

    pool.close().await;
    info!("Shutdown complete.");
    Ok(())
}
