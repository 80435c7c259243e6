use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crosspost::modules::pipeline::{PipelineWorker, SweepScheduler};
use crosspost::shared::config::PipelineConfig;
use crosspost::shared::database::Database;
use crosspost::shared::utils::init_logger;
use crosspost::{log_error, log_info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = PipelineConfig::from_env();
    let db = Database::new()?;
    crosspost::run_migrations(&db)?;

    let ctx = crosspost::build_context(&db, config.clone())?;

    let shutdown = CancellationToken::new();
    let sweeps = Arc::new(SweepScheduler::new(ctx.clone(), shutdown.clone()));
    let sweep_handles = sweeps.spawn_all();

    let mut workers = Vec::with_capacity(config.worker_count);
    let mut worker_handles = Vec::with_capacity(config.worker_count);
    for _ in 0..config.worker_count {
        let worker = Arc::new(PipelineWorker::new(ctx.clone()));
        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.run().await })
        };
        workers.push(worker);
        worker_handles.push(handle);
    }

    log_info!("Started {} pipeline workers", config.worker_count);

    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error!("Failed to listen for shutdown signal: {}", e);
    }
    log_info!("Shutdown requested, draining workers");

    shutdown.cancel();
    for worker in &workers {
        worker.stop().await;
    }
    futures::future::join_all(worker_handles.into_iter().chain(sweep_handles)).await;

    log_info!("Pipeline stopped");
    Ok(())
}
