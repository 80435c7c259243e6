/// Periodic background sweeps
///
/// Four independent loops keep the pipeline converging: expiry flips
/// past-due connections out of active, refresh schedules credential
/// rotation ahead of expiry, sync schedules polling for quiet sources,
/// and reconcile rescues jobs stranded in pending by a crash between
/// job creation and queue push. Sweep errors are logged and the loop
/// keeps going; a wedged database round should not kill the process.
use std::sync::Arc;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::modules::jobs::domain::entities::NewJob;
use crate::modules::pipeline::context::PipelineContext;
use crate::shared::errors::AppResult;
use crate::{log_error, log_info, log_warn};

pub struct SweepScheduler {
    ctx: Arc<PipelineContext>,
    shutdown: CancellationToken,
}

impl SweepScheduler {
    pub fn new(ctx: Arc<PipelineContext>, shutdown: CancellationToken) -> Self {
        Self { ctx, shutdown }
    }

    /// Spawn all sweep loops. Returned handles finish once the
    /// cancellation token fires.
    pub fn spawn_all(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.clone().spawn_loop("expiry", |s| async move {
                s.run_expiry_sweep().await
            }),
            self.clone().spawn_loop("refresh", |s| async move {
                s.run_refresh_sweep().await.map(|_| ())
            }),
            self.clone().spawn_loop("sync", |s| async move {
                s.run_sync_sweep().await.map(|_| ())
            }),
            self.spawn_loop("reconcile", |s| async move {
                s.run_reconcile_sweep().await
            }),
        ]
    }

    fn spawn_loop<F, Fut>(
        self: Arc<Self>,
        name: &'static str,
        sweep: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = AppResult<()>> + Send,
    {
        let period = match name {
            "expiry" => self.ctx.config.expiry_sweep_interval,
            "refresh" => self.ctx.config.refresh_sweep_interval,
            "sync" => self.ctx.config.sync_sweep_interval,
            _ => self.ctx.config.reconcile_interval,
        };

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        log_info!("Stopping {} sweep", name);
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = sweep(self.clone()).await {
                            log_error!("{} sweep failed: {}", name, e);
                        }
                    }
                }
            }
        })
    }

    /// Flip active connections whose token expiry has passed to expired.
    pub async fn run_expiry_sweep(&self) -> AppResult<()> {
        let expired = self.ctx.connections.expire_past_due().await?;
        if expired > 0 {
            log_warn!("Expired {} connections with past-due tokens", expired);
        }
        Ok(())
    }

    /// Schedule refresh jobs for connections expiring inside the
    /// lookahead window, at most one live job per connection.
    pub async fn run_refresh_sweep(&self) -> AppResult<usize> {
        let expiring = self
            .ctx
            .connections
            .list_expiring_within(self.ctx.config.refresh_lookahead)
            .await?;

        let mut scheduled = 0;
        for connection in expiring {
            if !connection.platform.supports_refresh() {
                continue;
            }
            if self.ctx.jobs.has_active_refresh_for(connection.id).await? {
                continue;
            }

            self.ctx
                .scheduler
                .schedule(NewJob::refresh_credential(
                    connection.id,
                    connection.tenant_id,
                    connection.user_id,
                ))
                .await?;
            scheduled += 1;
        }

        if scheduled > 0 {
            log_info!("Scheduled {} credential refresh jobs", scheduled);
        }
        Ok(scheduled)
    }

    /// Schedule sync jobs for source connections past their cooldown.
    pub async fn run_sync_sweep(&self) -> AppResult<usize> {
        let due = self
            .ctx
            .connections
            .list_sources_due_for_sync(self.ctx.config.sync_cooldown)
            .await?;

        let mut scheduled = 0;
        for connection in due {
            self.ctx
                .scheduler
                .schedule(NewJob::sync_source(
                    connection.id,
                    connection.tenant_id,
                    connection.user_id,
                ))
                .await?;
            scheduled += 1;
        }

        if scheduled > 0 {
            log_info!("Scheduled {} source sync jobs", scheduled);
        }
        Ok(scheduled)
    }

    /// Rescue jobs stranded in pending. A crash between row creation and
    /// queue push leaves the row pending forever; after the grace period
    /// we re-enqueue it, and past the deadline we fail it outright.
    pub async fn run_reconcile_sweep(&self) -> AppResult<()> {
        let stuck = self
            .ctx
            .jobs
            .list_stuck_pending(self.ctx.config.reconcile_grace)
            .await?;

        let deadline = chrono::Utc::now() - self.ctx.config.reconcile_deadline;
        for job in stuck {
            if job.created_at < deadline {
                self.ctx
                    .jobs
                    .mark_failed(job.id, "Abandoned before dispatch")
                    .await?;
                log_warn!("Failed abandoned pending job {} ({})", job.id, job.kind);
            } else {
                self.ctx.scheduler.reschedule(&job).await?;
                log_info!("Re-enqueued stranded pending job {} ({})", job.id, job.kind);
            }
        }

        Ok(())
    }
}
