/// Repository trait for the durable job store
///
/// The store holds the full job row; the dispatch queue only carries ids.
/// Rows are never deleted by the pipeline - terminal jobs stay around for
/// audit and operator visibility.
use crate::modules::jobs::domain::entities::{JobRecord, NewJob};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending`
    async fn create(&self, job: NewJob) -> AppResult<JobRecord>;

    /// Load a job by id
    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// pending -> scheduled, once the queue entry is durably enqueued
    async fn mark_scheduled(&self, job_id: Uuid) -> AppResult<()>;

    /// -> running; increments `attempts` and stamps `started_at`
    async fn mark_running(&self, job_id: Uuid) -> AppResult<()>;

    /// -> succeeded with the handler's result
    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> AppResult<()>;

    /// -> failed with a human-readable error
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()>;

    /// True when a refresh_credential job for this connection is already
    /// pending, scheduled or running (refresh sweep pile-up guard)
    async fn has_active_refresh_for(&self, connection_id: Uuid) -> AppResult<bool>;

    /// Jobs stuck in `pending` longer than `older_than` - the crash seam of
    /// the two-step schedule, recovered by the reconciliation sweep
    async fn list_stuck_pending(&self, older_than: Duration) -> AppResult<Vec<JobRecord>>;

    /// Counts per status for monitoring
    async fn statistics(&self) -> AppResult<JobStatistics>;
}

/// Job store statistics
#[derive(Debug, Clone, Default)]
pub struct JobStatistics {
    pub pending_count: i64,
    pub scheduled_count: i64,
    pub running_count: i64,
    pub succeeded_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}
