/// Diesel-based implementation of the job store
use crate::modules::jobs::domain::entities::{JobRecord, NewJob};
use crate::modules::jobs::domain::repository::{JobStatistics, JobStore};
use crate::modules::jobs::infrastructure::models::{NewJobModel, PipelineJobModel};
use crate::schema::pipeline_jobs;
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Duration;
use diesel::prelude::*;
use uuid::Uuid;

/// Helper struct for COUNT queries
#[derive(QueryableByName)]
struct CountResult {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    count: i64,
}

pub struct JobStoreImpl {
    pool: DbPool,
}

impl JobStoreImpl {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_conn(
        &self,
    ) -> AppResult<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>,
    > {
        self.pool
            .get()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get connection: {}", e)))
    }

    fn count_by_status(
        conn: &mut diesel::PgConnection,
        status: &str,
    ) -> AppResult<i64> {
        let row: CountResult = diesel::sql_query(
            "SELECT COUNT(*) as count FROM pipeline_jobs WHERE status::text = $1",
        )
        .bind::<diesel::sql_types::Text, _>(status)
        .get_result(conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to count jobs: {}", e)))?;
        Ok(row.count)
    }
}

#[async_trait]
impl JobStore for JobStoreImpl {
    async fn create(&self, job: NewJob) -> AppResult<JobRecord> {
        let new_job = NewJobModel {
            kind: job.kind.to_string(),
            payload: job.payload,
            priority: job.priority,
            tenant_id: job.associations.tenant_id,
            user_id: job.associations.user_id,
            rule_id: job.associations.rule_id,
            source_item_id: job.associations.source_item_id,
            source_connection_id: job.associations.source_connection_id,
            destination_connection_id: job.associations.destination_connection_id,
        };

        let mut conn = self.get_conn()?;

        let inserted: PipelineJobModel = diesel::insert_into(pipeline_jobs::table)
            .values(&new_job)
            .get_result(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to create job: {}", e)))?;

        Ok(inserted.to_job_record())
    }

    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        let mut conn = self.get_conn()?;

        let job: Option<PipelineJobModel> = pipeline_jobs::table
            .find(job_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get job by id: {}", e)))?;

        Ok(job.map(|j| j.to_job_record()))
    }

    async fn mark_scheduled(&self, job_id: Uuid) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE pipeline_jobs
             SET status = 'scheduled'
             WHERE id = $1 AND status = 'pending'",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job scheduled: {}", e)))?;

        Ok(())
    }

    async fn mark_running(&self, job_id: Uuid) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE pipeline_jobs
             SET status = 'running',
                 attempts = attempts + 1,
                 started_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job running: {}", e)))?;

        Ok(())
    }

    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE pipeline_jobs
             SET status = 'succeeded',
                 result = $2,
                 error = NULL,
                 completed_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Jsonb, _>(result)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job succeeded: {}", e)))?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE pipeline_jobs
             SET status = 'failed',
                 error = $2,
                 completed_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Text, _>(error)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark job failed: {}", e)))?;

        Ok(())
    }

    async fn has_active_refresh_for(&self, connection_id: Uuid) -> AppResult<bool> {
        let mut conn = self.get_conn()?;

        let row: CountResult = diesel::sql_query(
            "SELECT COUNT(*) as count FROM pipeline_jobs
             WHERE kind = 'refresh_credential'
               AND source_connection_id = $1
               AND status IN ('pending', 'scheduled', 'running')",
        )
        .bind::<diesel::sql_types::Uuid, _>(connection_id)
        .get_result(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to count refresh jobs: {}", e)))?;

        Ok(row.count > 0)
    }

    async fn list_stuck_pending(&self, older_than: Duration) -> AppResult<Vec<JobRecord>> {
        let mut conn = self.get_conn()?;

        let jobs: Vec<PipelineJobModel> = diesel::sql_query(
            "SELECT * FROM pipeline_jobs
             WHERE status = 'pending'
               AND created_at < NOW() - make_interval(secs => $1)
             ORDER BY created_at ASC",
        )
        .bind::<diesel::sql_types::Double, _>(older_than.num_seconds() as f64)
        .load(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to list stuck jobs: {}", e)))?;

        Ok(jobs.into_iter().map(|j| j.to_job_record()).collect())
    }

    async fn statistics(&self) -> AppResult<JobStatistics> {
        let mut conn = self.get_conn()?;

        let pending = Self::count_by_status(&mut conn, "pending")?;
        let scheduled = Self::count_by_status(&mut conn, "scheduled")?;
        let running = Self::count_by_status(&mut conn, "running")?;
        let succeeded = Self::count_by_status(&mut conn, "succeeded")?;
        let failed = Self::count_by_status(&mut conn, "failed")?;

        Ok(JobStatistics {
            pending_count: pending,
            scheduled_count: scheduled,
            running_count: running,
            succeeded_count: succeeded,
            failed_count: failed,
            total_count: pending + scheduled + running + succeeded + failed,
        })
    }
}
