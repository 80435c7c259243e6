/// Postgres-backed dispatch queue
///
/// Claiming uses FOR UPDATE SKIP LOCKED so concurrent workers never block
/// each other and never claim the same entry twice.
use crate::modules::queue::domain::{DispatchQueue, NackOutcome, QueueConfig, QueueDelivery};
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(QueryableByName)]
struct ClaimedRow {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    job_id: Uuid,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    attempts: i32,
}

#[derive(QueryableByName)]
struct NackedRow {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    dead_lettered: bool,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    available_at: DateTime<Utc>,
}

pub struct DieselDispatchQueue {
    pool: DbPool,
    config: QueueConfig,
}

impl DieselDispatchQueue {
    pub fn new(pool: DbPool, config: QueueConfig) -> Self {
        Self { pool, config }
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
}

#[async_trait]
impl DispatchQueue for DieselDispatchQueue {
    async fn push(&self, job_id: Uuid, priority: i32) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "INSERT INTO dispatch_queue (job_id, priority, available_at)
             VALUES ($1, $2, NOW())",
        )
        .bind::<diesel::sql_types::Uuid, _>(job_id)
        .bind::<diesel::sql_types::Integer, _>(priority)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to enqueue job: {}", e)))?;

        Ok(())
    }

    async fn pull(&self) -> AppResult<Option<QueueDelivery>> {
        let mut conn = self.get_conn()?;

        let claimed: Option<ClaimedRow> = diesel::sql_query(
            "UPDATE dispatch_queue
             SET locked_until = NOW() + make_interval(secs => $1),
                 attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM dispatch_queue
                 WHERE dead_lettered = FALSE
                   AND available_at <= NOW()
                   AND (locked_until IS NULL OR locked_until <= NOW())
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, job_id, attempts",
        )
        .bind::<diesel::sql_types::Double, _>(self.config.visibility_timeout.as_secs_f64())
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::DatabaseError(format!("Failed to claim queue entry: {}", e)))?;

        Ok(claimed.map(|row| QueueDelivery {
            entry_id: row.id,
            job_id: row.job_id,
            attempt: row.attempts,
        }))
    }

    async fn ack(&self, delivery: &QueueDelivery) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query("DELETE FROM dispatch_queue WHERE id = $1")
            .bind::<diesel::sql_types::Uuid, _>(delivery.entry_id)
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to ack queue entry: {}", e)))?;

        Ok(())
    }

    async fn nack(&self, delivery: &QueueDelivery, error: &str) -> AppResult<NackOutcome> {
        let mut conn = self.get_conn()?;

        let backoff = self.config.backoff_for(delivery.attempt);

        let row: Option<NackedRow> = diesel::sql_query(
            "UPDATE dispatch_queue
             SET dead_lettered = (attempts >= $2),
                 available_at = CASE
                     WHEN attempts >= $2 THEN available_at
                     ELSE NOW() + make_interval(secs => $3)
                 END,
                 locked_until = NULL,
                 last_error = $4
             WHERE id = $1
             RETURNING dead_lettered, available_at",
        )
        .bind::<diesel::sql_types::Uuid, _>(delivery.entry_id)
        .bind::<diesel::sql_types::Integer, _>(self.config.max_attempts)
        .bind::<diesel::sql_types::Double, _>(backoff.as_secs_f64())
        .bind::<diesel::sql_types::Text, _>(error)
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::DatabaseError(format!("Failed to nack queue entry: {}", e)))?;

        match row {
            Some(row) if row.dead_lettered => Ok(NackOutcome::DeadLettered),
            Some(row) => Ok(NackOutcome::Retry(row.available_at)),
            // Entry already removed; nothing left to retry
            None => Ok(NackOutcome::DeadLettered),
        }
    }
}
