/// Diesel-based implementation of the publish attempt repository
use crate::modules::publish::domain::entities::PublishAttempt;
use crate::modules::publish::domain::repository::PublishAttemptRepository;
use crate::modules::publish::domain::value_objects::PublishStatusDb;
use crate::schema::publish_attempts;
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = publish_attempts)]
struct PublishAttemptModel {
    id: Uuid,
    source_item_id: Uuid,
    destination_connection_id: Uuid,
    status: PublishStatusDb,
    attempt_count: i32,
    repost_url: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PublishAttemptModel {
    fn to_attempt(self) -> PublishAttempt {
        PublishAttempt {
            id: self.id,
            source_item_id: self.source_item_id,
            destination_connection_id: self.destination_connection_id,
            status: self.status.into(),
            attempt_count: self.attempt_count,
            repost_url: self.repost_url,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = publish_attempts)]
struct NewPublishAttemptModel {
    source_item_id: Uuid,
    destination_connection_id: Uuid,
}

pub struct PublishAttemptRepositoryImpl {
    pool: DbPool,
}

impl PublishAttemptRepositoryImpl {
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
}

#[async_trait]
impl PublishAttemptRepository for PublishAttemptRepositoryImpl {
    async fn upsert_pending(
        &self,
        source_item_id: Uuid,
        destination_connection_id: Uuid,
    ) -> AppResult<PublishAttempt> {
        let mut conn = self.get_conn()?;

        // Insert-or-fetch against the unique pair constraint
        let inserted: Option<PublishAttemptModel> = diesel::insert_into(publish_attempts::table)
            .values(NewPublishAttemptModel {
                source_item_id,
                destination_connection_id,
            })
            .on_conflict_do_nothing()
            .get_result(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to upsert attempt: {}", e)))?;

        if let Some(model) = inserted {
            return Ok(model.to_attempt());
        }

        let existing: PublishAttemptModel = publish_attempts::table
            .filter(publish_attempts::source_item_id.eq(source_item_id))
            .filter(publish_attempts::destination_connection_id.eq(destination_connection_id))
            .first(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch attempt: {}", e)))?;

        Ok(existing.to_attempt())
    }

    async fn get(&self, attempt_id: Uuid) -> AppResult<Option<PublishAttempt>> {
        let mut conn = self.get_conn()?;

        let model: Option<PublishAttemptModel> = publish_attempts::table
            .find(attempt_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get attempt: {}", e)))?;

        Ok(model.map(|m| m.to_attempt()))
    }

    async fn mark_in_progress(&self, attempt_id: Uuid) -> AppResult<PublishAttempt> {
        let mut conn = self.get_conn()?;

        let model: PublishAttemptModel = diesel::sql_query(
            "UPDATE publish_attempts
             SET status = 'in_progress',
                 attempt_count = attempt_count + 1,
                 error = NULL,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind::<diesel::sql_types::Uuid, _>(attempt_id)
        .get_result(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark attempt in progress: {}", e)))?;

        Ok(model.to_attempt())
    }

    async fn mark_succeeded(&self, attempt_id: Uuid, repost_url: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE publish_attempts
             SET status = 'succeeded',
                 repost_url = $2,
                 error = NULL,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(attempt_id)
        .bind::<diesel::sql_types::Text, _>(repost_url)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark attempt succeeded: {}", e)))?;

        Ok(())
    }

    async fn mark_failed(&self, attempt_id: Uuid, error: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE publish_attempts
             SET status = 'failed',
                 error = $2,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(attempt_id)
        .bind::<diesel::sql_types::Text, _>(error)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark attempt failed: {}", e)))?;

        Ok(())
    }

    async fn list_for_item(&self, source_item_id: Uuid) -> AppResult<Vec<PublishAttempt>> {
        let mut conn = self.get_conn()?;

        let models: Vec<PublishAttemptModel> = publish_attempts::table
            .filter(publish_attempts::source_item_id.eq(source_item_id))
            .order(publish_attempts::created_at.asc())
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to list attempts: {}", e)))?;

        Ok(models.into_iter().map(|m| m.to_attempt()).collect())
    }
}
