/// Diesel-based implementation of the connection repository
use crate::modules::connections::domain::entities::{Connection, NewConnection};
use crate::modules::connections::domain::repository::ConnectionRepository;
use crate::modules::connections::infrastructure::models::{ConnectionModel, NewConnectionModel};
use crate::schema::connections;
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct ConnectionRepositoryImpl {
    pool: DbPool,
}

impl ConnectionRepositoryImpl {
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
impl ConnectionRepository for ConnectionRepositoryImpl {
    async fn create(&self, connection: NewConnection) -> AppResult<Connection> {
        let mut conn = self.get_conn()?;
        let model = NewConnectionModel::from(connection);

        let inserted: ConnectionModel = diesel::insert_into(connections::table)
            .values(&model)
            .get_result(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to create connection: {}", e)))?;

        inserted.to_connection()
    }

    async fn get(&self, connection_id: Uuid) -> AppResult<Option<Connection>> {
        let mut conn = self.get_conn()?;

        let model: Option<ConnectionModel> = connections::table
            .find(connection_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get connection: {}", e)))?;

        model.map(|m| m.to_connection()).transpose()
    }

    async fn mark_active(&self, connection_id: Uuid) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE connections
             SET status = 'active',
                 last_error = NULL,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(connection_id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark connection active: {}", e)))?;

        Ok(())
    }

    async fn record_error(&self, connection_id: Uuid, error: &str) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE connections
             SET status = 'error',
                 last_error = $2,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(connection_id)
        .bind::<diesel::sql_types::Text, _>(error)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to record connection error: {}", e)))?;

        Ok(())
    }

    async fn update_tokens(
        &self,
        connection_id: Uuid,
        access_token_enc: &str,
        refresh_token_enc: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        // A refresh that returns no rotation keeps the stored refresh token
        diesel::sql_query(
            "UPDATE connections
             SET access_token_enc = $2,
                 refresh_token_enc = COALESCE($3, refresh_token_enc),
                 expires_at = $4,
                 status = 'active',
                 last_error = NULL,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(connection_id)
        .bind::<diesel::sql_types::Text, _>(access_token_enc)
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(refresh_token_enc)
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>, _>(expires_at)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to update tokens: {}", e)))?;

        Ok(())
    }

    async fn stamp_last_synced(&self, connection_id: Uuid) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(
            "UPDATE connections
             SET last_synced_at = NOW(),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind::<diesel::sql_types::Uuid, _>(connection_id)
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to stamp last_synced_at: {}", e)))?;

        Ok(())
    }

    async fn expire_past_due(&self) -> AppResult<usize> {
        let mut conn = self.get_conn()?;

        let changed = diesel::sql_query(
            "UPDATE connections
             SET status = 'expired',
                 updated_at = NOW()
             WHERE status = 'active'
               AND expires_at IS NOT NULL
               AND expires_at <= NOW()",
        )
        .execute(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to expire connections: {}", e)))?;

        Ok(changed)
    }

    async fn list_expiring_within(&self, lookahead: Duration) -> AppResult<Vec<Connection>> {
        let mut conn = self.get_conn()?;

        let models: Vec<ConnectionModel> = diesel::sql_query(
            "SELECT * FROM connections
             WHERE status = 'active'
               AND refresh_token_enc IS NOT NULL
               AND expires_at IS NOT NULL
               AND expires_at <= NOW() + make_interval(secs => $1)
             ORDER BY expires_at ASC",
        )
        .bind::<diesel::sql_types::Double, _>(lookahead.num_seconds() as f64)
        .load(&mut conn)
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list expiring connections: {}", e))
        })?;

        models.into_iter().map(|m| m.to_connection()).collect()
    }

    async fn list_sources_due_for_sync(&self, cooldown: Duration) -> AppResult<Vec<Connection>> {
        let mut conn = self.get_conn()?;

        let models: Vec<ConnectionModel> = diesel::sql_query(
            "SELECT * FROM connections
             WHERE status = 'active'
               AND platform = 'tiktok'
               AND (last_synced_at IS NULL
                    OR last_synced_at <= NOW() - make_interval(secs => $1))
             ORDER BY last_synced_at ASC NULLS FIRST",
        )
        .bind::<diesel::sql_types::Double, _>(cooldown.num_seconds() as f64)
        .load(&mut conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to list sources due: {}", e)))?;

        models.into_iter().map(|m| m.to_connection()).collect()
    }
}
