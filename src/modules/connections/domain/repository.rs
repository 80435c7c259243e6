use crate::modules::connections::domain::entities::{Connection, NewConnection};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn create(&self, connection: NewConnection) -> AppResult<Connection>;

    async fn get(&self, connection_id: Uuid) -> AppResult<Option<Connection>>;

    /// Flip a connection back to active and clear its last error.
    async fn mark_active(&self, connection_id: Uuid) -> AppResult<()>;

    /// Record an operational error against the connection and move it to
    /// the error state.
    async fn record_error(&self, connection_id: Uuid, error: &str) -> AppResult<()>;

    /// Store freshly rotated credentials (already encrypted) and restore
    /// the connection to active.
    async fn update_tokens(
        &self,
        connection_id: Uuid,
        access_token_enc: &str,
        refresh_token_enc: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    async fn stamp_last_synced(&self, connection_id: Uuid) -> AppResult<()>;

    /// Move every active connection whose expiry has passed into the
    /// expired state. Returns how many rows changed.
    async fn expire_past_due(&self) -> AppResult<usize>;

    /// Active, refresh-capable connections whose credentials expire
    /// within the lookahead window.
    async fn list_expiring_within(&self, lookahead: Duration) -> AppResult<Vec<Connection>>;

    /// Active source connections that have not synced within the cooldown.
    async fn list_sources_due_for_sync(&self, cooldown: Duration) -> AppResult<Vec<Connection>>;
}
