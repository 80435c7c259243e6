use crate::modules::publish::domain::entities::PublishAttempt;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PublishAttemptRepository: Send + Sync {
    /// Ensure a pending attempt row exists for the pair, returning the
    /// existing row unchanged when one is already there.
    async fn upsert_pending(
        &self,
        source_item_id: Uuid,
        destination_connection_id: Uuid,
    ) -> AppResult<PublishAttempt>;

    async fn get(&self, attempt_id: Uuid) -> AppResult<Option<PublishAttempt>>;

    /// Move the attempt into in_progress, bumping its attempt count and
    /// clearing the previous error. Returns the updated row.
    async fn mark_in_progress(&self, attempt_id: Uuid) -> AppResult<PublishAttempt>;

    async fn mark_succeeded(&self, attempt_id: Uuid, repost_url: &str) -> AppResult<()>;

    async fn mark_failed(&self, attempt_id: Uuid, error: &str) -> AppResult<()>;

    async fn list_for_item(&self, source_item_id: Uuid) -> AppResult<Vec<PublishAttempt>>;
}
