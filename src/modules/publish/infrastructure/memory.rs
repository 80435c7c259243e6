/// In-memory publish attempt repository for tests and local development
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::modules::publish::domain::entities::{PublishAttempt, PublishStatus};
use crate::modules::publish::domain::repository::PublishAttemptRepository;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemoryPublishAttemptRepository {
    attempts: Mutex<HashMap<Uuid, PublishAttempt>>,
}

impl MemoryPublishAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, attempt_id: Uuid, f: F) -> AppResult<PublishAttempt>
    where
        F: FnOnce(&mut PublishAttempt),
    {
        let mut attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Publish attempt {} not found", attempt_id)))?;
        f(attempt);
        attempt.updated_at = Utc::now();
        Ok(attempt.clone())
    }
}

#[async_trait]
impl PublishAttemptRepository for MemoryPublishAttemptRepository {
    async fn upsert_pending(
        &self,
        source_item_id: Uuid,
        destination_connection_id: Uuid,
    ) -> AppResult<PublishAttempt> {
        let mut attempts = self.attempts.lock().unwrap();

        if let Some(existing) = attempts.values().find(|a| {
            a.source_item_id == source_item_id
                && a.destination_connection_id == destination_connection_id
        }) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let attempt = PublishAttempt {
            id: Uuid::new_v4(),
            source_item_id,
            destination_connection_id,
            status: PublishStatus::Pending,
            attempt_count: 0,
            repost_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn get(&self, attempt_id: Uuid) -> AppResult<Option<PublishAttempt>> {
        Ok(self.attempts.lock().unwrap().get(&attempt_id).cloned())
    }

    async fn mark_in_progress(&self, attempt_id: Uuid) -> AppResult<PublishAttempt> {
        self.update(attempt_id, |a| {
            a.status = PublishStatus::InProgress;
            a.attempt_count += 1;
            a.error = None;
        })
    }

    async fn mark_succeeded(&self, attempt_id: Uuid, repost_url: &str) -> AppResult<()> {
        let repost_url = repost_url.to_string();
        self.update(attempt_id, move |a| {
            a.status = PublishStatus::Succeeded;
            a.repost_url = Some(repost_url);
            a.error = None;
        })
        .map(|_| ())
    }

    async fn mark_failed(&self, attempt_id: Uuid, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(attempt_id, move |a| {
            a.status = PublishStatus::Failed;
            a.error = Some(error);
        })
        .map(|_| ())
    }

    async fn list_for_item(&self, source_item_id: Uuid) -> AppResult<Vec<PublishAttempt>> {
        let mut attempts: Vec<PublishAttempt> = self
            .attempts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.source_item_id == source_item_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.created_at);
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_per_pair() {
        let repo = MemoryPublishAttemptRepository::new();
        let item = Uuid::new_v4();
        let destination = Uuid::new_v4();

        let first = repo.upsert_pending(item, destination).await.unwrap();
        let second = repo.upsert_pending(item, destination).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = repo.upsert_pending(item, Uuid::new_v4()).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn upsert_does_not_reset_a_succeeded_attempt() {
        let repo = MemoryPublishAttemptRepository::new();
        let item = Uuid::new_v4();
        let destination = Uuid::new_v4();

        let attempt = repo.upsert_pending(item, destination).await.unwrap();
        repo.mark_in_progress(attempt.id).await.unwrap();
        repo.mark_succeeded(attempt.id, "https://dest.example/post/1")
            .await
            .unwrap();

        let again = repo.upsert_pending(item, destination).await.unwrap();
        assert_eq!(again.id, attempt.id);
        assert_eq!(again.status, PublishStatus::Succeeded);
        assert_eq!(
            again.repost_url.as_deref(),
            Some("https://dest.example/post/1")
        );
    }

    #[tokio::test]
    async fn mark_in_progress_bumps_count_and_clears_error() {
        let repo = MemoryPublishAttemptRepository::new();
        let attempt = repo
            .upsert_pending(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        repo.mark_in_progress(attempt.id).await.unwrap();
        repo.mark_failed(attempt.id, "upstream 500").await.unwrap();

        let retried = repo.mark_in_progress(attempt.id).await.unwrap();
        assert_eq!(retried.attempt_count, 2);
        assert!(retried.error.is_none());
    }
}
