/// In-memory source item repository for tests and local development
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::modules::content::domain::{
    InsertOutcome, NewSourceItem, SourceItemRecord, SourceItemRepository,
};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemorySourceItemRepository {
    items: Mutex<HashMap<Uuid, SourceItemRecord>>,
}

impl MemorySourceItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl SourceItemRepository for MemorySourceItemRepository {
    async fn insert(&self, item: NewSourceItem) -> AppResult<InsertOutcome> {
        let mut items = self.items.lock().unwrap();

        let duplicate = items
            .values()
            .any(|existing| existing.rule_id == item.rule_id && existing.external_id == item.external_id);
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        let record = SourceItemRecord {
            id: Uuid::new_v4(),
            rule_id: item.rule_id,
            external_id: item.external_id,
            caption: item.caption,
            media_url: item.media_url,
            posted_at: item.posted_at,
            storage_key: None,
            content_hash: None,
            created_at: Utc::now(),
        };

        items.insert(record.id, record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn get(&self, item_id: Uuid) -> AppResult<Option<SourceItemRecord>> {
        Ok(self.items.lock().unwrap().get(&item_id).cloned())
    }

    async fn set_staged(
        &self,
        item_id: Uuid,
        storage_key: &str,
        content_hash: &str,
    ) -> AppResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Source item {} not found", item_id)))?;
        item.storage_key = Some(storage_key.to_string());
        item.content_hash = Some(content_hash.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(rule_id: Uuid, external_id: &str) -> NewSourceItem {
        NewSourceItem {
            rule_id,
            external_id: external_id.to_string(),
            caption: Some("clip".to_string()),
            media_url: "https://cdn.example.com/clip.mp4".to_string(),
            posted_at: None,
        }
    }

    #[tokio::test]
    async fn same_external_id_for_same_rule_is_a_duplicate() {
        let repo = MemorySourceItemRepository::new();
        let rule_id = Uuid::new_v4();

        let first = repo.insert(new_item(rule_id, "vid-1")).await.unwrap();
        assert!(first.created().is_some());

        let second = repo.insert(new_item(rule_id, "vid-1")).await.unwrap();
        assert!(second.created().is_none());
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test]
    async fn same_external_id_under_different_rules_is_distinct() {
        let repo = MemorySourceItemRepository::new();

        let first = repo
            .insert(new_item(Uuid::new_v4(), "vid-1"))
            .await
            .unwrap();
        let second = repo
            .insert(new_item(Uuid::new_v4(), "vid-1"))
            .await
            .unwrap();

        assert!(first.created().is_some());
        assert!(second.created().is_some());
    }

    #[tokio::test]
    async fn staging_records_key_and_hash() {
        let repo = MemorySourceItemRepository::new();
        let record = repo
            .insert(new_item(Uuid::new_v4(), "vid-1"))
            .await
            .unwrap()
            .created()
            .cloned()
            .unwrap();
        assert!(!record.is_staged());

        repo.set_staged(record.id, "media/abc.mp4", "deadbeef")
            .await
            .unwrap();

        let staged = repo.get(record.id).await.unwrap().unwrap();
        assert!(staged.is_staged());
        assert_eq!(staged.content_hash.as_deref(), Some("deadbeef"));
    }
}
