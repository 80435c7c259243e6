/// Durable record of a discovered source item
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct SourceItemRecord {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub external_id: String,
    pub caption: Option<String>,
    pub media_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    /// Set once the media has been staged into object storage
    pub storage_key: Option<String>,
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SourceItemRecord {
    pub fn is_staged(&self) -> bool {
        self.storage_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewSourceItem {
    pub rule_id: Uuid,
    pub external_id: String,
    pub caption: Option<String>,
    pub media_url: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Result of a deduplicating insert
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(SourceItemRecord),
    /// The (rule_id, external_id) pair already exists; nothing was written
    Duplicate,
}

impl InsertOutcome {
    pub fn created(&self) -> Option<&SourceItemRecord> {
        match self {
            InsertOutcome::Created(record) => Some(record),
            InsertOutcome::Duplicate => None,
        }
    }
}

#[async_trait]
pub trait SourceItemRepository: Send + Sync {
    /// Insert an item unless its (rule_id, external_id) already exists.
    /// Concurrent inserts of the same pair race safely; exactly one wins.
    async fn insert(&self, item: NewSourceItem) -> AppResult<InsertOutcome>;

    async fn get(&self, item_id: Uuid) -> AppResult<Option<SourceItemRecord>>;

    /// Record where the staged media landed and its content hash.
    async fn set_staged(
        &self,
        item_id: Uuid,
        storage_key: &str,
        content_hash: &str,
    ) -> AppResult<()>;
}
