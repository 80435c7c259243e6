/// Publish attempts: one row per (source item, destination) pair
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishStatus::Pending => write!(f, "pending"),
            PublishStatus::InProgress => write!(f, "in_progress"),
            PublishStatus::Succeeded => write!(f, "succeeded"),
            PublishStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Bookkeeping for one destination of one source item. The unique
/// (source_item_id, destination_connection_id) pair makes retries land
/// on the same row instead of creating new ones.
#[derive(Debug, Clone)]
pub struct PublishAttempt {
    pub id: Uuid,
    pub source_item_id: Uuid,
    pub destination_connection_id: Uuid,
    pub status: PublishStatus,
    pub attempt_count: i32,
    pub repost_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
