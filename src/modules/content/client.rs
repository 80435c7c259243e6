/// Client abstraction over the source platform's content listing API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// One short-form video as reported by the source platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    /// Platform-assigned id, stable across listings
    pub external_id: String,
    pub caption: Option<String>,
    /// Direct download URL for the video file
    pub media_url: String,
    pub posted_at: Option<DateTime<Utc>>,
}

/// A page of listed items plus a cursor for the next page
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<SourceItem>,
    pub next_cursor: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSourceClient: Send + Sync {
    /// List the account's most recent items, newest first.
    async fn fetch_recent_items(
        &self,
        access_token: &str,
        cursor: Option<String>,
        page_size: u32,
    ) -> AppResult<ItemPage>;
}
