/// Media staging: download from the source platform, hash, store
///
/// Staging is idempotent through its key scheme. The storage key depends
/// only on the rule and item ids, so a re-run after a partial failure
/// overwrites the same object instead of accumulating copies.
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::log_debug;
use crate::modules::media::storage::ObjectStorage;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::RateLimiter;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const DOWNLOADS_PER_SECOND: f64 = 2.0;
const MEDIA_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMedia {
    pub storage_key: String,
    /// Hex-encoded SHA-256 of the stored bytes
    pub content_hash: String,
    pub size_bytes: usize,
}

pub struct MediaStager {
    client: reqwest::Client,
    storage: Arc<dyn ObjectStorage>,
    limiter: RateLimiter,
}

impl MediaStager {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            storage,
            limiter: RateLimiter::new(DOWNLOADS_PER_SECOND),
        })
    }

    pub fn storage_key(rule_id: Uuid, item_id: Uuid) -> String {
        format!("media/{}/{}.mp4", rule_id, item_id)
    }

    /// Download the item's media and store it under the deterministic key.
    pub async fn stage(
        &self,
        rule_id: Uuid,
        item_id: Uuid,
        media_url: &str,
        access_token: Option<&str>,
    ) -> AppResult<StagedMedia> {
        self.limiter.wait().await?;

        let mut request = self.client.get(media_url);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Media download from {} returned {}",
                media_url, status
            )));
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(AppError::ExternalServiceError(format!(
                "Media download from {} returned an empty body",
                media_url
            )));
        }

        let content_hash = format!("{:x}", Sha256::digest(&bytes));
        let storage_key = Self::storage_key(rule_id, item_id);
        let size_bytes = bytes.len();

        self.storage
            .put(&storage_key, bytes, MEDIA_CONTENT_TYPE)
            .await?;

        log_debug!(
            "Staged {} bytes at {} (sha256 {})",
            size_bytes,
            storage_key,
            &content_hash[..12]
        );

        Ok(StagedMedia {
            storage_key,
            content_hash,
            size_bytes,
        })
    }
}
