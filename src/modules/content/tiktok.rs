/// TikTok content listing client
///
/// Talks to the TikTok open API video list endpoint with a local rate
/// limiter and bounded retries on 429 and server errors.
use std::num::NonZeroU32;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

use crate::log_warn;
use crate::modules::content::client::{ContentSourceClient, ItemPage, SourceItem};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

const VIDEO_LIST_URL: &str = "https://open.tiktokapis.com/v2/video/list/";
const VIDEO_LIST_FIELDS: &str = "id,title,create_time,share_url,video_description";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

type DirectRateLimiter = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    data: VideoListData,
}

#[derive(Debug, Deserialize)]
struct VideoListData {
    #[serde(default)]
    videos: Vec<VideoEntry>,
    #[serde(default)]
    has_more: bool,
    cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct VideoEntry {
    id: String,
    video_description: Option<String>,
    share_url: String,
    create_time: Option<i64>,
}

pub struct TikTokContentClient {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl TikTokContentClient {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build client: {}", e)))?;

        // TikTok allows roughly 6 qps per app token; stay well under it
        let quota = Quota::with_period(Duration::from_millis(500))
            .unwrap()
            .allow_burst(NonZeroU32::new(2).unwrap());

        Ok(Self {
            client,
            rate_limiter: GovernorRateLimiter::direct(quota),
        })
    }

    async fn post_video_list(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> AppResult<VideoListResponse> {
        let mut body = json!({ "max_count": page_size });
        if let Some(cursor) = cursor {
            let cursor: i64 = cursor
                .parse()
                .map_err(|_| AppError::InvalidInput(format!("Bad cursor: {}", cursor)))?;
            body["cursor"] = json!(cursor);
        }

        let mut attempt = 0;
        loop {
            self.rate_limiter.until_ready().await;

            let response = self
                .client
                .post(VIDEO_LIST_URL)
                .query(&[("fields", VIDEO_LIST_FIELDS)])
                .bearer_auth(access_token)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < MAX_RETRIES {
                    let delay = RETRY_BASE_DELAY * 2_u32.pow(attempt);
                    log_warn!(
                        "TikTok video list returned {} (attempt {}/{}), retrying in {:?}",
                        status,
                        attempt + 1,
                        MAX_RETRIES + 1,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(AppError::ExternalServiceError(format!(
                    "TikTok video list failed with {} after {} attempts",
                    status,
                    attempt + 1
                )));
            }

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(AppError::Unauthorized(
                    "TikTok rejected the access token".into(),
                ));
            }
            if !status.is_success() {
                return Err(AppError::ApiError(format!(
                    "TikTok video list returned {}",
                    status
                )));
            }

            return response.json().await.map_err(AppError::from);
        }
    }
}

#[async_trait]
impl ContentSourceClient for TikTokContentClient {
    async fn fetch_recent_items(
        &self,
        access_token: &str,
        cursor: Option<String>,
        page_size: u32,
    ) -> AppResult<ItemPage> {
        let response = self
            .post_video_list(access_token, cursor.as_deref(), page_size)
            .await?;

        let items = response
            .data
            .videos
            .into_iter()
            .map(|video| SourceItem {
                external_id: video.id,
                caption: video.video_description,
                media_url: video.share_url,
                posted_at: video
                    .create_time
                    .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            })
            .collect();

        let next_cursor = if response.data.has_more {
            response.data.cursor.map(|c| c.to_string())
        } else {
            None
        };

        Ok(ItemPage { items, next_cursor })
    }
}
