/// YouTube Shorts publisher
///
/// Uploads through the resumable upload protocol: fetch the media bytes
/// from storage, open an upload session with the video metadata, then
/// send the bytes in one shot.
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::modules::connections::domain::entities::Platform;
use crate::modules::publish::publisher::{PublishRequest, Publisher};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

pub struct YouTubePublisher {
    client: reqwest::Client,
    upload_url: String,
}

impl YouTubePublisher {
    pub fn new() -> AppResult<Self> {
        Self::with_upload_url(UPLOAD_URL.to_string())
    }

    pub fn with_upload_url(upload_url: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, upload_url })
    }

    /// YouTube titles cap at 100 characters; truncate on a char boundary.
    fn title_from_caption(caption: &str) -> String {
        let title = caption.lines().next().unwrap_or_default().trim();
        if title.is_empty() {
            return "Short".to_string();
        }
        title.chars().take(MAX_TITLE_LEN).collect()
    }

    async fn fetch_media(&self, media_url: &str) -> AppResult<Vec<u8>> {
        let response = self.client.get(media_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Media fetch for upload returned {}",
                status
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn open_session(&self, request: &PublishRequest) -> AppResult<String> {
        let metadata = json!({
            "snippet": {
                "title": Self::title_from_caption(&request.caption),
                "description": request.caption,
            },
            "status": { "privacyStatus": "public" },
        });

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&request.access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .json(&metadata)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(
                "YouTube rejected credentials while opening upload session".into(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "YouTube upload session returned {}",
                status
            )));
        }

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::ExternalServiceError(
                    "YouTube upload session response had no Location header".into(),
                )
            })
    }

    async fn upload_bytes(
        &self,
        session_url: &str,
        access_token: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        let response = self
            .client
            .put(session_url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(
                "YouTube rejected credentials during upload".into(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "YouTube upload returned {}",
                status
            )));
        }

        let video: UploadedVideo = response.json().await?;
        Ok(video.id)
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn publish(&self, request: &PublishRequest) -> AppResult<String> {
        let bytes = self.fetch_media(&request.media_url).await?;
        let session_url = self.open_session(request).await?;
        let video_id = self
            .upload_bytes(&session_url, &request.access_token, bytes)
            .await?;
        Ok(format!("https://www.youtube.com/shorts/{}", video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_uses_first_line_truncated() {
        assert_eq!(
            YouTubePublisher::title_from_caption("My clip\nmore detail"),
            "My clip"
        );

        let long = "x".repeat(250);
        assert_eq!(YouTubePublisher::title_from_caption(&long).chars().count(), 100);
    }

    #[test]
    fn empty_caption_gets_fallback_title() {
        assert_eq!(YouTubePublisher::title_from_caption(""), "Short");
        assert_eq!(YouTubePublisher::title_from_caption("\n"), "Short");
    }
}
