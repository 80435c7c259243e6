/// Instagram Reels publisher
///
/// Instagram publishing is a three-step flow: create a media container
/// from the video URL, poll until the container finishes processing, then
/// publish the container. Polling is bounded so a stuck container fails
/// the attempt instead of hanging the worker.
use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;

use crate::log_debug;
use crate::modules::connections::domain::entities::Platform;
use crate::modules::publish::publisher::{PublishRequest, Publisher};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com/v19.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONTAINER_POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONTAINER_MAX_POLLS: u32 = 30;

#[derive(Debug, Deserialize)]
struct ContainerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    status_code: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    permalink: Option<String>,
}

pub struct InstagramPublisher {
    client: reqwest::Client,
    base_url: String,
}

impl InstagramPublisher {
    pub fn new() -> AppResult<Self> {
        Self::with_base_url(GRAPH_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    async fn create_container(&self, request: &PublishRequest) -> AppResult<String> {
        let url = format!("{}/{}/media", self.base_url, request.account_id);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("media_type", "REELS"),
                ("video_url", request.media_url.as_str()),
                ("caption", request.caption.as_str()),
                ("access_token", request.access_token.as_str()),
            ])
            .send()
            .await?;

        let container: ContainerResponse = Self::parse(response, "container create").await?;
        Ok(container.id)
    }

    async fn wait_for_container(&self, container_id: &str, access_token: &str) -> AppResult<()> {
        let url = format!("{}/{}", self.base_url, container_id);

        for poll in 0..CONTAINER_MAX_POLLS {
            let response = self
                .client
                .get(&url)
                .query(&[("fields", "status_code"), ("access_token", access_token)])
                .send()
                .await?;

            let status: ContainerStatus = Self::parse(response, "container status").await?;
            match status.status_code.as_str() {
                "FINISHED" => return Ok(()),
                "ERROR" | "EXPIRED" => {
                    return Err(AppError::ExternalServiceError(format!(
                        "Instagram container {} ended in {}",
                        container_id, status.status_code
                    )));
                }
                other => {
                    log_debug!(
                        "Instagram container {} is {} (poll {}/{})",
                        container_id,
                        other,
                        poll + 1,
                        CONTAINER_MAX_POLLS
                    );
                    sleep(CONTAINER_POLL_INTERVAL).await;
                }
            }
        }

        Err(AppError::ExternalServiceError(format!(
            "Instagram container {} did not finish within {} polls",
            container_id, CONTAINER_MAX_POLLS
        )))
    }

    async fn publish_container(
        &self,
        request: &PublishRequest,
        container_id: &str,
    ) -> AppResult<String> {
        let url = format!("{}/{}/media_publish", self.base_url, request.account_id);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("creation_id", container_id),
                ("access_token", request.access_token.as_str()),
            ])
            .send()
            .await?;

        let published: PublishResponse = Self::parse(response, "media publish").await?;
        Ok(published.id)
    }

    async fn fetch_permalink(&self, media_id: &str, access_token: &str) -> AppResult<String> {
        let url = format!("{}/{}", self.base_url, media_id);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "permalink"), ("access_token", access_token)])
            .send()
            .await?;

        let permalink: PermalinkResponse = Self::parse(response, "permalink fetch").await?;
        // Freshly published media can lag behind the permalink field
        Ok(permalink
            .permalink
            .unwrap_or_else(|| format!("https://www.instagram.com/reel/{}", media_id)))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        step: &str,
    ) -> AppResult<T> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(format!(
                "Instagram rejected credentials during {}",
                step
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "Instagram {} returned {}: {}",
                step, status, body
            )));
        }

        response.json().await.map_err(AppError::from)
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn publish(&self, request: &PublishRequest) -> AppResult<String> {
        let container_id = self.create_container(request).await?;
        self.wait_for_container(&container_id, &request.access_token)
            .await?;
        let media_id = self.publish_container(request, &container_id).await?;
        self.fetch_permalink(&media_id, &request.access_token).await
    }
}
