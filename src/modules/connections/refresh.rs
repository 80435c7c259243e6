/// OAuth token refresh against platform token endpoints
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::modules::connections::domain::entities::Platform;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

const TIKTOK_TOKEN_URL: &str = "https://open.tiktokapis.com/v2/oauth/token/";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Plaintext credentials returned by a successful refresh. The caller is
/// responsible for encrypting before storage.
#[derive(Debug, Clone)]
pub struct RefreshedCredential {
    pub access_token: String,
    /// Some platforms rotate the refresh token; None means keep the old one
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(
        &self,
        platform: Platform,
        refresh_token: &str,
    ) -> AppResult<RefreshedCredential>;
}

/// OAuth client id/secret pair for one platform
#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

pub struct OAuthTokenRefresher {
    client: reqwest::Client,
    credentials: HashMap<Platform, OAuthClientCredentials>,
}

impl OAuthTokenRefresher {
    pub fn new(credentials: HashMap<Platform, OAuthClientCredentials>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REFRESH_TIMEOUT)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to build refresh client: {}", e))
            })?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Read client credentials from TIKTOK_CLIENT_ID/SECRET and
    /// YOUTUBE_CLIENT_ID/SECRET; platforms without env vars are skipped.
    pub fn from_env() -> AppResult<Self> {
        let mut credentials = HashMap::new();

        for (platform, prefix) in [(Platform::TikTok, "TIKTOK"), (Platform::YouTube, "YOUTUBE")] {
            let id = std::env::var(format!("{}_CLIENT_ID", prefix));
            let secret = std::env::var(format!("{}_CLIENT_SECRET", prefix));
            if let (Ok(client_id), Ok(client_secret)) = (id, secret) {
                credentials.insert(
                    platform,
                    OAuthClientCredentials {
                        client_id,
                        client_secret,
                    },
                );
            }
        }

        Self::new(credentials)
    }

    fn token_url(platform: Platform) -> AppResult<&'static str> {
        match platform {
            Platform::TikTok => Ok(TIKTOK_TOKEN_URL),
            Platform::YouTube => Ok(GOOGLE_TOKEN_URL),
            Platform::Instagram => Err(AppError::InvalidInput(
                "Instagram does not support token refresh".into(),
            )),
        }
    }
}

#[async_trait]
impl TokenRefresher for OAuthTokenRefresher {
    async fn refresh(
        &self,
        platform: Platform,
        refresh_token: &str,
    ) -> AppResult<RefreshedCredential> {
        let url = Self::token_url(platform)?;
        let creds = self.credentials.get(&platform).ok_or_else(|| {
            AppError::InternalError(format!("No OAuth client configured for {}", platform))
        })?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];

        let response = self.client.post(url).form(&params).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            // An invalid_grant means the refresh token itself is dead
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unauthorized(format!(
                "Token refresh rejected by {}: {}",
                platform, body
            )));
        }
        if !status.is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Token refresh failed with status {} from {}",
                status, platform
            )));
        }

        let token: TokenResponse = response.json().await?;

        let expires_at = token
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

        Ok(RefreshedCredential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
        })
    }
}
