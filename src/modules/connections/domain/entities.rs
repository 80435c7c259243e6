/// Connected platform accounts and their credential lifecycle
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platforms the pipeline talks to. TikTok is the content source;
/// Instagram and YouTube are publish destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Instagram,
    YouTube,
}

impl Platform {
    /// Whether this platform issues refresh tokens we can rotate.
    /// Instagram long-lived tokens are re-granted through the user flow
    /// instead, so background refresh does not apply.
    pub fn supports_refresh(&self) -> bool {
        match self {
            Platform::TikTok | Platform::YouTube => true,
            Platform::Instagram => false,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Platform::TikTok)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::TikTok => write!(f, "tiktok"),
            Platform::Instagram => write!(f, "instagram"),
            Platform::YouTube => write!(f, "youtube"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiktok" => Ok(Platform::TikTok),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::YouTube),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Expired,
    Error,
    Revoked,
}

impl ConnectionStatus {
    /// Connections in these states are skipped by sweeps and handlers.
    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionStatus::Active)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Active => write!(f, "active"),
            ConnectionStatus::Expired => write!(f, "expired"),
            ConnectionStatus::Error => write!(f, "error"),
            ConnectionStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// A connected account. Tokens are stored encrypted; only the credential
/// vault can recover the plaintext.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform: Platform,
    pub external_account_id: String,
    pub handle: String,
    pub access_token_enc: String,
    pub refresh_token_enc: Option<String>,
    pub status: ConnectionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for registering a new connection after an OAuth handshake completes
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform: Platform,
    pub external_account_id: String,
    pub handle: String,
    pub access_token_enc: String,
    pub refresh_token_enc: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
