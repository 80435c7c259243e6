/// OAuth handshake state tracking
///
/// Each authorization redirect carries an opaque state token minted here.
/// The callback must present the same token; tokens are single use and
/// expire after a short TTL. Both checks fail closed.
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::modules::connections::domain::entities::Platform;
use crate::shared::errors::{AppError, AppResult};

const STATE_TOKEN_LEN: usize = 32;
pub const DEFAULT_HANDSHAKE_TTL: Duration = Duration::from_secs(10 * 60);

/// Context captured when the handshake starts, returned on consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHandshake {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform: Platform,
    /// Where the callback sends the user after the token exchange
    pub redirect_target: String,
}

struct Entry {
    handshake: PendingHandshake,
    issued_at: Instant,
}

pub struct HandshakeStore {
    pending: DashMap<String, Entry>,
    ttl: Duration,
}

impl HandshakeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Mint a state token for a new authorization flow.
    pub fn start(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        platform: Platform,
        redirect_target: &str,
    ) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_TOKEN_LEN)
            .map(char::from)
            .collect();

        self.pending.insert(
            token.clone(),
            Entry {
                handshake: PendingHandshake {
                    tenant_id,
                    user_id,
                    platform,
                    redirect_target: redirect_target.to_string(),
                },
                issued_at: Instant::now(),
            },
        );

        token
    }

    /// Redeem a state token from the OAuth callback. The token is removed
    /// whether or not it is still valid, so replays always fail.
    pub fn consume(&self, token: &str) -> AppResult<PendingHandshake> {
        let (_, entry) = self
            .pending
            .remove(token)
            .ok_or_else(|| AppError::Unauthorized("Unknown or already used state token".into()))?;

        if entry.issued_at.elapsed() > self.ttl {
            return Err(AppError::Unauthorized("Expired state token".into()));
        }

        Ok(entry.handshake)
    }

    /// Drop expired entries so abandoned flows do not accumulate.
    pub fn prune(&self) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, entry| entry.issued_at.elapsed() <= self.ttl);
        before - self.pending.len()
    }
}

impl Default for HandshakeStore {
    fn default() -> Self {
        Self::new(DEFAULT_HANDSHAKE_TTL)
    }
}
