/// Dispatch queue abstraction
///
/// The queue carries job ids (never payloads) from producers to workers
/// with at-least-once delivery. Claimed entries become invisible for a
/// visibility timeout; a worker crash mid-handler makes the entry
/// re-claimable afterwards, which is safe because handlers are idempotent.
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// A claimed queue entry handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDelivery {
    pub entry_id: Uuid,
    pub job_id: Uuid,
    /// Delivery attempt number for this entry (1-indexed after first claim)
    pub attempt: i32,
}

/// What the queue decided after a negative acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NackOutcome {
    /// Entry will be redelivered at the given time
    Retry(DateTime<Utc>),
    /// Retry budget exhausted; entry is parked terminally
    DeadLettered,
}

/// Retry/backoff policy for queue entries
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delivery attempts before dead-lettering
    pub max_attempts: i32,
    /// Base delay for exponential backoff
    pub base_backoff: Duration,
    /// Cap on the computed backoff
    pub max_backoff: Duration,
    /// How long a claim stays invisible before redelivery
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(15 * 60),
            visibility_timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl QueueConfig {
    /// Exponential backoff for a given attempt (1-indexed), capped.
    pub fn backoff_for(&self, attempt: i32) -> Duration {
        let exp = 2_f64.powi((attempt - 1).max(0));
        let delay = self.base_backoff.as_secs_f64() * exp;
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// Enqueue a job id; higher priority entries are delivered first
    async fn push(&self, job_id: Uuid, priority: i32) -> AppResult<()>;

    /// Claim the next available entry, or None when the queue is idle
    async fn pull(&self) -> AppResult<Option<QueueDelivery>>;

    /// Positive acknowledgement: the entry is done and removed
    async fn ack(&self, delivery: &QueueDelivery) -> AppResult<()>;

    /// Negative acknowledgement: schedule a retry with backoff or
    /// dead-letter once the attempt budget is spent
    async fn nack(&self, delivery: &QueueDelivery, error: &str) -> AppResult<NackOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let config = QueueConfig {
            max_attempts: 5,
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(120),
            visibility_timeout: Duration::from_secs(600),
        };

        assert_eq!(config.backoff_for(1), Duration::from_secs(30));
        assert_eq!(config.backoff_for(2), Duration::from_secs(60));
        assert_eq!(config.backoff_for(3), Duration::from_secs(120));
        // Capped from here on
        assert_eq!(config.backoff_for(4), Duration::from_secs(120));
    }
}
