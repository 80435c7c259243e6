/// In-memory dispatch queue for tests and local development
///
/// Mirrors the Postgres implementation's semantics: priority ordering,
/// visibility timeout on claim, exponential backoff on nack and terminal
/// dead-lettering.
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::modules::queue::domain::{DispatchQueue, NackOutcome, QueueConfig, QueueDelivery};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
struct Entry {
    id: Uuid,
    job_id: Uuid,
    priority: i32,
    attempts: i32,
    available_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
    dead_lettered: bool,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryDispatchQueue {
    entries: Mutex<Vec<Entry>>,
    config: QueueConfig,
}

impl MemoryDispatchQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Test helper: dead-lettered entries
    pub fn dead_letters(&self) -> Vec<Uuid> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.dead_lettered)
            .map(|e| e.job_id)
            .collect()
    }

    /// Test helper: make every backoff/visibility delay elapse immediately
    pub fn expire_delays(&self) {
        let now = Utc::now();
        for entry in self.entries.lock().unwrap().iter_mut() {
            if entry.available_at > now {
                entry.available_at = now;
            }
            entry.locked_until = None;
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.dead_lettered)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DispatchQueue for MemoryDispatchQueue {
    async fn push(&self, job_id: Uuid, priority: i32) -> AppResult<()> {
        let now = Utc::now();
        self.entries.lock().unwrap().push(Entry {
            id: Uuid::new_v4(),
            job_id,
            priority,
            attempts: 0,
            available_at: now,
            locked_until: None,
            dead_lettered: false,
            last_error: None,
            created_at: now,
        });
        Ok(())
    }

    async fn pull(&self) -> AppResult<Option<QueueDelivery>> {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();

        let mut candidates: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                !e.dead_lettered
                    && e.available_at <= now
                    && e.locked_until.map_or(true, |until| until <= now)
            })
            .map(|(i, _)| i)
            .collect();

        // Highest priority first, then FIFO
        candidates.sort_by(|&a, &b| {
            entries[b]
                .priority
                .cmp(&entries[a].priority)
                .then(entries[a].created_at.cmp(&entries[b].created_at))
        });

        let Some(&idx) = candidates.first() else {
            return Ok(None);
        };

        let visibility =
            ChronoDuration::from_std(self.config.visibility_timeout).unwrap_or_default();
        let entry = &mut entries[idx];
        entry.attempts += 1;
        entry.locked_until = Some(now + visibility);

        Ok(Some(QueueDelivery {
            entry_id: entry.id,
            job_id: entry.job_id,
            attempt: entry.attempts,
        }))
    }

    async fn ack(&self, delivery: &QueueDelivery) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.id != delivery.entry_id);
        Ok(())
    }

    async fn nack(&self, delivery: &QueueDelivery, error: &str) -> AppResult<NackOutcome> {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.iter_mut().find(|e| e.id == delivery.entry_id) else {
            return Ok(NackOutcome::DeadLettered);
        };

        entry.last_error = Some(error.to_string());
        entry.locked_until = None;

        if entry.attempts >= self.config.max_attempts {
            entry.dead_lettered = true;
            return Ok(NackOutcome::DeadLettered);
        }

        let backoff = self.config.backoff_for(entry.attempts);
        let retry_at = Utc::now() + ChronoDuration::from_std(backoff).unwrap_or_default();
        entry.available_at = retry_at;

        Ok(NackOutcome::Retry(retry_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_queue(max_attempts: i32) -> MemoryDispatchQueue {
        MemoryDispatchQueue::new(QueueConfig {
            max_attempts,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            visibility_timeout: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn delivers_higher_priority_first() {
        let queue = fast_queue(3);
        let low = Uuid::new_v4();
        let high = Uuid::new_v4();

        queue.push(low, 0).await.unwrap();
        queue.push(high, 10).await.unwrap();

        let first = queue.pull().await.unwrap().unwrap();
        assert_eq!(first.job_id, high);
        let second = queue.pull().await.unwrap().unwrap();
        assert_eq!(second.job_id, low);
    }

    #[tokio::test]
    async fn claimed_entry_is_invisible_until_acked() {
        let queue = fast_queue(3);
        queue.push(Uuid::new_v4(), 0).await.unwrap();

        let delivery = queue.pull().await.unwrap().unwrap();
        // Entry is locked; nothing else to pull
        assert!(queue.pull().await.unwrap().is_none());

        queue.ack(&delivery).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn nack_backs_off_then_dead_letters() {
        let queue = fast_queue(2);
        let job_id = Uuid::new_v4();
        queue.push(job_id, 0).await.unwrap();

        let first = queue.pull().await.unwrap().unwrap();
        assert_eq!(first.attempt, 1);
        let outcome = queue.nack(&first, "boom").await.unwrap();
        assert!(matches!(outcome, NackOutcome::Retry(_)));

        // Not yet available: backoff applies
        assert!(queue.pull().await.unwrap().is_none());
        queue.expire_delays();

        let second = queue.pull().await.unwrap().unwrap();
        assert_eq!(second.attempt, 2);
        let outcome = queue.nack(&second, "boom again").await.unwrap();
        assert_eq!(outcome, NackOutcome::DeadLettered);

        assert_eq!(queue.dead_letters(), vec![job_id]);
        assert!(queue.pull().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn at_least_once_redelivery_after_visibility_timeout() {
        let queue = fast_queue(3);
        let job_id = Uuid::new_v4();
        queue.push(job_id, 0).await.unwrap();

        let first = queue.pull().await.unwrap().unwrap();
        assert_eq!(first.job_id, job_id);

        // Simulate a worker crash: no ack, visibility timeout elapses
        queue.expire_delays();

        let second = queue.pull().await.unwrap().unwrap();
        assert_eq!(second.job_id, job_id);
        assert_eq!(second.attempt, 2);
    }
}
