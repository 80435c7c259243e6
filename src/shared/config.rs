use std::env;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

/// Runtime configuration for the pipeline, read from environment variables.
/// Every knob has a default so a bare `.env` with DATABASE_URL and the vault
/// key is enough to start a worker.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of parallel worker loops
    pub worker_count: usize,
    /// How long an idle worker sleeps between queue polls
    pub poll_interval: Duration,

    /// Queue retry budget per entry before dead-lettering
    pub queue_max_attempts: i32,
    /// Base delay for the queue's exponential backoff
    pub queue_base_backoff: Duration,
    /// Cap on the queue backoff
    pub queue_max_backoff: Duration,
    /// How long a claimed entry stays invisible before redelivery
    pub queue_visibility_timeout: Duration,

    /// Cadence of the connection expiry status-correction sweep
    pub expiry_sweep_interval: Duration,
    /// Cadence of the credential refresh sweep
    pub refresh_sweep_interval: Duration,
    /// Connections expiring inside this window get a refresh job
    pub refresh_lookahead: ChronoDuration,

    /// Cadence of the source sync sweep
    pub sync_sweep_interval: Duration,
    /// Accounts synced within this window are skipped by the sync sweep
    pub sync_cooldown: ChronoDuration,

    /// Cadence of the pending-job reconciliation sweep
    pub reconcile_interval: Duration,
    /// Jobs stuck in pending longer than this are re-enqueued
    pub reconcile_grace: ChronoDuration,
    /// Jobs stuck in pending longer than this are failed outright
    pub reconcile_deadline: ChronoDuration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            poll_interval: Duration::from_secs(5),
            queue_max_attempts: 5,
            queue_base_backoff: Duration::from_secs(30),
            queue_max_backoff: Duration::from_secs(15 * 60),
            queue_visibility_timeout: Duration::from_secs(10 * 60),
            expiry_sweep_interval: Duration::from_secs(10 * 60),
            refresh_sweep_interval: Duration::from_secs(15 * 60),
            refresh_lookahead: ChronoDuration::hours(24),
            sync_sweep_interval: Duration::from_secs(5 * 60),
            sync_cooldown: ChronoDuration::minutes(30),
            reconcile_interval: Duration::from_secs(5 * 60),
            reconcile_grace: ChronoDuration::minutes(2),
            reconcile_deadline: ChronoDuration::hours(24),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            worker_count: env_usize("PIPELINE_WORKER_COUNT", defaults.worker_count),
            poll_interval: env_secs("PIPELINE_POLL_INTERVAL_SECS", defaults.poll_interval),
            queue_max_attempts: env_i32("QUEUE_MAX_ATTEMPTS", defaults.queue_max_attempts),
            queue_base_backoff: env_secs("QUEUE_BASE_BACKOFF_SECS", defaults.queue_base_backoff),
            queue_max_backoff: env_secs("QUEUE_MAX_BACKOFF_SECS", defaults.queue_max_backoff),
            queue_visibility_timeout: env_secs(
                "QUEUE_VISIBILITY_TIMEOUT_SECS",
                defaults.queue_visibility_timeout,
            ),
            expiry_sweep_interval: env_secs(
                "EXPIRY_SWEEP_INTERVAL_SECS",
                defaults.expiry_sweep_interval,
            ),
            refresh_sweep_interval: env_secs(
                "REFRESH_SWEEP_INTERVAL_SECS",
                defaults.refresh_sweep_interval,
            ),
            refresh_lookahead: env_hours("REFRESH_LOOKAHEAD_HOURS", defaults.refresh_lookahead),
            sync_sweep_interval: env_secs(
                "SYNC_SWEEP_INTERVAL_SECS",
                defaults.sync_sweep_interval,
            ),
            sync_cooldown: env_minutes("SYNC_COOLDOWN_MINUTES", defaults.sync_cooldown),
            reconcile_interval: env_secs(
                "RECONCILE_SWEEP_INTERVAL_SECS",
                defaults.reconcile_interval,
            ),
            reconcile_grace: env_minutes("RECONCILE_GRACE_MINUTES", defaults.reconcile_grace),
            reconcile_deadline: env_hours("RECONCILE_DEADLINE_HOURS", defaults.reconcile_deadline),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_minutes(name: &str, default: ChronoDuration) -> ChronoDuration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(ChronoDuration::minutes)
        .unwrap_or(default)
}

fn env_hours(name: &str, default: ChronoDuration) -> ChronoDuration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(ChronoDuration::hours)
        .unwrap_or(default)
}
