pub mod modules;
pub mod schema;
pub mod shared;

use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::modules::connections::refresh::OAuthTokenRefresher;
use crate::modules::connections::ConnectionRepositoryImpl;
use crate::modules::content::{SourceItemRepositoryImpl, TikTokContentClient};
use crate::modules::jobs::{JobScheduler, JobStoreImpl};
use crate::modules::media::{MediaStager, MemoryObjectStorage, ObjectStorage};
use crate::modules::pipeline::PipelineContext;
use crate::modules::publish::{
    InstagramPublisher, PublishAttemptRepositoryImpl, PublisherRegistry, YouTubePublisher,
};
use crate::modules::queue::{DieselDispatchQueue, QueueConfig};
use crate::modules::rules::RuleRepositoryImpl;
use crate::shared::config::PipelineConfig;
use crate::shared::crypto::CredentialVault;
use crate::shared::database::Database;
use crate::shared::errors::{AppError, AppResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply pending migrations at startup.
pub fn run_migrations(db: &Database) -> AppResult<()> {
    let mut conn = db.get_connection()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))?;
    Ok(())
}

/// Wire the production pipeline context from environment configuration.
pub fn build_context(db: &Database, config: PipelineConfig) -> AppResult<Arc<PipelineContext>> {
    let pool = db.pool().clone();

    let jobs = Arc::new(JobStoreImpl::new(pool.clone()));
    let queue = Arc::new(DieselDispatchQueue::new(
        pool.clone(),
        QueueConfig {
            max_attempts: config.queue_max_attempts,
            base_backoff: config.queue_base_backoff,
            max_backoff: config.queue_max_backoff,
            visibility_timeout: config.queue_visibility_timeout,
        },
    ));
    let scheduler = Arc::new(JobScheduler::new(jobs.clone(), queue.clone()));

    // TODO: swap for an S3-backed store once the bucket plumbing lands
    let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryObjectStorage::new());

    let publishers = PublisherRegistry::new()
        .register(Arc::new(InstagramPublisher::new()?))
        .register(Arc::new(YouTubePublisher::new()?));

    Ok(Arc::new(PipelineContext {
        jobs,
        queue,
        scheduler,
        connections: Arc::new(ConnectionRepositoryImpl::new(pool.clone())),
        rules: Arc::new(RuleRepositoryImpl::new(pool.clone())),
        source_items: Arc::new(SourceItemRepositoryImpl::new(pool.clone())),
        attempts: Arc::new(PublishAttemptRepositoryImpl::new(pool)),
        vault: Arc::new(CredentialVault::from_env()?),
        source_client: Arc::new(TikTokContentClient::new()?),
        stager: Arc::new(MediaStager::new(storage.clone())?),
        storage,
        publishers: Arc::new(publishers),
        refresher: Arc::new(OAuthTokenRefresher::from_env()?),
        config,
    }))
}
