/// Pipeline worker loop
///
/// Each worker pulls job ids off the dispatch queue, loads the durable
/// row, runs the matching handler and settles both the row and the queue
/// entry. Redeliveries of already-succeeded jobs are acknowledged without
/// re-running; fatal errors fail the job without another delivery.
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::modules::jobs::domain::entities::JobKind;
use crate::modules::jobs::domain::JobStatus;
use crate::modules::pipeline::context::PipelineContext;
use crate::modules::pipeline::handlers;
use crate::modules::queue::{NackOutcome, QueueDelivery};
use crate::shared::errors::{AppError, AppResult};
use crate::{log_error, log_info, log_warn};

/// Errors that no amount of redelivery will fix
fn is_fatal(error: &AppError) -> bool {
    matches!(
        error,
        AppError::NotFound(_) | AppError::InvalidInput(_) | AppError::CryptoError(_)
    )
}

pub struct PipelineWorker {
    ctx: Arc<PipelineContext>,
    is_running: Arc<RwLock<bool>>,
}

impl PipelineWorker {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            ctx,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run until stopped, sleeping between polls when the queue is idle.
    pub async fn run(&self) {
        {
            let mut running = self.is_running.write().await;
            if *running {
                log_warn!("Pipeline worker already running");
                return;
            }
            *running = true;
        }

        log_info!("Pipeline worker started");

        while *self.is_running.read().await {
            match self.process_next().await {
                Ok(true) => {}
                Ok(false) => sleep(self.ctx.config.poll_interval).await,
                Err(e) => {
                    log_error!("Worker iteration failed: {}", e);
                    sleep(self.ctx.config.poll_interval).await;
                }
            }
        }

        log_info!("Pipeline worker stopped");
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// Process one queue entry. Returns false when the queue was idle.
    pub async fn process_next(&self) -> AppResult<bool> {
        let Some(delivery) = self.ctx.queue.pull().await? else {
            return Ok(false);
        };

        let Some(job) = self.ctx.jobs.get(delivery.job_id).await? else {
            // Row is gone; nothing to run, drop the entry
            log_warn!("Queue entry for missing job {}", delivery.job_id);
            self.ctx.queue.ack(&delivery).await?;
            return Ok(true);
        };

        // At-least-once delivery: a succeeded job coming around again is
        // acknowledged, never re-run
        if job.status == JobStatus::Succeeded {
            self.ctx.queue.ack(&delivery).await?;
            return Ok(true);
        }

        let kind = match job.parse_kind() {
            Ok(kind) => kind,
            Err(e) => {
                // Unknown kind cannot succeed on any retry
                self.ctx.jobs.mark_failed(job.id, &e).await?;
                self.ctx.queue.ack(&delivery).await?;
                log_error!("Job {} has unparseable kind: {}", job.id, e);
                return Ok(true);
            }
        };

        self.ctx.jobs.mark_running(job.id).await?;

        let outcome = self.dispatch(kind, &job).await;
        self.settle(&delivery, job.id, outcome).await?;
        Ok(true)
    }

    async fn dispatch(
        &self,
        kind: JobKind,
        job: &crate::modules::jobs::domain::JobRecord,
    ) -> AppResult<serde_json::Value> {
        match kind {
            JobKind::SyncSource => {
                let payload = job.parse_payload().map_err(|e| {
                    AppError::InvalidInput(format!("Bad sync_source payload: {}", e))
                })?;
                handlers::sync_source::handle(&self.ctx, payload).await
            }
            JobKind::PrepareMedia => {
                let payload = job.parse_payload().map_err(|e| {
                    AppError::InvalidInput(format!("Bad prepare_media payload: {}", e))
                })?;
                handlers::prepare_media::handle(&self.ctx, payload).await
            }
            JobKind::PublishDestination => {
                let payload = job.parse_payload().map_err(|e| {
                    AppError::InvalidInput(format!("Bad publish_destination payload: {}", e))
                })?;
                handlers::publish_destination::handle(&self.ctx, payload).await
            }
            JobKind::RefreshCredential => {
                let payload = job.parse_payload().map_err(|e| {
                    AppError::InvalidInput(format!("Bad refresh_credential payload: {}", e))
                })?;
                handlers::refresh_credential::handle(&self.ctx, payload).await
            }
        }
    }

    async fn settle(
        &self,
        delivery: &QueueDelivery,
        job_id: uuid::Uuid,
        outcome: AppResult<serde_json::Value>,
    ) -> AppResult<()> {
        match outcome {
            Ok(result) => {
                self.ctx.jobs.mark_succeeded(job_id, result).await?;
                self.ctx.queue.ack(delivery).await?;
            }
            Err(e) if is_fatal(&e) => {
                self.ctx.jobs.mark_failed(job_id, &e.to_string()).await?;
                self.ctx.queue.ack(delivery).await?;
                log_error!("Job {} failed fatally: {}", job_id, e);
            }
            Err(e) => {
                self.ctx.jobs.mark_failed(job_id, &e.to_string()).await?;
                match self.ctx.queue.nack(delivery, &e.to_string()).await? {
                    NackOutcome::Retry(at) => {
                        log_warn!("Job {} failed, retry at {}: {}", job_id, at, e);
                    }
                    NackOutcome::DeadLettered => {
                        log_error!("Job {} dead-lettered after retries: {}", job_id, e);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use mockall::predicate;
    use serde_json::json;
    use uuid::Uuid;

    use crate::modules::connections::domain::{
        ConnectionRepository, ConnectionStatus, NewConnection, Platform,
    };
    use crate::modules::connections::refresh::{MockTokenRefresher, RefreshedCredential};
    use crate::modules::connections::MemoryConnectionRepository;
    use crate::modules::content::client::{ItemPage, MockContentSourceClient, SourceItem};
    use crate::modules::content::domain::SourceItemRepository;
    use crate::modules::content::MemorySourceItemRepository;
    use crate::modules::jobs::domain::entities::NewJob;
    use crate::modules::jobs::domain::JobStore;
    use crate::modules::jobs::scheduler::JobScheduler;
    use crate::modules::jobs::MemoryJobStore;
    use crate::modules::media::storage::ObjectStorage;
    use crate::modules::media::{MediaStager, MemoryObjectStorage};
    use crate::modules::publish::domain::PublishAttemptRepository;
    use crate::modules::publish::publisher::{MockPublisher, PublisherRegistry};
    use crate::modules::publish::{MemoryPublishAttemptRepository, PublishStatus};
    use crate::modules::queue::{DispatchQueue, MemoryDispatchQueue, QueueConfig};
    use crate::modules::rules::domain::{NewRoutingRule, RuleRepository};
    use crate::modules::rules::MemoryRuleRepository;
    use crate::shared::config::PipelineConfig;
    use crate::shared::crypto::CredentialVault;

    const VAULT_KEY: [u8; 32] = [7u8; 32];

    struct TestHarness {
        ctx: Arc<PipelineContext>,
        jobs: Arc<MemoryJobStore>,
        queue: Arc<MemoryDispatchQueue>,
        connections: Arc<MemoryConnectionRepository>,
        rules: Arc<MemoryRuleRepository>,
        source_items: Arc<MemorySourceItemRepository>,
        attempts: Arc<MemoryPublishAttemptRepository>,
        storage: Arc<MemoryObjectStorage>,
        vault: CredentialVault,
    }

    fn harness(
        source_client: MockContentSourceClient,
        publishers: PublisherRegistry,
        refresher: MockTokenRefresher,
    ) -> TestHarness {
        let jobs = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryDispatchQueue::new(QueueConfig {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            visibility_timeout: Duration::from_secs(60),
        }));
        let scheduler = Arc::new(JobScheduler::new(jobs.clone(), queue.clone()));
        let connections = Arc::new(MemoryConnectionRepository::new());
        let rules = Arc::new(MemoryRuleRepository::new());
        let source_items = Arc::new(MemorySourceItemRepository::new());
        let attempts = Arc::new(MemoryPublishAttemptRepository::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        let stager = Arc::new(MediaStager::new(storage.clone()).unwrap());

        let ctx = Arc::new(PipelineContext {
            jobs: jobs.clone(),
            queue: queue.clone(),
            scheduler,
            connections: connections.clone(),
            rules: rules.clone(),
            source_items: source_items.clone(),
            attempts: attempts.clone(),
            vault: Arc::new(CredentialVault::new(&VAULT_KEY).unwrap()),
            source_client: Arc::new(source_client),
            stager,
            storage: storage.clone(),
            publishers: Arc::new(publishers),
            refresher: Arc::new(refresher),
            config: PipelineConfig::default(),
        });

        TestHarness {
            ctx,
            jobs,
            queue,
            connections,
            rules,
            source_items,
            attempts,
            storage,
            vault: CredentialVault::new(&VAULT_KEY).unwrap(),
        }
    }

    async fn seed_connection(h: &TestHarness, platform: Platform) -> Uuid {
        let connection = h
            .connections
            .create(NewConnection {
                tenant_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                platform,
                external_account_id: "acct-1".to_string(),
                handle: "@creator".to_string(),
                access_token_enc: h.vault.encrypt("access-token").unwrap(),
                refresh_token_enc: Some(h.vault.encrypt("refresh-token").unwrap()),
                expires_at: Some(Utc::now() + chrono::Duration::hours(2)),
            })
            .await
            .unwrap();
        connection.id
    }

    fn source_item(external_id: &str) -> SourceItem {
        SourceItem {
            external_id: external_id.to_string(),
            caption: Some("A clip".to_string()),
            media_url: format!("https://cdn.example.com/{}.mp4", external_id),
            posted_at: Some(Utc::now()),
        }
    }

    /// Drain the queue one entry at a time until idle.
    async fn drain(worker: &PipelineWorker, queue: &MemoryDispatchQueue) {
        loop {
            queue.expire_delays();
            if !worker.process_next().await.unwrap() {
                break;
            }
        }
    }

    #[tokio::test]
    async fn idle_queue_reports_no_work() {
        let h = harness(
            MockContentSourceClient::new(),
            PublisherRegistry::new(),
            MockTokenRefresher::new(),
        );
        let worker = PipelineWorker::new(h.ctx.clone());
        assert!(!worker.process_next().await.unwrap());
    }

    #[tokio::test]
    async fn sync_discovers_items_and_schedules_prepare_jobs() {
        let mut client = MockContentSourceClient::new();
        client.expect_fetch_recent_items().returning(|_, _, _| {
            Ok(ItemPage {
                items: vec![source_item("vid-1"), source_item("vid-2")],
                next_cursor: None,
            })
        });

        let h = harness(client, PublisherRegistry::new(), MockTokenRefresher::new());
        let connection_id = seed_connection(&h, Platform::TikTok).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();

        h.rules
            .create(NewRoutingRule {
                tenant_id: connection.tenant_id,
                user_id: connection.user_id,
                source_connection_id: connection_id,
                caption_template: None,
                destination_connection_ids: vec![],
            })
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        h.ctx
            .scheduler
            .schedule(NewJob::sync_source(
                connection_id,
                connection.tenant_id,
                connection.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        assert_eq!(h.source_items.count(), 2);
        let prepare_jobs = h.jobs.jobs_of_kind(JobKind::PrepareMedia);
        assert_eq!(prepare_jobs.len(), 2);

        let sync_jobs = h.jobs.jobs_of_kind(JobKind::SyncSource);
        assert_eq!(sync_jobs[0].status, JobStatus::Succeeded);

        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        assert!(connection.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn second_sync_of_same_items_creates_nothing_new() {
        let mut client = MockContentSourceClient::new();
        client.expect_fetch_recent_items().returning(|_, _, _| {
            Ok(ItemPage {
                items: vec![source_item("vid-1")],
                next_cursor: None,
            })
        });

        let h = harness(client, PublisherRegistry::new(), MockTokenRefresher::new());
        let connection_id = seed_connection(&h, Platform::TikTok).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();

        h.rules
            .create(NewRoutingRule {
                tenant_id: connection.tenant_id,
                user_id: connection.user_id,
                source_connection_id: connection_id,
                caption_template: None,
                destination_connection_ids: vec![],
            })
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        for _ in 0..2 {
            h.ctx
                .scheduler
                .schedule(NewJob::sync_source(
                    connection_id,
                    connection.tenant_id,
                    connection.user_id,
                ))
                .await
                .unwrap();
            assert!(worker.process_next().await.unwrap());
        }

        assert_eq!(h.source_items.count(), 1);
        assert_eq!(h.jobs.jobs_of_kind(JobKind::PrepareMedia).len(), 1);
    }

    #[tokio::test]
    async fn unparseable_kind_fails_without_retry() {
        let h = harness(
            MockContentSourceClient::new(),
            PublisherRegistry::new(),
            MockTokenRefresher::new(),
        );

        // Simulate a row written by a newer deploy with a kind this
        // binary does not know
        let job = h
            .jobs
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();
        h.jobs.overwrite_kind(job.id, "transcode_video");
        h.queue.push(job.id, 0).await.unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        assert!(worker.process_next().await.unwrap());

        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        // No attempts were consumed running a handler
        assert_eq!(job.attempts, 0);
        // Entry was acked, not retried
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn succeeded_job_redelivery_is_acked_without_rerun() {
        let mut client = MockContentSourceClient::new();
        // The handler must run exactly once
        client
            .expect_fetch_recent_items()
            .times(1)
            .returning(|_, _, _| Ok(ItemPage::default()));

        let h = harness(client, PublisherRegistry::new(), MockTokenRefresher::new());
        let connection_id = seed_connection(&h, Platform::TikTok).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        h.rules
            .create(NewRoutingRule {
                tenant_id: connection.tenant_id,
                user_id: connection.user_id,
                source_connection_id: connection_id,
                caption_template: None,
                destination_connection_ids: vec![],
            })
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        let job = h
            .ctx
            .scheduler
            .schedule(NewJob::sync_source(
                connection_id,
                connection.tenant_id,
                connection.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());
        assert_eq!(
            h.jobs.get(job.id).await.unwrap().unwrap().status,
            JobStatus::Succeeded
        );

        // Duplicate delivery of the same job id
        h.queue.push(job.id, 0).await.unwrap();
        assert!(worker.process_next().await.unwrap());

        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn publish_success_records_url_and_attempt() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_platform()
            .return_const(Platform::Instagram);
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Ok("https://www.instagram.com/reel/abc".to_string()));
        let registry = PublisherRegistry::new().register(Arc::new(publisher));

        let h = harness(MockContentSourceClient::new(), registry, MockTokenRefresher::new());
        let source_id = seed_connection(&h, Platform::TikTok).await;
        let destination_id = seed_connection(&h, Platform::Instagram).await;
        let source = h.connections.get(source_id).await.unwrap().unwrap();

        let rule = h
            .rules
            .create(NewRoutingRule {
                tenant_id: source.tenant_id,
                user_id: source.user_id,
                source_connection_id: source_id,
                caption_template: Some("{caption} #repost".to_string()),
                destination_connection_ids: vec![destination_id],
            })
            .await
            .unwrap();

        let item = h
            .source_items
            .insert(crate::modules::content::domain::NewSourceItem {
                rule_id: rule.rule.id,
                external_id: "vid-1".to_string(),
                caption: Some("A clip".to_string()),
                media_url: "https://cdn.example.com/vid-1.mp4".to_string(),
                posted_at: None,
            })
            .await
            .unwrap()
            .created()
            .cloned()
            .unwrap();

        // Media already staged
        h.storage
            .put("media/staged.mp4", vec![1, 2, 3], "video/mp4")
            .await
            .unwrap();
        h.source_items
            .set_staged(item.id, "media/staged.mp4", "hash")
            .await
            .unwrap();

        let attempt = h
            .attempts
            .upsert_pending(item.id, destination_id)
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        h.ctx
            .scheduler
            .schedule(NewJob::publish_destination(
                attempt.id,
                item.id,
                rule.rule.id,
                destination_id,
                source.tenant_id,
                source.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        let attempt = h.attempts.get(attempt.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, PublishStatus::Succeeded);
        assert_eq!(
            attempt.repost_url.as_deref(),
            Some("https://www.instagram.com/reel/abc")
        );
        assert_eq!(attempt.attempt_count, 1);
    }

    #[tokio::test]
    async fn publisher_auth_failure_flags_connection_and_retries() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_platform()
            .return_const(Platform::Instagram);
        publisher.expect_publish().returning(|_| {
            Err(AppError::Unauthorized("token revoked".to_string()))
        });
        let registry = PublisherRegistry::new().register(Arc::new(publisher));

        let h = harness(MockContentSourceClient::new(), registry, MockTokenRefresher::new());
        let source_id = seed_connection(&h, Platform::TikTok).await;
        let destination_id = seed_connection(&h, Platform::Instagram).await;
        let source = h.connections.get(source_id).await.unwrap().unwrap();

        let rule = h
            .rules
            .create(NewRoutingRule {
                tenant_id: source.tenant_id,
                user_id: source.user_id,
                source_connection_id: source_id,
                caption_template: None,
                destination_connection_ids: vec![destination_id],
            })
            .await
            .unwrap();

        let item = h
            .source_items
            .insert(crate::modules::content::domain::NewSourceItem {
                rule_id: rule.rule.id,
                external_id: "vid-1".to_string(),
                caption: None,
                media_url: "https://cdn.example.com/vid-1.mp4".to_string(),
                posted_at: None,
            })
            .await
            .unwrap()
            .created()
            .cloned()
            .unwrap();
        h.storage
            .put("media/staged.mp4", vec![1], "video/mp4")
            .await
            .unwrap();
        h.source_items
            .set_staged(item.id, "media/staged.mp4", "hash")
            .await
            .unwrap();

        let attempt = h
            .attempts
            .upsert_pending(item.id, destination_id)
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        let job = h
            .ctx
            .scheduler
            .schedule(NewJob::publish_destination(
                attempt.id,
                item.id,
                rule.rule.id,
                destination_id,
                source.tenant_id,
                source.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        let attempt = h.attempts.get(attempt.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, PublishStatus::Failed);
        assert!(attempt.error.as_deref().unwrap().contains("token revoked"));

        let destination = h.connections.get(destination_id).await.unwrap().unwrap();
        assert_eq!(destination.status, ConnectionStatus::Error);

        // Auth failures are not fatal job errors; the entry stays queued
        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(h.queue.len(), 1);
    }

    #[tokio::test]
    async fn refresh_rotates_and_stores_encrypted_tokens() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .with(predicate::eq(Platform::TikTok), predicate::eq("refresh-token"))
            .times(1)
            .returning(|_, _| {
                Ok(RefreshedCredential {
                    access_token: "new-access".to_string(),
                    refresh_token: Some("new-refresh".to_string()),
                    expires_at: Some(Utc::now() + chrono::Duration::hours(24)),
                })
            });

        let h = harness(
            MockContentSourceClient::new(),
            PublisherRegistry::new(),
            refresher,
        );
        let connection_id = seed_connection(&h, Platform::TikTok).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        let old_access_enc = connection.access_token_enc.clone();

        let worker = PipelineWorker::new(h.ctx.clone());
        h.ctx
            .scheduler
            .schedule(NewJob::refresh_credential(
                connection_id,
                connection.tenant_id,
                connection.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        assert_ne!(connection.access_token_enc, old_access_enc);
        assert_eq!(
            h.vault.decrypt(&connection.access_token_enc).unwrap(),
            "new-access"
        );
        assert_eq!(
            h.vault
                .decrypt(connection.refresh_token_enc.as_deref().unwrap())
                .unwrap(),
            "new-refresh"
        );
        assert_eq!(connection.status, ConnectionStatus::Active);
    }

    #[tokio::test]
    async fn refresh_on_unsupported_platform_succeeds_as_noop() {
        let h = harness(
            MockContentSourceClient::new(),
            PublisherRegistry::new(),
            MockTokenRefresher::new(),
        );
        let connection_id = seed_connection(&h, Platform::Instagram).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        let before_enc = connection.access_token_enc.clone();

        let worker = PipelineWorker::new(h.ctx.clone());
        let job = h
            .ctx
            .scheduler
            .schedule(NewJob::refresh_credential(
                connection_id,
                connection.tenant_id,
                connection.user_id,
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.result.unwrap()["supported"], json!(false));

        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        assert_eq!(connection.access_token_enc, before_enc);
    }

    #[tokio::test]
    async fn missing_records_fail_fatally() {
        let h = harness(
            MockContentSourceClient::new(),
            PublisherRegistry::new(),
            MockTokenRefresher::new(),
        );

        let worker = PipelineWorker::new(h.ctx.clone());
        let job = h
            .ctx
            .scheduler
            .schedule(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());

        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        // Fatal: the queue entry was acked, not retried
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn retryable_failure_dead_letters_after_budget() {
        let mut client = MockContentSourceClient::new();
        client.expect_fetch_recent_items().returning(|_, _, _| {
            Err(AppError::ExternalServiceError("upstream down".to_string()))
        });

        let h = harness(client, PublisherRegistry::new(), MockTokenRefresher::new());
        let connection_id = seed_connection(&h, Platform::TikTok).await;
        let connection = h.connections.get(connection_id).await.unwrap().unwrap();
        h.rules
            .create(NewRoutingRule {
                tenant_id: connection.tenant_id,
                user_id: connection.user_id,
                source_connection_id: connection_id,
                caption_template: None,
                destination_connection_ids: vec![],
            })
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        let job = h
            .ctx
            .scheduler
            .schedule(NewJob::sync_source(
                connection_id,
                connection.tenant_id,
                connection.user_id,
            ))
            .await
            .unwrap();

        drain(&worker, &h.queue).await;

        let job = h.jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        // Three deliveries, then parked
        assert_eq!(job.attempts, 3);
        assert_eq!(h.queue.dead_letters(), vec![job.id]);
    }

    #[tokio::test]
    async fn full_pipeline_fans_out_one_item_to_two_destinations() {
        let mut client = MockContentSourceClient::new();
        client
            .expect_fetch_recent_items()
            .times(1)
            .returning(|_, _, _| {
                Ok(ItemPage {
                    items: vec![source_item("vid-1")],
                    next_cursor: None,
                })
            });

        let mut instagram = MockPublisher::new();
        instagram
            .expect_platform()
            .return_const(Platform::Instagram);
        instagram
            .expect_publish()
            .times(1)
            .returning(|_| Ok("https://www.instagram.com/reel/ig1".to_string()));

        let mut youtube = MockPublisher::new();
        youtube.expect_platform().return_const(Platform::YouTube);
        youtube
            .expect_publish()
            .times(1)
            .returning(|_| Ok("https://www.youtube.com/shorts/yt1".to_string()));

        let registry = PublisherRegistry::new()
            .register(Arc::new(instagram))
            .register(Arc::new(youtube));

        let h = harness(client, registry, MockTokenRefresher::new());
        let source_id = seed_connection(&h, Platform::TikTok).await;
        let ig_id = seed_connection(&h, Platform::Instagram).await;
        let yt_id = seed_connection(&h, Platform::YouTube).await;
        let source = h.connections.get(source_id).await.unwrap().unwrap();

        h.rules
            .create(NewRoutingRule {
                tenant_id: source.tenant_id,
                user_id: source.user_id,
                source_connection_id: source_id,
                caption_template: Some("{caption} #crosspost".to_string()),
                destination_connection_ids: vec![ig_id, yt_id],
            })
            .await
            .unwrap();

        let worker = PipelineWorker::new(h.ctx.clone());
        h.ctx
            .scheduler
            .schedule(NewJob::sync_source(
                source_id,
                source.tenant_id,
                source.user_id,
            ))
            .await
            .unwrap();

        // sync -> prepare would download media over HTTP; short-circuit by
        // running sync, staging by hand, then draining the remaining jobs
        assert!(worker.process_next().await.unwrap());

        let prepare_jobs = h.jobs.jobs_of_kind(JobKind::PrepareMedia);
        assert_eq!(prepare_jobs.len(), 1);
        let item_id = prepare_jobs[0].source_item_id.unwrap();

        h.storage
            .put("media/staged.mp4", vec![1, 2, 3], "video/mp4")
            .await
            .unwrap();
        h.source_items
            .set_staged(item_id, "media/staged.mp4", "hash")
            .await
            .unwrap();

        drain(&worker, &h.queue).await;

        let attempts = h.attempts.list_for_item(item_id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts
            .iter()
            .all(|a| a.status == PublishStatus::Succeeded));

        let publish_jobs = h.jobs.jobs_of_kind(JobKind::PublishDestination);
        assert_eq!(publish_jobs.len(), 2);
        assert!(publish_jobs
            .iter()
            .all(|j| j.status == JobStatus::Succeeded));
    }
}
