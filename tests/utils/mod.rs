/// Shared helpers for integration tests: in-memory service wiring plus
/// stub platform clients with scriptable behavior.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crosspost::modules::connections::domain::{
    ConnectionRepository, NewConnection, Platform,
};
use crosspost::modules::connections::refresh::{RefreshedCredential, TokenRefresher};
use crosspost::modules::connections::MemoryConnectionRepository;
use crosspost::modules::content::client::{ContentSourceClient, ItemPage, SourceItem};
use crosspost::modules::content::MemorySourceItemRepository;
use crosspost::modules::jobs::{JobScheduler, MemoryJobStore};
use crosspost::modules::media::{MediaStager, MemoryObjectStorage};
use crosspost::modules::pipeline::{PipelineContext, PipelineWorker, SweepScheduler};
use crosspost::modules::publish::publisher::{PublishRequest, Publisher, PublisherRegistry};
use crosspost::modules::publish::MemoryPublishAttemptRepository;
use crosspost::modules::queue::{MemoryDispatchQueue, QueueConfig};
use crosspost::modules::rules::MemoryRuleRepository;
use crosspost::shared::config::PipelineConfig;
use crosspost::shared::crypto::CredentialVault;
use crosspost::shared::errors::{AppError, AppResult};

pub const VAULT_KEY: [u8; 32] = [42u8; 32];

/// Content client that serves a fixed list of items on every sync
pub struct StubContentClient {
    items: Mutex<Vec<SourceItem>>,
    pub calls: AtomicUsize,
}

impl StubContentClient {
    pub fn with_items(items: Vec<SourceItem>) -> Self {
        Self {
            items: Mutex::new(items),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_items(Vec::new())
    }
}

#[async_trait]
impl ContentSourceClient for StubContentClient {
    async fn fetch_recent_items(
        &self,
        _access_token: &str,
        _cursor: Option<String>,
        _page_size: u32,
    ) -> AppResult<ItemPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ItemPage {
            items: self.items.lock().unwrap().clone(),
            next_cursor: None,
        })
    }
}

/// Publisher that records every request and answers with a canned outcome
pub struct StubPublisher {
    platform: Platform,
    fail_unauthorized: bool,
    pub requests: Mutex<Vec<PublishRequest>>,
}

impl StubPublisher {
    pub fn succeeding(platform: Platform) -> Self {
        Self {
            platform,
            fail_unauthorized: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_credentials(platform: Platform) -> Self {
        Self {
            platform,
            fail_unauthorized: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for StubPublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(&self, request: &PublishRequest) -> AppResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_unauthorized {
            return Err(AppError::Unauthorized("credentials rejected".to_string()));
        }
        Ok(format!("https://{}.example/post/{}", self.platform, self.publish_count()))
    }
}

/// Refresher that hands out a fixed rotated credential
pub struct StubRefresher {
    pub calls: AtomicUsize,
}

impl StubRefresher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenRefresher for StubRefresher {
    async fn refresh(
        &self,
        _platform: Platform,
        _refresh_token: &str,
    ) -> AppResult<RefreshedCredential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RefreshedCredential {
            access_token: "rotated-access".to_string(),
            refresh_token: Some("rotated-refresh".to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(72)),
        })
    }
}

pub struct TestServices {
    pub ctx: Arc<PipelineContext>,
    pub jobs: Arc<MemoryJobStore>,
    pub queue: Arc<MemoryDispatchQueue>,
    pub connections: Arc<MemoryConnectionRepository>,
    pub rules: Arc<MemoryRuleRepository>,
    pub source_items: Arc<MemorySourceItemRepository>,
    pub attempts: Arc<MemoryPublishAttemptRepository>,
    pub storage: Arc<MemoryObjectStorage>,
    pub vault: CredentialVault,
    pub worker: PipelineWorker,
}

pub fn build_test_services(
    source_client: Arc<dyn ContentSourceClient>,
    publishers: PublisherRegistry,
    refresher: Arc<dyn TokenRefresher>,
) -> TestServices {
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

    let ctx = Arc::new(PipelineContext {
        jobs: jobs.clone(),
        queue: queue.clone(),
        scheduler,
        connections: connections.clone(),
        rules: rules.clone(),
        source_items: source_items.clone(),
        attempts: attempts.clone(),
        vault: Arc::new(CredentialVault::new(&VAULT_KEY).unwrap()),
        source_client,
        stager: Arc::new(MediaStager::new(storage.clone()).unwrap()),
        storage: storage.clone(),
        publishers: Arc::new(publishers),
        refresher,
        config: PipelineConfig::default(),
    });

    let worker = PipelineWorker::new(ctx.clone());

    TestServices {
        ctx,
        jobs,
        queue,
        connections,
        rules,
        source_items,
        attempts,
        storage,
        vault: CredentialVault::new(&VAULT_KEY).unwrap(),
        worker,
    }
}

impl TestServices {
    pub fn sweeps(&self) -> SweepScheduler {
        SweepScheduler::new(self.ctx.clone(), CancellationToken::new())
    }

    pub async fn seed_connection(&self, platform: Platform) -> Uuid {
        self.connections
            .create(NewConnection {
                tenant_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                platform,
                external_account_id: format!("{}-acct", platform),
                handle: format!("@{}", platform),
                access_token_enc: self.vault.encrypt("access-token").unwrap(),
                refresh_token_enc: Some(self.vault.encrypt("refresh-token").unwrap()),
                expires_at: Some(Utc::now() + chrono::Duration::hours(2)),
            })
            .await
            .unwrap()
            .id
    }

    /// Process queue entries until the queue drains, collapsing backoff
    /// delays so retries run immediately.
    pub async fn drain_queue(&self) {
        loop {
            self.queue.expire_delays();
            if !self.worker.process_next().await.unwrap() {
                break;
            }
        }
    }
}

pub fn clip(external_id: &str) -> SourceItem {
    SourceItem {
        external_id: external_id.to_string(),
        caption: Some(format!("Clip {}", external_id)),
        media_url: format!("https://cdn.example.com/{}.mp4", external_id),
        posted_at: Some(Utc::now()),
    }
}
