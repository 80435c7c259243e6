/// Shared dependencies handed to workers, handlers and sweeps
use std::sync::Arc;

use crate::modules::connections::domain::ConnectionRepository;
use crate::modules::connections::refresh::TokenRefresher;
use crate::modules::content::client::ContentSourceClient;
use crate::modules::content::domain::SourceItemRepository;
use crate::modules::jobs::domain::JobStore;
use crate::modules::jobs::scheduler::JobScheduler;
use crate::modules::media::stager::MediaStager;
use crate::modules::media::storage::ObjectStorage;
use crate::modules::publish::domain::PublishAttemptRepository;
use crate::modules::publish::publisher::PublisherRegistry;
use crate::modules::queue::DispatchQueue;
use crate::modules::rules::domain::RuleRepository;
use crate::shared::config::PipelineConfig;
use crate::shared::crypto::CredentialVault;

pub struct PipelineContext {
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<dyn DispatchQueue>,
    pub scheduler: Arc<JobScheduler>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub rules: Arc<dyn RuleRepository>,
    pub source_items: Arc<dyn SourceItemRepository>,
    pub attempts: Arc<dyn PublishAttemptRepository>,
    pub vault: Arc<CredentialVault>,
    pub source_client: Arc<dyn ContentSourceClient>,
    pub stager: Arc<MediaStager>,
    pub storage: Arc<dyn ObjectStorage>,
    pub publishers: Arc<PublisherRegistry>,
    pub refresher: Arc<dyn TokenRefresher>,
    pub config: PipelineConfig,
}
