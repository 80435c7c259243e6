/// Destination publisher abstraction and registry
use std::collections::HashMap;
use std::sync::Arc;

use crate::modules::connections::domain::entities::Platform;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

/// Everything a platform publisher needs to post one video
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Plaintext access token for the destination account
    pub access_token: String,
    /// Platform-side account id to publish under
    pub account_id: String,
    /// URL the platform can fetch the staged media from
    pub media_url: String,
    pub caption: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Post the video and return its permalink on the destination.
    async fn publish(&self, request: &PublishRequest) -> AppResult<String>;
}

/// Static lookup from platform to its publisher implementation
#[derive(Default)]
pub struct PublisherRegistry {
    publishers: HashMap<Platform, Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(publisher.platform(), publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> AppResult<Arc<dyn Publisher>> {
        self.publishers.get(&platform).cloned().ok_or_else(|| {
            AppError::InvalidInput(format!("No publisher registered for {}", platform))
        })
    }
}
