/// Object storage abstraction for staged media
use std::time::Duration;

use dashmap::DashMap;

use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under a key, overwriting any previous object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// A URL the destination platform can fetch the object from for the
    /// given lifetime.
    async fn read_handle(&self, key: &str, ttl: Duration) -> AppResult<String>;
}

/// In-memory object storage for tests and local development
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_size(&self, key: &str) -> Option<usize> {
        self.objects.get(key).map(|bytes| bytes.len())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> AppResult<()> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn read_handle(&self, key: &str, _ttl: Duration) -> AppResult<String> {
        if !self.objects.contains_key(key) {
            return Err(AppError::NotFound(format!("No object at key {}", key)));
        }
        Ok(format!("memory://{}", key))
    }
}
