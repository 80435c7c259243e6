/// In-memory job store for tests and local development
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::modules::jobs::domain::entities::{JobKind, JobRecord, JobStatus, NewJob};
use crate::modules::jobs::domain::repository::{JobStatistics, JobStore};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, job_id: Uuid, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;
        f(job);
        Ok(())
    }

    /// Test helper: shift a job's creation time into the past
    pub fn backdate_created_at(&self, job_id: Uuid, age: Duration) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(&job_id) {
            job.created_at = Utc::now() - age;
        }
    }

    /// Test helper: overwrite the stored kind string, bypassing the enum
    pub fn overwrite_kind(&self, job_id: Uuid, kind: &str) {
        if let Some(job) = self.jobs.write().unwrap().get_mut(&job_id) {
            job.kind = kind.to_string();
        }
    }

    /// Test helper: all jobs of a given kind
    pub fn jobs_of_kind(&self, kind: JobKind) -> Vec<JobRecord> {
        let kind = kind.to_string();
        self.jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| j.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: NewJob) -> AppResult<JobRecord> {
        let record = JobRecord {
            id: Uuid::new_v4(),
            kind: job.kind.to_string(),
            status: JobStatus::Pending,
            priority: job.priority,
            attempts: 0,
            payload: job.payload,
            result: None,
            error: None,
            tenant_id: job.associations.tenant_id,
            user_id: job.associations.user_id,
            rule_id: job.associations.rule_id,
            source_item_id: job.associations.source_item_id,
            source_connection_id: job.associations.source_connection_id,
            destination_connection_id: job.associations.destination_connection_id,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };

        self.jobs
            .write()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        Ok(self.jobs.read().unwrap().get(&job_id).cloned())
    }

    async fn mark_scheduled(&self, job_id: Uuid) -> AppResult<()> {
        self.update(job_id, |job| {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Scheduled;
            }
        })
    }

    async fn mark_running(&self, job_id: Uuid) -> AppResult<()> {
        self.update(job_id, |job| {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(Utc::now());
        })
    }

    async fn mark_succeeded(&self, job_id: Uuid, result: serde_json::Value) -> AppResult<()> {
        self.update(job_id, |job| {
            job.status = JobStatus::Succeeded;
            job.result = Some(result);
            job.error = None;
            job.completed_at = Some(Utc::now());
        })
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(job_id, move |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.completed_at = Some(Utc::now());
        })
    }

    async fn has_active_refresh_for(&self, connection_id: Uuid) -> AppResult<bool> {
        let kind = JobKind::RefreshCredential.to_string();
        Ok(self.jobs.read().unwrap().values().any(|j| {
            j.kind == kind
                && j.source_connection_id == Some(connection_id)
                && !j.status.is_terminal()
        }))
    }

    async fn list_stuck_pending(&self, older_than: Duration) -> AppResult<Vec<JobRecord>> {
        let cutoff = Utc::now() - older_than;
        let mut stuck: Vec<JobRecord> = self
            .jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.created_at < cutoff)
            .cloned()
            .collect();
        stuck.sort_by_key(|j| j.created_at);
        Ok(stuck)
    }

    async fn statistics(&self) -> AppResult<JobStatistics> {
        let jobs = self.jobs.read().unwrap();
        let mut stats = JobStatistics {
            total_count: jobs.len() as i64,
            ..Default::default()
        };

        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending_count += 1,
                JobStatus::Scheduled => stats.scheduled_count += 1,
                JobStatus::Running => stats.running_count += 1,
                JobStatus::Succeeded => stats.succeeded_count += 1,
                JobStatus::Failed => stats.failed_count += 1,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_starts_pending_with_zero_attempts() {
        let store = MemoryJobStore::new();
        let job = store
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.started_at.is_none());
    }

    #[tokio::test]
    async fn mark_running_increments_attempts() {
        let store = MemoryJobStore::new();
        let job = store
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();

        store.mark_running(job.id).await.unwrap();
        store.mark_running(job.id).await.unwrap();

        let job = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(job.attempts, 2);
        assert_eq!(job.status, JobStatus::Running);
    }

    #[tokio::test]
    async fn refresh_dedup_only_counts_active_jobs() {
        let store = MemoryJobStore::new();
        let connection_id = Uuid::new_v4();
        let job = store
            .create(NewJob::refresh_credential(
                connection_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();

        assert!(store.has_active_refresh_for(connection_id).await.unwrap());

        store.mark_running(job.id).await.unwrap();
        assert!(store.has_active_refresh_for(connection_id).await.unwrap());

        store
            .mark_succeeded(job.id, serde_json::json!({}))
            .await
            .unwrap();
        assert!(!store.has_active_refresh_for(connection_id).await.unwrap());
    }

    #[tokio::test]
    async fn statistics_count_per_status() {
        let store = MemoryJobStore::new();
        let a = store
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();
        let b = store
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();
        store
            .mark_succeeded(a.id, serde_json::json!({}))
            .await
            .unwrap();
        store.mark_failed(b.id, "boom").await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.succeeded_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.pending_count, 0);
    }

    #[tokio::test]
    async fn stuck_pending_honors_grace_period() {
        let store = MemoryJobStore::new();
        let job = store
            .create(NewJob::sync_source(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
            ))
            .await
            .unwrap();

        // Fresh pending job is inside the grace period
        assert!(store
            .list_stuck_pending(Duration::minutes(2))
            .await
            .unwrap()
            .is_empty());

        // Backdate it past the grace period
        store
            .jobs
            .write()
            .unwrap()
            .get_mut(&job.id)
            .unwrap()
            .created_at = Utc::now() - Duration::minutes(10);

        let stuck = store.list_stuck_pending(Duration::minutes(2)).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, job.id);
    }
}
