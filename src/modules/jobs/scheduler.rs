/// Job scheduling: durable row first, queue entry second
///
/// Scheduling is deliberately not atomic across the store and the queue.
/// The job row is created `pending`, then pushed onto the queue, then
/// flipped to `scheduled`. A crash between the first two steps strands a
/// pending row; the reconciliation sweep re-enqueues those after a grace
/// period, so every created job eventually reaches a worker.
use std::sync::Arc;

use crate::modules::jobs::domain::{JobRecord, JobStore, NewJob};
use crate::modules::queue::DispatchQueue;
use crate::log_debug;
use crate::shared::errors::AppResult;

pub struct JobScheduler {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn DispatchQueue>,
}

impl JobScheduler {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn DispatchQueue>) -> Self {
        Self { store, queue }
    }

    /// Create a job and hand it to the dispatch queue.
    pub async fn schedule(&self, job: NewJob) -> AppResult<JobRecord> {
        let priority = job.priority;
        let record = self.store.create(job).await?;

        self.queue.push(record.id, priority).await?;
        self.store.mark_scheduled(record.id).await?;

        log_debug!("Scheduled {} job {}", record.kind, record.id);
        Ok(record)
    }

    /// Re-enqueue an existing job row without creating a new one.
    /// Used by the reconciliation sweep for stranded pending jobs.
    pub async fn reschedule(&self, job: &JobRecord) -> AppResult<()> {
        self.queue.push(job.id, job.priority).await?;
        self.store.mark_scheduled(job.id).await?;
        Ok(())
    }
}
