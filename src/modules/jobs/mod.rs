pub mod domain;
pub mod infrastructure;
pub mod scheduler;

pub use domain::{JobKind, JobRecord, JobStatistics, JobStatus, JobStore, NewJob};
pub use infrastructure::{JobStoreImpl, MemoryJobStore};
pub use scheduler::JobScheduler;
