/// Value objects for the jobs domain
use serde::{Deserialize, Serialize};

/// Job status enum matching the database type
#[derive(diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[ExistingTypePath = "crate::schema::sql_types::JobStatus"]
#[serde(rename_all = "lowercase")]
pub enum JobStatusDb {
    Pending,
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl From<JobStatusDb> for super::entities::JobStatus {
    fn from(db: JobStatusDb) -> Self {
        match db {
            JobStatusDb::Pending => Self::Pending,
            JobStatusDb::Scheduled => Self::Scheduled,
            JobStatusDb::Running => Self::Running,
            JobStatusDb::Succeeded => Self::Succeeded,
            JobStatusDb::Failed => Self::Failed,
        }
    }
}
