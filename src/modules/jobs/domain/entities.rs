/// Domain entities for the pipeline job system
///
/// A job is one unit of pipeline work: syncing a source account, staging
/// media, publishing to one destination, or refreshing a credential. Jobs
/// are durable rows; the dispatch queue only carries their ids.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Elevated priority for credential refresh jobs so they run ahead of
/// routine sync/publish work.
pub const PRIORITY_REFRESH: i32 = 10;
pub const PRIORITY_PUBLISH: i32 = 5;
pub const PRIORITY_PREPARE: i32 = 5;
pub const PRIORITY_SYNC: i32 = 0;

/// Closed set of job kinds; the orchestrator matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    SyncSource,
    PrepareMedia,
    PublishDestination,
    RefreshCredential,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::SyncSource => write!(f, "sync_source"),
            JobKind::PrepareMedia => write!(f, "prepare_media"),
            JobKind::PublishDestination => write!(f, "publish_destination"),
            JobKind::RefreshCredential => write!(f, "refresh_credential"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync_source" => Ok(JobKind::SyncSource),
            "prepare_media" => Ok(JobKind::PrepareMedia),
            "publish_destination" => Ok(JobKind::PublishDestination),
            "refresh_credential" => Ok(JobKind::RefreshCredential),
            _ => Err(format!("Invalid job kind: {}", s)),
        }
    }
}

/// Job status lifecycle: pending -> scheduled -> running -> succeeded | failed.
/// A job never leaves `succeeded`; `failed` may run again only through the
/// queue's own redelivery of the same entry, never by application resurrection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Scheduled => write!(f, "scheduled"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "scheduled" => Ok(JobStatus::Scheduled),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Payload for sync_source jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSourcePayload {
    pub connection_id: Uuid,
}

/// Payload for prepare_media jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareMediaPayload {
    pub source_item_id: Uuid,
    pub rule_id: Uuid,
}

/// Payload for publish_destination jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDestinationPayload {
    pub attempt_id: Uuid,
}

/// Payload for refresh_credential jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshCredentialPayload {
    pub connection_id: Uuid,
}

/// Nullable foreign associations stamped onto a job row for operator
/// queries; which ones are set depends on the kind.
#[derive(Debug, Clone, Default)]
pub struct JobAssociations {
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub rule_id: Option<Uuid>,
    pub source_item_id: Option<Uuid>,
    pub source_connection_id: Option<Uuid>,
    pub destination_connection_id: Option<Uuid>,
}

/// New job to be scheduled (before insertion into the store)
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub associations: JobAssociations,
}

impl NewJob {
    pub fn sync_source(connection_id: Uuid, tenant_id: Uuid, user_id: Uuid) -> Self {
        let payload = SyncSourcePayload { connection_id };
        Self {
            kind: JobKind::SyncSource,
            payload: serde_json::to_value(payload).unwrap_or_default(),
            priority: PRIORITY_SYNC,
            associations: JobAssociations {
                tenant_id: Some(tenant_id),
                user_id: Some(user_id),
                source_connection_id: Some(connection_id),
                ..Default::default()
            },
        }
    }

    pub fn prepare_media(
        source_item_id: Uuid,
        rule_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
        source_connection_id: Uuid,
    ) -> Self {
        let payload = PrepareMediaPayload {
            source_item_id,
            rule_id,
        };
        Self {
            kind: JobKind::PrepareMedia,
            payload: serde_json::to_value(payload).unwrap_or_default(),
            priority: PRIORITY_PREPARE,
            associations: JobAssociations {
                tenant_id: Some(tenant_id),
                user_id: Some(user_id),
                rule_id: Some(rule_id),
                source_item_id: Some(source_item_id),
                source_connection_id: Some(source_connection_id),
                ..Default::default()
            },
        }
    }

    pub fn publish_destination(
        attempt_id: Uuid,
        source_item_id: Uuid,
        rule_id: Uuid,
        destination_connection_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Self {
        let payload = PublishDestinationPayload { attempt_id };
        Self {
            kind: JobKind::PublishDestination,
            payload: serde_json::to_value(payload).unwrap_or_default(),
            priority: PRIORITY_PUBLISH,
            associations: JobAssociations {
                tenant_id: Some(tenant_id),
                user_id: Some(user_id),
                rule_id: Some(rule_id),
                source_item_id: Some(source_item_id),
                destination_connection_id: Some(destination_connection_id),
                ..Default::default()
            },
        }
    }

    pub fn refresh_credential(connection_id: Uuid, tenant_id: Uuid, user_id: Uuid) -> Self {
        let payload = RefreshCredentialPayload { connection_id };
        Self {
            kind: JobKind::RefreshCredential,
            payload: serde_json::to_value(payload).unwrap_or_default(),
            priority: PRIORITY_REFRESH,
            associations: JobAssociations {
                tenant_id: Some(tenant_id),
                user_id: Some(user_id),
                source_connection_id: Some(connection_id),
                ..Default::default()
            },
        }
    }
}

/// Job row loaded from the store (with lifecycle metadata)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: String,
    pub status: JobStatus,
    pub priority: i32,
    pub attempts: i32,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub rule_id: Option<Uuid>,
    pub source_item_id: Option<Uuid>,
    pub source_connection_id: Option<Uuid>,
    pub destination_connection_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn parse_kind(&self) -> Result<JobKind, String> {
        self.kind.parse()
    }

    pub fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
