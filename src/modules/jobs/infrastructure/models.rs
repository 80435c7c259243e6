/// Diesel models for the pipeline_jobs table
use crate::modules::jobs::domain::value_objects::JobStatusDb;
use crate::schema::pipeline_jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Diesel model for inserting new jobs
#[derive(Insertable, Debug)]
#[diesel(table_name = pipeline_jobs)]
pub struct NewJobModel {
    pub kind: String,
    pub payload: JsonValue,
    pub priority: i32,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub rule_id: Option<Uuid>,
    pub source_item_id: Option<Uuid>,
    pub source_connection_id: Option<Uuid>,
    pub destination_connection_id: Option<Uuid>,
}

/// Diesel model for querying existing jobs
#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = pipeline_jobs)]
pub struct PipelineJobModel {
    pub id: Uuid,
    pub kind: String,
    pub status: JobStatusDb,
    pub priority: i32,
    pub attempts: i32,
    pub payload: JsonValue,
    pub result: Option<JsonValue>,
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

impl PipelineJobModel {
    /// Convert to domain JobRecord
    pub fn to_job_record(self) -> crate::modules::jobs::domain::entities::JobRecord {
        crate::modules::jobs::domain::entities::JobRecord {
            id: self.id,
            kind: self.kind,
            status: self.status.into(),
            priority: self.priority,
            attempts: self.attempts,
            payload: self.payload,
            result: self.result,
            error: self.error,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            rule_id: self.rule_id,
            source_item_id: self.source_item_id,
            source_connection_id: self.source_connection_id,
            destination_connection_id: self.destination_connection_id,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
