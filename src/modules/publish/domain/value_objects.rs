use crate::modules::publish::domain::entities::PublishStatus;
use diesel_derive_enum::DbEnum;

/// Database mapping for the publish_status Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::PublishStatus"]
pub enum PublishStatusDb {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl From<PublishStatusDb> for PublishStatus {
    fn from(value: PublishStatusDb) -> Self {
        match value {
            PublishStatusDb::Pending => PublishStatus::Pending,
            PublishStatusDb::InProgress => PublishStatus::InProgress,
            PublishStatusDb::Succeeded => PublishStatus::Succeeded,
            PublishStatusDb::Failed => PublishStatus::Failed,
        }
    }
}
