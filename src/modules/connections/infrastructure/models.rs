/// Diesel models for the connections table
use crate::modules::connections::domain::entities::{Connection, NewConnection};
use crate::modules::connections::domain::value_objects::ConnectionStatusDb;
use crate::schema::connections;
use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Insertable, Debug)]
#[diesel(table_name = connections)]
pub struct NewConnectionModel {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub external_account_id: String,
    pub handle: String,
    pub access_token_enc: String,
    pub refresh_token_enc: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<NewConnection> for NewConnectionModel {
    fn from(value: NewConnection) -> Self {
        Self {
            tenant_id: value.tenant_id,
            user_id: value.user_id,
            platform: value.platform.to_string(),
            external_account_id: value.external_account_id,
            handle: value.handle,
            access_token_enc: value.access_token_enc,
            refresh_token_enc: value.refresh_token_enc,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = connections)]
pub struct ConnectionModel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub external_account_id: String,
    pub handle: String,
    pub access_token_enc: String,
    pub refresh_token_enc: Option<String>,
    pub status: ConnectionStatusDb,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionModel {
    /// Convert to the domain connection. Fails if the stored platform
    /// string is not one we recognize.
    pub fn to_connection(self) -> AppResult<Connection> {
        let platform = self
            .platform
            .parse()
            .map_err(|e: String| AppError::InternalError(e))?;

        Ok(Connection {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            platform,
            external_account_id: self.external_account_id,
            handle: self.handle,
            access_token_enc: self.access_token_enc,
            refresh_token_enc: self.refresh_token_enc,
            status: self.status.into(),
            expires_at: self.expires_at,
            last_synced_at: self.last_synced_at,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
