use crate::modules::connections::domain::entities::ConnectionStatus;
use diesel_derive_enum::DbEnum;

/// Database mapping for the connection_status Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, DbEnum)]
#[ExistingTypePath = "crate::schema::sql_types::ConnectionStatus"]
pub enum ConnectionStatusDb {
    Active,
    Expired,
    Error,
    Revoked,
}

impl From<ConnectionStatusDb> for ConnectionStatus {
    fn from(value: ConnectionStatusDb) -> Self {
        match value {
            ConnectionStatusDb::Active => ConnectionStatus::Active,
            ConnectionStatusDb::Expired => ConnectionStatus::Expired,
            ConnectionStatusDb::Error => ConnectionStatus::Error,
            ConnectionStatusDb::Revoked => ConnectionStatus::Revoked,
        }
    }
}

impl From<ConnectionStatus> for ConnectionStatusDb {
    fn from(value: ConnectionStatus) -> Self {
        match value {
            ConnectionStatus::Active => ConnectionStatusDb::Active,
            ConnectionStatus::Expired => ConnectionStatusDb::Expired,
            ConnectionStatus::Error => ConnectionStatusDb::Error,
            ConnectionStatus::Revoked => ConnectionStatusDb::Revoked,
        }
    }
}
