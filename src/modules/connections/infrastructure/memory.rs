/// In-memory connection repository for tests and local development
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::modules::connections::domain::entities::{Connection, ConnectionStatus, NewConnection};
use crate::modules::connections::domain::repository::ConnectionRepository;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemoryConnectionRepository {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl MemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, connection_id: Uuid, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut Connection),
    {
        let mut connections = self.connections.write().unwrap();
        let connection = connections
            .get_mut(&connection_id)
            .ok_or_else(|| AppError::NotFound(format!("Connection {} not found", connection_id)))?;
        f(connection);
        connection.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ConnectionRepository for MemoryConnectionRepository {
    async fn create(&self, connection: NewConnection) -> AppResult<Connection> {
        let now = Utc::now();
        let record = Connection {
            id: Uuid::new_v4(),
            tenant_id: connection.tenant_id,
            user_id: connection.user_id,
            platform: connection.platform,
            external_account_id: connection.external_account_id,
            handle: connection.handle,
            access_token_enc: connection.access_token_enc,
            refresh_token_enc: connection.refresh_token_enc,
            status: ConnectionStatus::Active,
            expires_at: connection.expires_at,
            last_synced_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };

        self.connections
            .write()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, connection_id: Uuid) -> AppResult<Option<Connection>> {
        Ok(self.connections.read().unwrap().get(&connection_id).cloned())
    }

    async fn mark_active(&self, connection_id: Uuid) -> AppResult<()> {
        self.update(connection_id, |c| {
            c.status = ConnectionStatus::Active;
            c.last_error = None;
        })
    }

    async fn record_error(&self, connection_id: Uuid, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(connection_id, move |c| {
            c.status = ConnectionStatus::Error;
            c.last_error = Some(error);
        })
    }

    async fn update_tokens(
        &self,
        connection_id: Uuid,
        access_token_enc: &str,
        refresh_token_enc: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let access = access_token_enc.to_string();
        let refresh = refresh_token_enc.map(str::to_string);
        self.update(connection_id, move |c| {
            c.access_token_enc = access;
            if let Some(refresh) = refresh {
                c.refresh_token_enc = Some(refresh);
            }
            c.expires_at = expires_at;
            c.status = ConnectionStatus::Active;
            c.last_error = None;
        })
    }

    async fn stamp_last_synced(&self, connection_id: Uuid) -> AppResult<()> {
        self.update(connection_id, |c| {
            c.last_synced_at = Some(Utc::now());
        })
    }

    async fn expire_past_due(&self) -> AppResult<usize> {
        let now = Utc::now();
        let mut changed = 0;
        for connection in self.connections.write().unwrap().values_mut() {
            if connection.status == ConnectionStatus::Active
                && connection.expires_at.is_some_and(|at| at <= now)
            {
                connection.status = ConnectionStatus::Expired;
                connection.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn list_expiring_within(&self, lookahead: Duration) -> AppResult<Vec<Connection>> {
        let horizon = Utc::now() + lookahead;
        let mut expiring: Vec<Connection> = self
            .connections
            .read()
            .unwrap()
            .values()
            .filter(|c| {
                c.status == ConnectionStatus::Active
                    && c.refresh_token_enc.is_some()
                    && c.expires_at.is_some_and(|at| at <= horizon)
            })
            .cloned()
            .collect();
        expiring.sort_by_key(|c| c.expires_at);
        Ok(expiring)
    }

    async fn list_sources_due_for_sync(&self, cooldown: Duration) -> AppResult<Vec<Connection>> {
        let cutoff = Utc::now() - cooldown;
        let mut due: Vec<Connection> = self
            .connections
            .read()
            .unwrap()
            .values()
            .filter(|c| {
                c.status == ConnectionStatus::Active
                    && c.platform.is_source()
                    && c.last_synced_at.map_or(true, |at| at <= cutoff)
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.last_synced_at);
        Ok(due)
    }
}
