/// Diesel-based implementation of the source item repository
///
/// Dedup relies on the UNIQUE (rule_id, external_id) constraint plus
/// ON CONFLICT DO NOTHING, so concurrent syncs of the same account never
/// double-insert.
use crate::modules::content::domain::{
    InsertOutcome, NewSourceItem, SourceItemRecord, SourceItemRepository,
};
use crate::schema::source_items;
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Insertable, Debug)]
#[diesel(table_name = source_items)]
struct NewSourceItemModel {
    rule_id: Uuid,
    external_id: String,
    caption: Option<String>,
    media_url: String,
    posted_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = source_items)]
struct SourceItemModel {
    id: Uuid,
    rule_id: Uuid,
    external_id: String,
    caption: Option<String>,
    media_url: String,
    posted_at: Option<DateTime<Utc>>,
    storage_key: Option<String>,
    content_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl SourceItemModel {
    fn to_record(self) -> SourceItemRecord {
        SourceItemRecord {
            id: self.id,
            rule_id: self.rule_id,
            external_id: self.external_id,
            caption: self.caption,
            media_url: self.media_url,
            posted_at: self.posted_at,
            storage_key: self.storage_key,
            content_hash: self.content_hash,
            created_at: self.created_at,
        }
    }
}

pub struct SourceItemRepositoryImpl {
    pool: DbPool,
}

impl SourceItemRepositoryImpl {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_conn(
        &self,
    ) -> AppResult<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>,
    > {
        self.pool
            .get()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get connection: {}", e)))
    }
}

#[async_trait]
impl SourceItemRepository for SourceItemRepositoryImpl {
    async fn insert(&self, item: NewSourceItem) -> AppResult<InsertOutcome> {
        let mut conn = self.get_conn()?;

        let inserted: Option<SourceItemModel> = diesel::insert_into(source_items::table)
            .values(NewSourceItemModel {
                rule_id: item.rule_id,
                external_id: item.external_id,
                caption: item.caption,
                media_url: item.media_url,
                posted_at: item.posted_at,
            })
            .on_conflict_do_nothing()
            .get_result(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert source item: {}", e)))?;

        Ok(match inserted {
            Some(model) => InsertOutcome::Created(model.to_record()),
            None => InsertOutcome::Duplicate,
        })
    }

    async fn get(&self, item_id: Uuid) -> AppResult<Option<SourceItemRecord>> {
        let mut conn = self.get_conn()?;

        let model: Option<SourceItemModel> = source_items::table
            .find(item_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get source item: {}", e)))?;

        Ok(model.map(|m| m.to_record()))
    }

    async fn set_staged(
        &self,
        item_id: Uuid,
        storage_key: &str,
        content_hash: &str,
    ) -> AppResult<()> {
        let mut conn = self.get_conn()?;

        diesel::update(source_items::table.find(item_id))
            .set((
                source_items::storage_key.eq(storage_key),
                source_items::content_hash.eq(content_hash),
            ))
            .execute(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to mark item staged: {}", e)))?;

        Ok(())
    }
}
