/// Diesel-based implementation of the rule repository
use crate::modules::rules::domain::{
    NewRoutingRule, RoutingRule, RuleRepository, RuleWithDestinations,
};
use crate::schema::{routing_rules, rule_destinations};
use crate::shared::database::DbPool;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = routing_rules)]
struct RoutingRuleModel {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    source_connection_id: Uuid,
    caption_template: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoutingRuleModel {
    fn to_rule(self) -> RoutingRule {
        RoutingRule {
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            source_connection_id: self.source_connection_id,
            caption_template: self.caption_template,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = routing_rules)]
struct NewRuleModel {
    tenant_id: Uuid,
    user_id: Uuid,
    source_connection_id: Uuid,
    caption_template: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = rule_destinations)]
struct NewRuleDestinationModel {
    rule_id: Uuid,
    destination_connection_id: Uuid,
}

pub struct RuleRepositoryImpl {
    pool: DbPool,
}

impl RuleRepositoryImpl {
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

    fn destinations_for(
        conn: &mut diesel::PgConnection,
        rule_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        rule_destinations::table
            .filter(rule_destinations::rule_id.eq(rule_id))
            .select(rule_destinations::destination_connection_id)
            .load(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to load destinations: {}", e)))
    }
}

#[async_trait]
impl RuleRepository for RuleRepositoryImpl {
    async fn create(&self, rule: NewRoutingRule) -> AppResult<RuleWithDestinations> {
        let mut conn = self.get_conn()?;

        let destination_connection_ids = rule.destination_connection_ids.clone();
        let created: RuleWithDestinations = conn
            .transaction(|conn| {
                let inserted: RoutingRuleModel = diesel::insert_into(routing_rules::table)
                    .values(NewRuleModel {
                        tenant_id: rule.tenant_id,
                        user_id: rule.user_id,
                        source_connection_id: rule.source_connection_id,
                        caption_template: rule.caption_template.clone(),
                    })
                    .get_result(conn)?;

                let destinations: Vec<NewRuleDestinationModel> = destination_connection_ids
                    .iter()
                    .map(|&destination_connection_id| NewRuleDestinationModel {
                        rule_id: inserted.id,
                        destination_connection_id,
                    })
                    .collect();
                diesel::insert_into(rule_destinations::table)
                    .values(&destinations)
                    .execute(conn)?;

                Ok::<_, diesel::result::Error>(RuleWithDestinations {
                    rule: inserted.to_rule(),
                    destination_connection_ids,
                })
            })
            .map_err(|e: diesel::result::Error| {
                AppError::DatabaseError(format!("Failed to create rule: {}", e))
            })?;

        Ok(created)
    }

    async fn get(&self, rule_id: Uuid) -> AppResult<Option<RoutingRule>> {
        let mut conn = self.get_conn()?;

        let model: Option<RoutingRuleModel> = routing_rules::table
            .find(rule_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get rule: {}", e)))?;

        Ok(model.map(|m| m.to_rule()))
    }

    async fn get_with_destinations(
        &self,
        rule_id: Uuid,
    ) -> AppResult<Option<RuleWithDestinations>> {
        let mut conn = self.get_conn()?;

        let model: Option<RoutingRuleModel> = routing_rules::table
            .find(rule_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get rule: {}", e)))?;

        let Some(model) = model else {
            return Ok(None);
        };

        let destination_connection_ids = Self::destinations_for(&mut conn, model.id)?;
        Ok(Some(RuleWithDestinations {
            rule: model.to_rule(),
            destination_connection_ids,
        }))
    }

    async fn list_active_for_source(
        &self,
        source_connection_id: Uuid,
    ) -> AppResult<Vec<RoutingRule>> {
        let mut conn = self.get_conn()?;

        let models: Vec<RoutingRuleModel> = routing_rules::table
            .filter(routing_rules::source_connection_id.eq(source_connection_id))
            .filter(routing_rules::active.eq(true))
            .order(routing_rules::created_at.asc())
            .load(&mut conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to list rules: {}", e)))?;

        Ok(models.into_iter().map(|m| m.to_rule()).collect())
    }
}
