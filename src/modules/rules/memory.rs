/// In-memory rule repository for tests and local development
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::modules::rules::domain::{
    NewRoutingRule, RoutingRule, RuleRepository, RuleWithDestinations,
};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct MemoryRuleRepository {
    rules: RwLock<HashMap<Uuid, RuleWithDestinations>>,
}

impl MemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
    async fn create(&self, rule: NewRoutingRule) -> AppResult<RuleWithDestinations> {
        let now = Utc::now();
        let created = RuleWithDestinations {
            rule: RoutingRule {
                id: Uuid::new_v4(),
                tenant_id: rule.tenant_id,
                user_id: rule.user_id,
                source_connection_id: rule.source_connection_id,
                caption_template: rule.caption_template,
                active: true,
                created_at: now,
                updated_at: now,
            },
            destination_connection_ids: rule.destination_connection_ids,
        };

        self.rules
            .write()
            .unwrap()
            .insert(created.rule.id, created.clone());
        Ok(created)
    }

    async fn get(&self, rule_id: Uuid) -> AppResult<Option<RoutingRule>> {
        Ok(self
            .rules
            .read()
            .unwrap()
            .get(&rule_id)
            .map(|r| r.rule.clone()))
    }

    async fn get_with_destinations(
        &self,
        rule_id: Uuid,
    ) -> AppResult<Option<RuleWithDestinations>> {
        Ok(self.rules.read().unwrap().get(&rule_id).cloned())
    }

    async fn list_active_for_source(
        &self,
        source_connection_id: Uuid,
    ) -> AppResult<Vec<RoutingRule>> {
        let mut rules: Vec<RoutingRule> = self
            .rules
            .read()
            .unwrap()
            .values()
            .filter(|r| r.rule.source_connection_id == source_connection_id && r.rule.active)
            .map(|r| r.rule.clone())
            .collect();
        rules.sort_by_key(|r| r.created_at);
        Ok(rules)
    }
}
