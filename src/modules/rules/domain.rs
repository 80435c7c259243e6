/// Routing rules: one source account fanned out to destination accounts
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub source_connection_id: Uuid,
    /// Caption template; `{caption}` expands to the source item caption
    pub caption_template: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRoutingRule {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub source_connection_id: Uuid,
    pub caption_template: Option<String>,
    pub destination_connection_ids: Vec<Uuid>,
}

/// A rule together with its destination connection ids
#[derive(Debug, Clone)]
pub struct RuleWithDestinations {
    pub rule: RoutingRule,
    pub destination_connection_ids: Vec<Uuid>,
}

impl RoutingRule {
    /// Render the final caption for a source item. An empty template
    /// falls through to the raw caption.
    pub fn render_caption(&self, item_caption: Option<&str>) -> String {
        let caption = item_caption.unwrap_or_default();
        match self.caption_template.as_deref() {
            Some(template) if !template.is_empty() => template.replace("{caption}", caption),
            _ => caption.to_string(),
        }
    }
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn create(&self, rule: NewRoutingRule) -> AppResult<RuleWithDestinations>;

    async fn get(&self, rule_id: Uuid) -> AppResult<Option<RoutingRule>>;

    async fn get_with_destinations(&self, rule_id: Uuid)
        -> AppResult<Option<RuleWithDestinations>>;

    /// Active rules reading from the given source connection
    async fn list_active_for_source(&self, source_connection_id: Uuid)
        -> AppResult<Vec<RoutingRule>>;
}
