/// sync_source handler: poll one source account and register new items
use serde_json::json;

use crate::log_info;
use crate::modules::jobs::domain::entities::{NewJob, SyncSourcePayload};
use crate::modules::pipeline::context::PipelineContext;
use crate::shared::errors::{AppError, AppResult};

const SYNC_PAGE_SIZE: u32 = 20;

pub async fn handle(
    ctx: &PipelineContext,
    payload: SyncSourcePayload,
) -> AppResult<serde_json::Value> {
    let connection = ctx
        .connections
        .get(payload.connection_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Connection {} not found", payload.connection_id))
        })?;

    let rules = ctx
        .rules
        .list_active_for_source(connection.id)
        .await?;

    // No active rules means nothing to discover for; still stamp the sync
    // so the sweep does not keep re-picking this account
    if rules.is_empty() {
        ctx.connections.stamp_last_synced(connection.id).await?;
        return Ok(json!({
            "rules": 0,
            "items_listed": 0,
            "items_new": 0,
        }));
    }

    let access_token = ctx.vault.decrypt(&connection.access_token_enc)?;

    let page = match ctx
        .source_client
        .fetch_recent_items(&access_token, None, SYNC_PAGE_SIZE)
        .await
    {
        Ok(page) => page,
        Err(AppError::Unauthorized(msg)) => {
            ctx.connections.record_error(connection.id, &msg).await?;
            return Err(AppError::Unauthorized(msg));
        }
        Err(e) => return Err(e),
    };

    let items_listed = page.items.len();
    let mut items_new = 0;

    for rule in &rules {
        for item in &page.items {
            let outcome = ctx
                .source_items
                .insert(crate::modules::content::domain::NewSourceItem {
                    rule_id: rule.id,
                    external_id: item.external_id.clone(),
                    caption: item.caption.clone(),
                    media_url: item.media_url.clone(),
                    posted_at: item.posted_at,
                })
                .await?;

            // Duplicates are the common case on every re-sync; only new
            // rows get a prepare job
            if let Some(record) = outcome.created() {
                items_new += 1;
                ctx.scheduler
                    .schedule(NewJob::prepare_media(
                        record.id,
                        rule.id,
                        rule.tenant_id,
                        rule.user_id,
                        connection.id,
                    ))
                    .await?;
            }
        }
    }

    ctx.connections.stamp_last_synced(connection.id).await?;
    // A successful sync clears a stale error state; revoked or expired
    // connections stay down until re-auth or refresh
    if connection.status == crate::modules::connections::domain::ConnectionStatus::Error {
        ctx.connections.mark_active(connection.id).await?;
    }

    log_info!(
        "Synced {} ({}): {} listed, {} new across {} rules",
        connection.handle,
        connection.id,
        items_listed,
        items_new,
        rules.len()
    );

    Ok(json!({
        "rules": rules.len(),
        "items_listed": items_listed,
        "items_new": items_new,
    }))
}
