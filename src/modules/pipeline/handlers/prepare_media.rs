/// prepare_media handler: stage the item's media and fan out publish jobs
///
/// Safe to re-run: staging is skipped once the item carries a storage key,
/// attempt rows are upserted against their unique pair, and destinations
/// whose attempt already succeeded are not re-scheduled.
use serde_json::json;

use crate::log_info;
use crate::modules::jobs::domain::entities::{NewJob, PrepareMediaPayload};
use crate::modules::pipeline::context::PipelineContext;
use crate::modules::publish::domain::PublishStatus;
use crate::shared::errors::{AppError, AppResult};

pub async fn handle(
    ctx: &PipelineContext,
    payload: PrepareMediaPayload,
) -> AppResult<serde_json::Value> {
    let item = ctx
        .source_items
        .get(payload.source_item_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Source item {} not found", payload.source_item_id))
        })?;

    let rule = ctx
        .rules
        .get_with_destinations(payload.rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rule {} not found", payload.rule_id)))?;

    // A staged item whose object vanished from storage gets re-staged
    let staged_object_present = match item.storage_key.as_deref() {
        Some(key) => ctx.storage.exists(key).await?,
        None => false,
    };

    let uploaded = if staged_object_present {
        false
    } else {
        let source_connection = ctx
            .connections
            .get(rule.rule.source_connection_id)
            .await?;
        let access_token = source_connection
            .map(|c| ctx.vault.decrypt(&c.access_token_enc))
            .transpose()?;

        let staged = ctx
            .stager
            .stage(
                rule.rule.id,
                item.id,
                &item.media_url,
                access_token.as_deref(),
            )
            .await?;

        ctx.source_items
            .set_staged(item.id, &staged.storage_key, &staged.content_hash)
            .await?;
        true
    };

    let mut destinations_scheduled = 0;
    for destination_connection_id in &rule.destination_connection_ids {
        let attempt = ctx
            .attempts
            .upsert_pending(item.id, *destination_connection_id)
            .await?;

        if attempt.status == PublishStatus::Succeeded {
            continue;
        }

        ctx.scheduler
            .schedule(NewJob::publish_destination(
                attempt.id,
                item.id,
                rule.rule.id,
                *destination_connection_id,
                rule.rule.tenant_id,
                rule.rule.user_id,
            ))
            .await?;
        destinations_scheduled += 1;
    }

    log_info!(
        "Prepared item {} (uploaded: {}, destinations scheduled: {})",
        item.id,
        uploaded,
        destinations_scheduled
    );

    Ok(json!({
        "uploaded": uploaded,
        "destinations_scheduled": destinations_scheduled,
    }))
}
