/// publish_destination handler: post one staged item to one destination
use std::time::Duration;

use serde_json::json;

use crate::log_info;
use crate::modules::jobs::domain::entities::PublishDestinationPayload;
use crate::modules::pipeline::context::PipelineContext;
use crate::modules::publish::domain::PublishStatus;
use crate::modules::publish::publisher::PublishRequest;
use crate::shared::errors::{AppError, AppResult};

/// Lifetime of the storage read handle passed to the destination platform
const READ_HANDLE_TTL: Duration = Duration::from_secs(60 * 60);

pub async fn handle(
    ctx: &PipelineContext,
    payload: PublishDestinationPayload,
) -> AppResult<serde_json::Value> {
    let attempt = ctx.attempts.get(payload.attempt_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Publish attempt {} not found", payload.attempt_id))
    })?;

    // Redelivered job for a destination that already went out
    if attempt.status == PublishStatus::Succeeded {
        return Ok(json!({
            "skipped": true,
            "repost_url": attempt.repost_url,
        }));
    }

    let item = ctx
        .source_items
        .get(attempt.source_item_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Source item {} not found", attempt.source_item_id))
        })?;

    let storage_key = item.storage_key.as_deref().ok_or_else(|| {
        AppError::InvalidInput(format!("Source item {} has no staged media", item.id))
    })?;

    let connection = ctx
        .connections
        .get(attempt.destination_connection_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Destination connection {} not found",
                attempt.destination_connection_id
            ))
        })?;

    let rule = ctx
        .rules
        .get(item.rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rule {} not found", item.rule_id)))?;

    let attempt = ctx.attempts.mark_in_progress(attempt.id).await?;

    let publish_result = async {
        let access_token = ctx.vault.decrypt(&connection.access_token_enc)?;
        let media_url = ctx.storage.read_handle(storage_key, READ_HANDLE_TTL).await?;
        let caption = rule.render_caption(item.caption.as_deref());

        let publisher = ctx.publishers.get(connection.platform)?;
        publisher
            .publish(&PublishRequest {
                access_token,
                account_id: connection.external_account_id.clone(),
                media_url,
                caption,
            })
            .await
    }
    .await;

    match publish_result {
        Ok(repost_url) => {
            ctx.attempts.mark_succeeded(attempt.id, &repost_url).await?;

            log_info!(
                "Published item {} to {} ({}): {}",
                item.id,
                connection.handle,
                connection.platform,
                repost_url
            );

            Ok(json!({
                "repost_url": repost_url,
                "attempt_count": attempt.attempt_count,
            }))
        }
        Err(e) => {
            ctx.attempts.mark_failed(attempt.id, &e.to_string()).await?;

            // A rejected credential poisons every future attempt on this
            // destination; flag the connection for re-auth
            if matches!(e, AppError::Unauthorized(_)) {
                ctx.connections
                    .record_error(connection.id, &e.to_string())
                    .await?;
            }

            Err(e)
        }
    }
}
