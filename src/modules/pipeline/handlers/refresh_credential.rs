/// refresh_credential handler: rotate an expiring token
use serde_json::json;

use crate::log_info;
use crate::modules::jobs::domain::entities::RefreshCredentialPayload;
use crate::modules::pipeline::context::PipelineContext;
use crate::shared::errors::{AppError, AppResult};

pub async fn handle(
    ctx: &PipelineContext,
    payload: RefreshCredentialPayload,
) -> AppResult<serde_json::Value> {
    let connection = ctx
        .connections
        .get(payload.connection_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Connection {} not found", payload.connection_id))
        })?;

    if !connection.platform.supports_refresh() {
        return Ok(json!({
            "supported": false,
            "platform": connection.platform.to_string(),
        }));
    }

    let refresh_token_enc = connection.refresh_token_enc.as_deref().ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Connection {} has no refresh token on record",
            connection.id
        ))
    })?;

    let refresh_token = ctx.vault.decrypt(refresh_token_enc)?;

    let refreshed = match ctx
        .refresher
        .refresh(connection.platform, &refresh_token)
        .await
    {
        Ok(refreshed) => refreshed,
        Err(AppError::Unauthorized(msg)) => {
            // The refresh token itself is dead; the user must reconnect
            ctx.connections.record_error(connection.id, &msg).await?;
            return Err(AppError::Unauthorized(msg));
        }
        Err(e) => return Err(e),
    };

    let access_token_enc = ctx.vault.encrypt(&refreshed.access_token)?;
    let new_refresh_enc = refreshed
        .refresh_token
        .as_deref()
        .map(|t| ctx.vault.encrypt(t))
        .transpose()?;

    ctx.connections
        .update_tokens(
            connection.id,
            &access_token_enc,
            new_refresh_enc.as_deref(),
            refreshed.expires_at,
        )
        .await?;

    log_info!(
        "Refreshed credentials for {} ({}), new expiry {:?}",
        connection.handle,
        connection.platform,
        refreshed.expires_at
    );

    Ok(json!({
        "supported": true,
        "rotated_refresh_token": refreshed.refresh_token.is_some(),
        "expires_at": refreshed.expires_at,
    }))
}
