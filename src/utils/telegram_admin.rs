use std::env;
use teloxide::prelude::*;
use teloxide::{Bot, RequestError};

/// Operational breadcrumbs (new checkouts, activations) for the admin chat.
/// Gated by ADMIN_LOGS and the ADMIN_LOG_LEVEL threshold; anything above the
/// threshold only lands in the logs.
pub async fn send_message_to_admin(
    bot: &Bot,
    message: String,
    level: u8,
) -> Result<(), RequestError> {
    if env::var("ADMIN_LOGS").unwrap_or_default() != "ACTIVE" {
        return Ok(());
    }

    let admin_chat_id: i64 = match env::var("TELEGRAM_ADMIN_CHAT_ID")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        Some(id) => id,
        None => {
            tracing::warn!("TELEGRAM_ADMIN_CHAT_ID not set or invalid, skipping admin message");
            return Ok(());
        }
    };

    let threshold: u8 = env::var("ADMIN_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);

    if level > threshold {
        tracing::debug!("Admin message below threshold ({} > {}): {}", level, threshold, message);
        return Ok(());
    }

    bot.send_message(ChatId(admin_chat_id), message).await?;

    Ok(())
}
