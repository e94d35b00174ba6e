use crate::observability::METRICS;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

/// Best-effort user notification. Delivery failure (blocked bot, deleted
/// account) is logged and counted, never propagated: a successful payment
/// must not be rolled back because a message could not be delivered.
pub async fn notify_user(bot: &Bot, chat_id: i64, message: String) {
    match bot
        .send_message(ChatId(chat_id), &message)
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => {
            METRICS.increment_notifications_sent();
        }
        Err(e) => {
            METRICS.increment_notification_failures();
            tracing::warn!("Failed to notify chat {}: {}", chat_id, e);
        }
    }
}
