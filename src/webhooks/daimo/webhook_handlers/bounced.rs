use super::{apply_transition, EventContext, EventOutcome, ProcessError};
use crate::payments::status::PaymentStatus;
use crate::services::notifier::notify_user;
use pnptv_bot::{find_payment_intent_by_payment_id, find_user_by_id};

/// The payment bounced (or a completed payment was reverted by a chain
/// reorg). Membership is never mutated here; the reorg gate re-check reads
/// the status this transition writes.
pub async fn handle_bounced_event(ctx: &EventContext<'_>) -> Result<EventOutcome, ProcessError> {
    let event = ctx.event;

    let intent = find_payment_intent_by_payment_id(ctx.pool, &event.id)?
        .ok_or_else(|| ProcessError::IntentNotFound(event.id.clone()))?;

    apply_transition(ctx.pool, &intent, PaymentStatus::Bounced)?;

    if let Some(user) = find_user_by_id(ctx.pool, intent.user_id)? {
        notify_user(
            ctx.bot,
            user.telegram_chat_id,
            "❌ Your payment could not be completed and has bounced. \
             No charges were applied. Use /plans to try again."
                .to_string(),
        )
        .await;
    }

    Ok(EventOutcome {
        user_id: Some(intent.user_id),
        plan_id: Some(intent.plan_id),
    })
}
