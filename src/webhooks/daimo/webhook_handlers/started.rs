use super::{apply_transition, EventContext, EventOutcome, ProcessError};
use crate::payments::status::PaymentStatus;
use crate::services::membership::short_tx_hash;
use crate::services::notifier::notify_user;
use pnptv_bot::{find_payment_intent_by_payment_id, find_user_by_id, update_payment_intent_onchain, OnchainDetails};

/// A transaction was seen on-chain but is not confirmed yet. Records the
/// on-chain details and tells the user; membership stays untouched.
pub async fn handle_started_event(ctx: &EventContext<'_>) -> Result<EventOutcome, ProcessError> {
    let event = ctx.event;

    let intent = find_payment_intent_by_payment_id(ctx.pool, &event.id)?
        .ok_or_else(|| ProcessError::IntentNotFound(event.id.clone()))?;

    // Keep previously recorded values when this event omits them.
    update_payment_intent_onchain(
        ctx.pool,
        &event.id,
        OnchainDetails {
            tx_hash: event.tx_hash().or(intent.tx_hash.as_deref()),
            chain_id: event.chain_id().or(intent.chain_id),
            token_symbol: event.token_symbol().or(intent.token_symbol.as_deref()),
            destination_address: event
                .destination_address()
                .or(intent.destination_address.as_deref()),
        },
    )?;

    apply_transition(ctx.pool, &intent, PaymentStatus::Started)?;

    match find_user_by_id(ctx.pool, intent.user_id)? {
        Some(user) => {
            let message = match event.tx_hash() {
                Some(hash) => format!(
                    "⏳ Transaction detected (<code>{}</code>). \
                     Your membership will be activated as soon as the payment confirms.",
                    short_tx_hash(hash)
                ),
                None => "⏳ Transaction detected. Your membership will be activated \
                         as soon as the payment confirms."
                    .to_string(),
            };
            notify_user(ctx.bot, user.telegram_chat_id, message).await;
        }
        None => {
            tracing::warn!(
                "Payment {} references missing user {}",
                intent.payment_id,
                intent.user_id
            );
        }
    }

    Ok(EventOutcome {
        user_id: Some(intent.user_id),
        plan_id: Some(intent.plan_id),
    })
}
