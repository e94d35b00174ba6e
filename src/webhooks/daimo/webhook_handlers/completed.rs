use super::{apply_transition, EventContext, EventOutcome, ProcessError};
use crate::observability::alerts::Severity;
use crate::observability::{ALERTS, METRICS};
use crate::payments::status::PaymentStatus;
use crate::services::membership::{activate_membership, format_activation_message};
use crate::services::notifier::notify_user;
use chrono::{Duration, Utc};
use pnptv_bot::models::NewPendingActivation;
use pnptv_bot::{
    find_payment_intent_by_payment_id, find_plan_by_id, find_user_by_id,
    schedule_pending_activation, update_payment_intent_onchain, OnchainDetails,
};

/// The payment confirmed. On a reorg-prone chain the activation is parked in
/// the durable pending queue and picked up by the scheduler after the delay;
/// everywhere else the membership is activated right away.
pub async fn handle_completed_event(ctx: &EventContext<'_>) -> Result<EventOutcome, ProcessError> {
    let event = ctx.event;

    let intent = find_payment_intent_by_payment_id(ctx.pool, &event.id)?
        .ok_or_else(|| ProcessError::IntentNotFound(event.id.clone()))?;

    let outcome = EventOutcome {
        user_id: Some(intent.user_id),
        plan_id: Some(intent.plan_id.clone()),
    };

    // The completed event may be the first one carrying on-chain details
    // when the provider skips payment_started. Values already recorded by an
    // earlier event are kept when this one omits them.
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

    let intent = match apply_transition(ctx.pool, &intent, PaymentStatus::Completed)? {
        Some(updated) => updated,
        // Already completed (redelivery without an idempotency key) or an
        // out-of-order event; either way there is nothing left to do.
        None => return Ok(outcome),
    };

    let plan = match find_plan_by_id(ctx.pool, &intent.plan_id)? {
        Some(plan) => plan,
        None => {
            ALERTS
                .send_alert(
                    ctx.bot,
                    Severity::Error,
                    "Payments",
                    &format!(
                        "Plan {} missing for completed payment {}; membership NOT activated",
                        intent.plan_id, intent.payment_id
                    ),
                )
                .await;
            return Err(ProcessError::PlanNotFound {
                payment_id: intent.payment_id,
                plan_id: intent.plan_id,
            });
        }
    };

    let user = find_user_by_id(ctx.pool, intent.user_id)?
        .ok_or(ProcessError::UserNotFound(intent.user_id))?;

    if let Some(chain) = intent.chain_id.or_else(|| event.chain_id()) {
        if ctx.config.is_reorg_prone(chain) {
            let due_at = Utc::now() + Duration::seconds(ctx.config.reorg_delay_secs as i64);

            match schedule_pending_activation(
                ctx.pool,
                NewPendingActivation {
                    payment_id: &intent.payment_id,
                    user_id: intent.user_id,
                    plan_id: &intent.plan_id,
                    due_at,
                    status: "pending",
                },
            )? {
                Some(_) => {
                    METRICS.increment_deferred_activations();
                    tracing::info!(
                        "Chain {} is reorg-prone, deferring activation of payment {} until {}",
                        chain,
                        intent.payment_id,
                        due_at
                    );
                }
                None => {
                    tracing::info!(
                        "Activation for payment {} already scheduled",
                        intent.payment_id
                    );
                }
            }

            return Ok(outcome);
        }
    }

    let activation = match activate_membership(
        ctx.pool,
        ctx.bot,
        &user,
        &plan,
        ctx.config.premium_channel_id,
        "payment-webhook",
    )
    .await
    {
        Ok(activation) => activation,
        Err(e) => {
            METRICS.increment_activation_failures();
            ALERTS
                .send_alert(
                    ctx.bot,
                    Severity::Error,
                    "Membership",
                    &format!("Activation failed for payment {}: {}", intent.payment_id, e),
                )
                .await;
            return Err(ProcessError::Activation(e.to_string()));
        }
    };

    let message = format_activation_message(
        &plan,
        intent.tx_hash.as_deref().or_else(|| event.tx_hash()),
        activation.invite_link.as_deref(),
        activation.user.membership_expires_at,
    );
    notify_user(ctx.bot, activation.user.telegram_chat_id, message).await;

    Ok(outcome)
}
