use crate::config::AppConfig;
use crate::observability::alerts::Severity;
use crate::observability::{ALERTS, METRICS};
use crate::payments::status::PaymentStatus;
use crate::services::membership::{activate_membership, format_activation_message};
use crate::services::notifier::notify_user;
use anyhow::Result;
use chrono::Utc;
use pnptv_bot::db::DbPool;
use pnptv_bot::models::PendingActivation;
use pnptv_bot::{
    claim_pending_activation, find_due_pending_activations, find_payment_intent_by_payment_id,
    find_plan_by_id, find_user_by_id, finish_pending_activation,
};
use std::time::Duration;
use teloxide::prelude::*;

const CHECK_INTERVAL_SECS: u64 = 10;

/// Sweeps the durable pending-activation queue. Activations deferred for the
/// reorg window live in the database, so a restart during the delay loses
/// nothing; the next sweep picks them up.
pub async fn run_activation_scheduler(pool: DbPool, config: AppConfig) {
    tracing::info!("Starting activation scheduler...");

    let bot = Bot::new(&config.bot_token);

    loop {
        if let Err(e) = process_due_activations(&pool, &bot, &config).await {
            tracing::error!("Error in activation scheduler: {:?}", e);
            METRICS.increment_errors();
        }

        tokio::time::sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
    }
}

async fn process_due_activations(pool: &DbPool, bot: &Bot, config: &AppConfig) -> Result<()> {
    let due = find_due_pending_activations(pool, Utc::now())?;

    if due.is_empty() {
        return Ok(());
    }

    tracing::info!("Found {} due pending activations", due.len());

    for activation in due {
        // The conditional claim keeps a second sweep (or worker) from
        // picking up the same row.
        if !claim_pending_activation(pool, activation.id)? {
            continue;
        }

        if let Err(e) = run_single_activation(pool, bot, config, &activation).await {
            tracing::error!(
                "Deferred activation {} for payment {} failed: {}",
                activation.id,
                activation.payment_id,
                e
            );
            METRICS.increment_activation_failures();
            ALERTS
                .send_alert(
                    bot,
                    Severity::Error,
                    "ActivationScheduler",
                    &format!(
                        "Deferred activation failed for payment {}: {}",
                        activation.payment_id, e
                    ),
                )
                .await;

            if let Err(db_err) = finish_pending_activation(pool, activation.id, "failed") {
                tracing::error!(
                    "Failed to mark activation {} as failed: {}",
                    activation.id,
                    db_err
                );
            }
        }
    }

    Ok(())
}

async fn run_single_activation(
    pool: &DbPool,
    bot: &Bot,
    config: &AppConfig,
    activation: &PendingActivation,
) -> Result<()> {
    let intent = match find_payment_intent_by_payment_id(pool, &activation.payment_id)? {
        Some(intent) => intent,
        None => {
            tracing::warn!(
                "Payment intent {} vanished before deferred activation",
                activation.payment_id
            );
            finish_pending_activation(pool, activation.id, "aborted")?;
            return Ok(());
        }
    };

    // Reorg re-check: only a payment still marked completed after the delay
    // window is trusted.
    if PaymentStatus::parse(&intent.status) != Some(PaymentStatus::Completed) {
        tracing::warn!(
            "Skipping activation for payment {}: status changed to '{}' during the delay window",
            intent.payment_id,
            intent.status
        );
        METRICS.increment_aborted_activations();
        finish_pending_activation(pool, activation.id, "aborted")?;
        return Ok(());
    }

    let plan = match find_plan_by_id(pool, &activation.plan_id)? {
        Some(plan) => plan,
        None => {
            tracing::error!(
                "Plan {} missing for deferred activation of payment {}",
                activation.plan_id,
                activation.payment_id
            );
            ALERTS
                .send_alert(
                    bot,
                    Severity::Error,
                    "ActivationScheduler",
                    &format!(
                        "Plan {} missing for deferred payment {}; membership NOT activated",
                        activation.plan_id, activation.payment_id
                    ),
                )
                .await;
            finish_pending_activation(pool, activation.id, "failed")?;
            return Ok(());
        }
    };

    let user = match find_user_by_id(pool, activation.user_id)? {
        Some(user) => user,
        None => {
            tracing::warn!(
                "User {} missing for deferred activation of payment {}",
                activation.user_id,
                activation.payment_id
            );
            finish_pending_activation(pool, activation.id, "aborted")?;
            return Ok(());
        }
    };

    let outcome = activate_membership(
        pool,
        bot,
        &user,
        &plan,
        config.premium_channel_id,
        "activation-scheduler",
    )
    .await?;

    let message = format_activation_message(
        &plan,
        intent.tx_hash.as_deref(),
        outcome.invite_link.as_deref(),
        outcome.user.membership_expires_at,
    );
    notify_user(bot, outcome.user.telegram_chat_id, message).await;

    finish_pending_activation(pool, activation.id, "done")?;

    tracing::info!(
        "Completed deferred activation for payment {} (user {})",
        activation.payment_id,
        user.telegram_user_id
    );

    Ok(())
}
