use crate::config::AppConfig;
use crate::observability::METRICS;
use crate::services::notifier::notify_user;
use anyhow::Result;
use chrono::Utc;
use pnptv_bot::db::DbPool;
use pnptv_bot::{find_expired_premium_users, update_user_membership, MembershipUpdate, FREE_TIER};
use std::time::Duration;
use teloxide::prelude::*;

const CHECK_INTERVAL_SECS: u64 = 600;

/// Downgrades members whose expiry date has passed. Lifetime members carry a
/// null expiry and are never selected by the sweep.
pub async fn run_membership_expiry(pool: DbPool, config: AppConfig) {
    tracing::info!("Starting membership expiry sweeper...");

    let bot = Bot::new(&config.bot_token);

    loop {
        if let Err(e) = sweep_expired_memberships(&pool, &bot).await {
            tracing::error!("Error in membership expiry sweeper: {:?}", e);
            METRICS.increment_errors();
        }

        tokio::time::sleep(Duration::from_secs(CHECK_INTERVAL_SECS)).await;
    }
}

async fn sweep_expired_memberships(pool: &DbPool, bot: &Bot) -> Result<()> {
    let expired = find_expired_premium_users(pool, Utc::now())?;

    if expired.is_empty() {
        return Ok(());
    }

    tracing::info!("Found {} expired memberships", expired.len());

    for user in expired {
        let result = update_user_membership(
            pool,
            user.id,
            MembershipUpdate {
                tier: FREE_TIER,
                // The lapsed date is kept for audit.
                membership_expires_at: user.membership_expires_at,
                membership_is_premium: false,
                tier_updated_by: "expiry-sweep",
            },
        );

        match result {
            Ok(updated) => {
                METRICS.increment_memberships_expired();
                tracing::info!("Membership expired for user {}", user.telegram_user_id);
                notify_user(
                    bot,
                    updated.telegram_chat_id,
                    "Your PNPtv membership has expired. Use /plans to renew and \
                     keep your access."
                        .to_string(),
                )
                .await;
            }
            Err(e) => {
                tracing::error!("Failed to downgrade expired user {}: {}", user.id, e);
                METRICS.increment_errors();
            }
        }
    }

    Ok(())
}
