use crate::observability::alerts::Severity;
use crate::observability::{ALERTS, METRICS};
use chrono::{DateTime, Duration, Utc};
use html_escape::encode_text;
use pnptv_bot::db::{DbError, DbPool};
use pnptv_bot::models::{Plan, User};
use pnptv_bot::{update_user_membership, MembershipUpdate};
use teloxide::payloads::CreateChatInviteLinkSetters;
use teloxide::prelude::*;

#[derive(Debug)]
pub enum MembershipError {
    Database(DbError),
}

impl std::fmt::Display for MembershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for MembershipError {}

impl From<DbError> for MembershipError {
    fn from(err: DbError) -> Self {
        MembershipError::Database(err)
    }
}

#[derive(Debug)]
pub struct ActivationOutcome {
    pub user: User,
    pub invite_link: Option<String>,
}

/// Expiry rules: a lifetime plan (no duration) grants a null expiry; a user
/// already on a lifetime grant is never shortened; otherwise the plan's
/// duration extends the later of now and the current expiry.
pub fn compute_new_expiry(
    current_expiry: Option<DateTime<Utc>>,
    currently_premium: bool,
    duration_days: Option<i32>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let days = match duration_days {
        Some(days) => days,
        None => return None,
    };

    if currently_premium && current_expiry.is_none() {
        return None;
    }

    let base = match current_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };

    Some(base + Duration::days(i64::from(days)))
}

/// Applies a paid plan to a user: sets tier, extends or sets the expiry, and
/// creates a single-use invite link to the premium channel. Invite-link
/// failure does not fail the activation.
pub async fn activate_membership(
    pool: &DbPool,
    bot: &Bot,
    user: &User,
    plan: &Plan,
    premium_channel_id: Option<i64>,
    updated_by: &str,
) -> Result<ActivationOutcome, MembershipError> {
    let expires_at = compute_new_expiry(
        user.membership_expires_at,
        user.membership_is_premium,
        plan.duration_days,
        Utc::now(),
    );

    let updated = update_user_membership(
        pool,
        user.id,
        MembershipUpdate {
            tier: &plan.tier,
            membership_expires_at: expires_at,
            membership_is_premium: true,
            tier_updated_by: updated_by,
        },
    )?;

    tracing::info!(
        "Activated plan {} for user {} (tier {}, expires {:?})",
        plan.id,
        user.telegram_user_id,
        plan.tier,
        expires_at
    );

    let invite_link = match premium_channel_id {
        Some(channel) => match bot
            .create_chat_invite_link(ChatId(channel))
            .member_limit(1)
            .await
        {
            Ok(link) => Some(link.invite_link),
            Err(e) => {
                tracing::warn!(
                    "Failed to create invite link for user {}: {}",
                    user.telegram_user_id,
                    e
                );
                ALERTS
                    .send_alert(
                        bot,
                        Severity::Warning,
                        "InviteLink",
                        &format!(
                            "Could not create invite link for user {}: {}",
                            user.telegram_user_id, e
                        ),
                    )
                    .await;
                None
            }
        },
        None => None,
    };

    METRICS.increment_activations();

    Ok(ActivationOutcome {
        user: updated,
        invite_link,
    })
}

pub fn format_activation_message(
    plan: &Plan,
    tx_hash: Option<&str>,
    invite_link: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> String {
    let mut message = format!(
        "✅ Payment confirmed! Your <b>{}</b> membership is now active.",
        encode_text(&plan.name)
    );

    match expires_at {
        Some(expiry) => {
            message.push_str(&format!("\nValid until {}.", expiry.format("%d.%m.%Y")));
        }
        None => message.push_str("\nThis is a lifetime membership."),
    }

    if let Some(hash) = tx_hash {
        message.push_str(&format!("\nTransaction: <code>{}</code>", short_tx_hash(hash)));
    }

    if let Some(link) = invite_link {
        message.push_str(&format!("\n\nJoin the premium channel: {}", link));
    }

    message
}

pub fn short_tx_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 16 {
        return hash.to_string();
    }

    let head: String = chars.iter().take(10).collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn plan(duration_days: Option<i32>) -> Plan {
        Plan {
            id: "basic-30".to_string(),
            name: "Basic".to_string(),
            price: BigDecimal::from_str("14.99").unwrap(),
            currency: "USD".to_string(),
            duration_days,
            tier: "basic".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_member_gets_now_plus_duration() {
        let now = Utc::now();
        let expiry = compute_new_expiry(None, false, Some(30), now);
        assert_eq!(expiry, Some(now + Duration::days(30)));
    }

    #[test]
    fn active_member_extends_from_current_expiry() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        let expiry = compute_new_expiry(Some(current), true, Some(30), now);
        assert_eq!(expiry, Some(current + Duration::days(30)));
    }

    #[test]
    fn lapsed_expiry_restarts_from_now() {
        let now = Utc::now();
        let stale = now - Duration::days(90);
        let expiry = compute_new_expiry(Some(stale), false, Some(30), now);
        assert_eq!(expiry, Some(now + Duration::days(30)));
    }

    #[test]
    fn lifetime_plan_clears_expiry() {
        let now = Utc::now();
        assert_eq!(compute_new_expiry(None, false, None, now), None);
        assert_eq!(
            compute_new_expiry(Some(now + Duration::days(5)), true, None, now),
            None
        );
    }

    #[test]
    fn lifetime_member_is_never_shortened() {
        let now = Utc::now();
        // Null expiry on a premium member means lifetime; a 30-day purchase
        // must not reintroduce an expiry date.
        assert_eq!(compute_new_expiry(None, true, Some(30), now), None);
    }

    #[test]
    fn short_tx_hash_truncates_long_hashes() {
        let hash = "0xabc123def456abc123def456abc123def456abc1";
        let short = short_tx_hash(hash);
        assert!(short.starts_with("0xabc123de"));
        assert!(short.ends_with("abc1"));
        assert!(short.contains('…'));
    }

    #[test]
    fn short_tx_hash_leaves_short_values_alone() {
        assert_eq!(short_tx_hash("0xdeadbeef"), "0xdeadbeef");
    }

    #[test]
    fn activation_message_mentions_plan_and_hash() {
        let message = format_activation_message(
            &plan(Some(30)),
            Some("0xabc123def456abc123def456abc123def456abc1"),
            Some("https://t.me/+invite"),
            Some(Utc::now() + Duration::days(30)),
        );

        assert!(message.contains("Basic"));
        assert!(message.contains("0xabc123de"));
        assert!(message.contains("https://t.me/+invite"));
        assert!(message.contains("Valid until"));
    }

    #[test]
    fn activation_message_marks_lifetime() {
        let message = format_activation_message(&plan(None), None, None, None);
        assert!(message.contains("lifetime"));
    }
}
