pub mod bounced;
pub mod completed;
pub mod refunded;
pub mod started;
pub mod unknown_event;

use crate::config::AppConfig;
use crate::payments::status::PaymentStatus;
use crate::webhooks::daimo::http_server::DaimoWebhookEvent;
use pnptv_bot::db::{DbError, DbPool};
use pnptv_bot::models::PaymentIntent;
use pnptv_bot::transition_payment_intent;
use teloxide::Bot;

pub struct EventContext<'a> {
    pub pool: &'a DbPool,
    pub bot: &'a Bot,
    pub config: &'a AppConfig,
    pub event: &'a DaimoWebhookEvent,
}

/// What a handler learned about the delivery, written back onto the webhook
/// ledger row once processing finishes.
#[derive(Debug, Default)]
pub struct EventOutcome {
    pub user_id: Option<i32>,
    pub plan_id: Option<String>,
}

#[derive(Debug)]
pub enum ProcessError {
    Database(DbError),
    IntentNotFound(String),
    UserNotFound(i32),
    PlanNotFound { payment_id: String, plan_id: String },
    Activation(String),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Database(e) => write!(f, "Database error: {}", e),
            ProcessError::IntentNotFound(payment_id) => {
                write!(f, "No payment intent for payment {}", payment_id)
            }
            ProcessError::UserNotFound(user_id) => write!(f, "User {} not found", user_id),
            ProcessError::PlanNotFound {
                payment_id,
                plan_id,
            } => write!(
                f,
                "Plan {} missing for completed payment {}",
                plan_id, payment_id
            ),
            ProcessError::Activation(e) => write!(f, "Activation failed: {}", e),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<DbError> for ProcessError {
    fn from(err: DbError) -> Self {
        ProcessError::Database(err)
    }
}

/// Moves an intent along the transition table with a compare-and-set update.
/// Invalid or out-of-order transitions are logged and ignored (`None`), as
/// are races lost to a concurrent delivery.
pub fn apply_transition(
    pool: &DbPool,
    intent: &PaymentIntent,
    next: PaymentStatus,
) -> Result<Option<PaymentIntent>, ProcessError> {
    let current = match PaymentStatus::parse(&intent.status) {
        Some(current) => current,
        None => {
            tracing::error!(
                "Payment intent {} has unrecognized status '{}'",
                intent.payment_id,
                intent.status
            );
            return Ok(None);
        }
    };

    if current == next {
        tracing::info!(
            "Payment {} already in status {}, nothing to do",
            intent.payment_id,
            next.as_str()
        );
        return Ok(None);
    }

    if current.is_terminal() {
        tracing::warn!(
            "Payment {} is already terminal ({}), ignoring {}",
            intent.payment_id,
            current.as_str(),
            next.as_str()
        );
        return Ok(None);
    }

    if !current.can_transition_to(next) {
        tracing::warn!(
            "Ignoring invalid transition {} -> {} for payment {}",
            current.as_str(),
            next.as_str(),
            intent.payment_id
        );
        return Ok(None);
    }

    let updated = transition_payment_intent(pool, &intent.payment_id, current.as_str(), next.as_str())?;

    if updated.is_none() {
        tracing::warn!(
            "Lost transition race for payment {} ({} -> {})",
            intent.payment_id,
            current.as_str(),
            next.as_str()
        );
    }

    Ok(updated)
}
