use crate::schema::{payment_intents, pending_activations, plans, users, webhook_events};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub telegram_user_id: i64,
    pub telegram_chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub tier: String,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub membership_is_premium: bool,
    pub tier_updated_at: Option<DateTime<Utc>>,
    pub tier_updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Null expiry on a premium member encodes a lifetime grant.
    pub fn has_lifetime_membership(&self) -> bool {
        self.membership_is_premium && self.membership_expires_at.is_none()
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub telegram_user_id: i64,
    pub telegram_chat_id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub tier: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub currency: String,
    pub duration_days: Option<i32>,
    pub tier: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn is_lifetime(&self) -> bool {
        self.duration_days.is_none()
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Associations)]
#[diesel(table_name = payment_intents)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentIntent {
    pub id: i32,
    pub payment_id: String,
    pub user_id: i32,
    pub plan_id: String,
    pub amount: BigDecimal,
    pub status: String,
    pub checkout_url: Option<String>,
    pub destination_address: Option<String>,
    pub chain_id: Option<i32>,
    pub token_symbol: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = payment_intents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPaymentIntent<'a> {
    pub payment_id: &'a str,
    pub user_id: i32,
    pub plan_id: &'a str,
    pub amount: BigDecimal,
    pub status: &'a str,
    pub checkout_url: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = webhook_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WebhookEvent {
    pub id: i32,
    pub idempotency_key: Option<String>,
    pub payment_id: String,
    pub status: String,
    pub is_test_event: bool,
    pub user_id: Option<i32>,
    pub plan_id: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = webhook_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewWebhookEvent<'a> {
    pub idempotency_key: Option<&'a str>,
    pub payment_id: &'a str,
    pub status: &'a str,
    pub is_test_event: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = pending_activations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PendingActivation {
    pub id: i32,
    pub payment_id: String,
    pub user_id: i32,
    pub plan_id: String,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = pending_activations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPendingActivation<'a> {
    pub payment_id: &'a str,
    pub user_id: i32,
    pub plan_id: &'a str,
    pub due_at: DateTime<Utc>,
    pub status: &'a str,
}
