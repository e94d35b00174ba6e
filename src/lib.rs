use chrono::{DateTime, Utc};
use diesel::prelude::*;

pub mod db;
pub mod models;
pub mod schema;

use self::models::*;
use db::{DbError, PgPool};

pub const FREE_TIER: &str = "free";

pub struct UserUpsertInput<'a> {
    pub telegram_user_id: i64,
    pub telegram_chat_id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
}

pub fn find_user_by_id(pool: &PgPool, user_id: i32) -> Result<Option<User>, DbError> {
    use schema::users::dsl::*;

    let conn = &mut pool.get()?;

    Ok(users
        .filter(id.eq(user_id))
        .first::<User>(conn)
        .optional()?)
}

pub fn find_user_by_telegram_id(
    pool: &PgPool,
    user_telegram_id: i64,
) -> Result<Option<User>, DbError> {
    use schema::users::dsl::*;

    let conn = &mut pool.get()?;

    Ok(users
        .filter(telegram_user_id.eq(user_telegram_id))
        .first::<User>(conn)
        .optional()?)
}

pub fn create_user(pool: &PgPool, new_user: NewUser) -> Result<User, DbError> {
    use self::schema::users;

    let conn = &mut pool.get()?;

    Ok(diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(conn)?)
}

/// Looks up a user by Telegram id, creating a free-tier row on first contact.
/// The private chat id is refreshed when Telegram reports a new one.
pub fn get_or_create_user(pool: &PgPool, input: UserUpsertInput) -> Result<User, DbError> {
    let UserUpsertInput {
        telegram_user_id,
        telegram_chat_id,
        username,
        first_name,
    } = input;

    match find_user_by_telegram_id(pool, telegram_user_id)? {
        Some(user) => {
            if user.telegram_chat_id != telegram_chat_id {
                use schema::users::dsl;

                let conn = &mut pool.get()?;

                Ok(diesel::update(dsl::users.filter(dsl::id.eq(user.id)))
                    .set((
                        dsl::telegram_chat_id.eq(telegram_chat_id),
                        dsl::updated_at.eq(Utc::now()),
                    ))
                    .get_result(conn)?)
            } else {
                Ok(user)
            }
        }
        None => create_user(
            pool,
            NewUser {
                telegram_user_id,
                telegram_chat_id,
                username,
                first_name,
                tier: FREE_TIER,
            },
        ),
    }
}

#[derive(Debug)]
pub struct MembershipUpdate<'a> {
    pub tier: &'a str,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub membership_is_premium: bool,
    pub tier_updated_by: &'a str,
}

pub fn update_user_membership(
    pool: &PgPool,
    user_id_value: i32,
    update: MembershipUpdate,
) -> Result<User, DbError> {
    use schema::users::dsl::*;

    let conn = &mut pool.get()?;

    Ok(diesel::update(users.filter(id.eq(user_id_value)))
        .set((
            tier.eq(update.tier),
            membership_expires_at.eq(update.membership_expires_at),
            membership_is_premium.eq(update.membership_is_premium),
            tier_updated_at.eq(Some(Utc::now())),
            tier_updated_by.eq(Some(update.tier_updated_by)),
            updated_at.eq(Utc::now()),
        ))
        .get_result(conn)?)
}

pub fn find_expired_premium_users(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<User>, DbError> {
    use schema::users::dsl::*;

    let conn = &mut pool.get()?;

    Ok(users
        .filter(membership_is_premium.eq(true))
        .filter(membership_expires_at.is_not_null())
        .filter(membership_expires_at.le(cutoff))
        .order(membership_expires_at.asc())
        .limit(100)
        .load::<User>(conn)?)
}

pub fn get_active_plans(pool: &PgPool) -> Result<Vec<Plan>, DbError> {
    use schema::plans::dsl::*;

    let conn = &mut pool.get()?;

    Ok(plans
        .filter(is_active.eq(true))
        .order(price.asc())
        .load::<Plan>(conn)?)
}

pub fn find_plan_by_id(pool: &PgPool, plan_id: &str) -> Result<Option<Plan>, DbError> {
    use schema::plans::dsl::*;

    let conn = &mut pool.get()?;

    Ok(plans
        .filter(id.eq(plan_id))
        .first::<Plan>(conn)
        .optional()?)
}

pub fn create_payment_intent(
    pool: &PgPool,
    new_intent: NewPaymentIntent,
) -> Result<PaymentIntent, DbError> {
    use self::schema::payment_intents;

    let conn = &mut pool.get()?;

    Ok(diesel::insert_into(payment_intents::table)
        .values(&new_intent)
        .get_result(conn)?)
}

pub fn find_payment_intent_by_payment_id(
    pool: &PgPool,
    payment_id_value: &str,
) -> Result<Option<PaymentIntent>, DbError> {
    use schema::payment_intents::dsl::*;

    let conn = &mut pool.get()?;

    Ok(payment_intents
        .filter(payment_id.eq(payment_id_value))
        .first::<PaymentIntent>(conn)
        .optional()?)
}

/// Compare-and-set transition on a payment intent. Returns `None` when the
/// stored status no longer matches `from`, so a concurrent delivery that
/// already moved the intent cannot be overwritten.
pub fn transition_payment_intent(
    pool: &PgPool,
    payment_id_value: &str,
    from: &str,
    to: &str,
) -> Result<Option<PaymentIntent>, DbError> {
    use schema::payment_intents::dsl::*;

    let conn = &mut pool.get()?;

    Ok(diesel::update(
        payment_intents
            .filter(payment_id.eq(payment_id_value))
            .filter(status.eq(from)),
    )
    .set((status.eq(to), updated_at.eq(Utc::now())))
    .get_result::<PaymentIntent>(conn)
    .optional()?)
}

pub struct OnchainDetails<'a> {
    pub tx_hash: Option<&'a str>,
    pub chain_id: Option<i32>,
    pub token_symbol: Option<&'a str>,
    pub destination_address: Option<&'a str>,
}

pub fn update_payment_intent_onchain(
    pool: &PgPool,
    payment_id_value: &str,
    details: OnchainDetails,
) -> Result<Option<PaymentIntent>, DbError> {
    use schema::payment_intents::dsl::*;

    let conn = &mut pool.get()?;

    Ok(
        diesel::update(payment_intents.filter(payment_id.eq(payment_id_value)))
            .set((
                tx_hash.eq(details.tx_hash),
                chain_id.eq(details.chain_id),
                token_symbol.eq(details.token_symbol),
                destination_address.eq(details.destination_address),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<PaymentIntent>(conn)
            .optional()?,
    )
}

/// Create-if-absent claim on the webhook event ledger. The unique constraint
/// on `idempotency_key` is the dedup gate: `None` means another delivery with
/// the same key already holds the claim. Rows without a key never conflict,
/// so deliveries lacking the header are recorded but not deduplicated.
pub fn claim_webhook_event(
    pool: &PgPool,
    new_event: NewWebhookEvent,
) -> Result<Option<WebhookEvent>, DbError> {
    use self::schema::webhook_events;

    let conn = &mut pool.get()?;

    Ok(diesel::insert_into(webhook_events::table)
        .values(&new_event)
        .on_conflict(webhook_events::idempotency_key)
        .do_nothing()
        .get_result(conn)
        .optional()?)
}

pub fn mark_webhook_event_processed(
    pool: &PgPool,
    event_id: i32,
    user_id_value: Option<i32>,
    plan_id_value: Option<&str>,
) -> Result<WebhookEvent, DbError> {
    use schema::webhook_events::dsl::*;

    let conn = &mut pool.get()?;

    Ok(diesel::update(webhook_events.filter(id.eq(event_id)))
        .set((
            user_id.eq(user_id_value),
            plan_id.eq(plan_id_value),
            processed_at.eq(Some(Utc::now())),
        ))
        .get_result(conn)?)
}

/// Persists a deferred activation. `None` means an activation for this
/// payment is already queued (unique on payment_id), which keeps duplicate
/// completed events from scheduling twice.
pub fn schedule_pending_activation(
    pool: &PgPool,
    new_activation: NewPendingActivation,
) -> Result<Option<PendingActivation>, DbError> {
    use self::schema::pending_activations;

    let conn = &mut pool.get()?;

    Ok(diesel::insert_into(pending_activations::table)
        .values(&new_activation)
        .on_conflict(pending_activations::payment_id)
        .do_nothing()
        .get_result(conn)
        .optional()?)
}

pub fn find_due_pending_activations(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<PendingActivation>, DbError> {
    use schema::pending_activations::dsl::*;

    let conn = &mut pool.get()?;

    Ok(pending_activations
        .filter(status.eq("pending"))
        .filter(due_at.le(cutoff))
        .order(due_at.asc())
        .limit(50)
        .load::<PendingActivation>(conn)?)
}

/// Claims a due activation for this sweep iteration. Returns false when
/// another worker already moved it out of `pending`.
pub fn claim_pending_activation(pool: &PgPool, activation_id: i32) -> Result<bool, DbError> {
    use schema::pending_activations::dsl::*;

    let conn = &mut pool.get()?;

    let updated = diesel::update(
        pending_activations
            .filter(id.eq(activation_id))
            .filter(status.eq("pending")),
    )
    .set(status.eq("processing"))
    .execute(conn)?;

    Ok(updated > 0)
}

pub fn finish_pending_activation(
    pool: &PgPool,
    activation_id: i32,
    final_status: &str,
) -> Result<PendingActivation, DbError> {
    use schema::pending_activations::dsl::*;

    let conn = &mut pool.get()?;

    Ok(
        diesel::update(pending_activations.filter(id.eq(activation_id)))
            .set((status.eq(final_status), processed_at.eq(Some(Utc::now()))))
            .get_result(conn)?,
    )
}
