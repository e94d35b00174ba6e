use crate::bots::keyboards::{build_checkout_keyboard, build_plans_keyboard};
use crate::config::AppConfig;
use crate::observability::alerts::Severity;
use crate::observability::{ALERTS, METRICS};
use crate::payments::daimo::{CreatePaymentRequest, DaimoClient, PaymentMetadata};
use crate::payments::status::PaymentStatus;
use crate::utils::telegram_admin::send_message_to_admin;
use chrono::{DateTime, Utc};
use html_escape::encode_text;
use pnptv_bot::db::DbPool;
use pnptv_bot::models::{NewPaymentIntent, User};
use pnptv_bot::{
    create_payment_intent, find_plan_by_id, find_user_by_telegram_id, get_active_plans,
    get_or_create_user, UserUpsertInput,
};
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree::case;
use teloxide::macros::BotCommands;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::LoggingErrorHandler;
use teloxide::prelude::{CallbackQuery, ChatId, Message, Requester, ResponseResult, Update};
use teloxide::types::ParseMode;
use teloxide::{dptree, filter_command, Bot};
use uuid::Uuid;

const SUPPORT_MESSAGE: &str =
    "We are having some trouble right now. Please try again in a few minutes.";

#[derive(Clone)]
pub struct BotService {
    pub bot: Bot,
    pool: DbPool,
    daimo: DaimoClient,
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "start and see membership plans")]
    Start,
    #[command(description = "show available membership plans")]
    Plans,
    #[command(description = "show your current membership status")]
    Status,
}

impl BotService {
    pub fn new(config: &AppConfig, pool: DbPool) -> Self {
        BotService {
            bot: Bot::new(&config.bot_token),
            pool,
            daimo: DaimoClient::new(config),
        }
    }

    async fn handle_start_command(&self, msg: Message) -> ResponseResult<()> {
        tracing::info!("Start command received from chat {}", msg.chat.id.0);

        let from = match msg.from() {
            Some(user) => user.clone(),
            None => return Ok(()),
        };

        let user = match get_or_create_user(
            &self.pool,
            UserUpsertInput {
                telegram_user_id: from.id.0 as i64,
                telegram_chat_id: msg.chat.id.0,
                username: from.username.as_deref(),
                first_name: Some(from.first_name.as_str()),
            },
        ) {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Database error creating user {}: {:?}", from.id.0, e);
                METRICS.increment_errors();
                ALERTS
                    .send_alert(
                        &self.bot,
                        Severity::Error,
                        "Database",
                        &format!("Failed to upsert user {}: {}", from.id.0, e),
                    )
                    .await;
                self.bot
                    .send_message(msg.chat.id, SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        let greeting = match user.first_name.as_deref() {
            Some(name) => format!("Hi {}! 👋", encode_text(name)),
            None => "Hi there! 👋".to_string(),
        };

        let text = format!(
            "{}\n\nWelcome to <b>PNPtv</b>. Members get full access to our \
             premium channel and community.\n\nPick a plan to get started:",
            greeting
        );

        self.send_plans(msg.chat.id.0, text).await
    }

    async fn handle_plans_command(&self, msg: Message) -> ResponseResult<()> {
        self.send_plans(msg.chat.id.0, "Available membership plans:".to_string())
            .await
    }

    async fn send_plans(&self, chat_id: i64, text: String) -> ResponseResult<()> {
        let plans = match get_active_plans(&self.pool) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::error!("Database error loading plans: {:?}", e);
                METRICS.increment_errors();
                self.bot
                    .send_message(ChatId(chat_id), SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        if plans.is_empty() {
            tracing::warn!("No active plans configured");
            self.bot
                .send_message(ChatId(chat_id), "No plans are available right now.")
                .await?;
            return Ok(());
        }

        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(build_plans_keyboard(&plans))
            .await?;

        Ok(())
    }

    async fn handle_status_command(&self, msg: Message) -> ResponseResult<()> {
        let from = match msg.from() {
            Some(user) => user.clone(),
            None => return Ok(()),
        };

        let user = match find_user_by_telegram_id(&self.pool, from.id.0 as i64) {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Database error loading user {}: {:?}", from.id.0, e);
                METRICS.increment_errors();
                self.bot
                    .send_message(msg.chat.id, SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        self.bot
            .send_message(msg.chat.id, format_status_message(user.as_ref(), Utc::now()))
            .parse_mode(ParseMode::Html)
            .await?;

        Ok(())
    }

    /// Plan selection: create a hosted checkout link with the provider and a
    /// local payment intent the webhook pipeline will resolve against.
    async fn handle_plan_callback(&self, q: CallbackQuery) -> ResponseResult<()> {
        let data = match q.data.as_deref() {
            Some(data) => data,
            None => return Ok(()),
        };

        let plan_id = match data.strip_prefix("plan:") {
            Some(plan_id) => plan_id,
            None => return Ok(()),
        };

        self.bot.answer_callback_query(q.id.clone()).await?;

        let chat_id = q
            .message
            .as_ref()
            .map(|m| m.chat.id.0)
            .unwrap_or(q.from.id.0 as i64);

        let user = match get_or_create_user(
            &self.pool,
            UserUpsertInput {
                telegram_user_id: q.from.id.0 as i64,
                telegram_chat_id: chat_id,
                username: q.from.username.as_deref(),
                first_name: Some(q.from.first_name.as_str()),
            },
        ) {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Database error upserting user {}: {:?}", q.from.id.0, e);
                METRICS.increment_errors();
                self.bot
                    .send_message(ChatId(chat_id), SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        let plan = match find_plan_by_id(&self.pool, plan_id) {
            Ok(Some(plan)) if plan.is_active => plan,
            Ok(_) => {
                self.bot
                    .send_message(
                        ChatId(chat_id),
                        "That plan is no longer available. Use /plans to see \
                         the current options.",
                    )
                    .await?;
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Database error loading plan {}: {:?}", plan_id, e);
                METRICS.increment_errors();
                self.bot
                    .send_message(ChatId(chat_id), SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        let external_id = Uuid::new_v4().to_string();
        let user_ref = user.telegram_user_id.to_string();

        let link = match self
            .daimo
            .create_payment_link(&CreatePaymentRequest {
                intent: &plan.name,
                amount: plan.price.to_string(),
                currency: &plan.currency,
                external_id: &external_id,
                metadata: PaymentMetadata {
                    user_id: &user_ref,
                    plan_id: &plan.id,
                },
            })
            .await
        {
            Ok(link) => link,
            Err(e) => {
                tracing::error!("Failed to create checkout link for plan {}: {}", plan.id, e);
                METRICS.increment_errors();
                ALERTS
                    .send_alert(
                        &self.bot,
                        Severity::Error,
                        "Checkout",
                        &format!("Checkout link creation failed for plan {}: {}", plan.id, e),
                    )
                    .await;
                self.bot
                    .send_message(ChatId(chat_id), SUPPORT_MESSAGE)
                    .await?;
                return Ok(());
            }
        };

        if let Err(e) = create_payment_intent(
            &self.pool,
            NewPaymentIntent {
                payment_id: &link.id,
                user_id: user.id,
                plan_id: &plan.id,
                amount: plan.price.clone(),
                status: PaymentStatus::Unpaid.as_str(),
                checkout_url: Some(&link.url),
            },
        ) {
            tracing::error!(
                "Failed to store payment intent {} for user {}: {:?}",
                link.id,
                user.telegram_user_id,
                e
            );
            METRICS.increment_errors();
            ALERTS
                .send_alert(
                    &self.bot,
                    Severity::Error,
                    "Database",
                    &format!("Failed to store payment intent {}: {}", link.id, e),
                )
                .await;
            self.bot
                .send_message(ChatId(chat_id), SUPPORT_MESSAGE)
                .await?;
            return Ok(());
        }

        METRICS.increment_checkouts_created();

        let text = format!(
            "You picked <b>{}</b> — {} {}.\n\nComplete your payment with the \
             button below. I will confirm here as soon as it lands.",
            encode_text(&plan.name),
            plan.price,
            plan.currency
        );

        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);

        match build_checkout_keyboard(&link.url) {
            Some(keyboard) => request = request.reply_markup(keyboard),
            None => tracing::warn!("Provider returned unparseable checkout url: {}", link.url),
        }

        request.await?;

        if let Err(e) = send_message_to_admin(
            &self.bot,
            format!(
                "New checkout: user {} plan {} payment {}",
                user.telegram_user_id, plan.id, link.id
            ),
            10,
        )
        .await
        {
            tracing::warn!("Failed to send admin notification: {}", e);
        }

        Ok(())
    }

    pub async fn run_bot(self) {
        tracing::info!("Starting PNPtv bot...");

        let handler = dptree::entry()
            .branch(
                Update::filter_message().branch(
                    filter_command::<Command, _>()
                        .branch(case![Command::Start].endpoint(
                            move |msg: Message, bot: BotService| async move {
                                bot.handle_start_command(msg).await
                            },
                        ))
                        .branch(case![Command::Plans].endpoint(
                            move |msg: Message, bot: BotService| async move {
                                bot.handle_plans_command(msg).await
                            },
                        ))
                        .branch(case![Command::Status].endpoint(
                            move |msg: Message, bot: BotService| async move {
                                bot.handle_status_command(msg).await
                            },
                        )),
                ),
            )
            .branch(Update::filter_callback_query().endpoint(
                move |q: CallbackQuery, bot: BotService| async move {
                    bot.handle_plan_callback(q).await
                },
            ));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self])
            .default_handler(|_| async {})
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

fn format_status_message(user: Option<&User>, now: DateTime<Utc>) -> String {
    let user = match user {
        Some(user) if user.membership_is_premium => user,
        _ => {
            return "You are on the free tier. Use /plans to become a member.".to_string();
        }
    };

    if user.has_lifetime_membership() {
        return format!(
            "Tier: <b>{}</b>\nLifetime membership — it never expires. 🎉",
            encode_text(&user.tier)
        );
    }

    match user.membership_expires_at {
        Some(expiry) if expiry > now => format!(
            "Tier: <b>{}</b>\nValid until {}.",
            encode_text(&user.tier),
            expiry.format("%d.%m.%Y")
        ),
        Some(expiry) => format!(
            "Your <b>{}</b> membership expired on {}. Use /plans to renew.",
            encode_text(&user.tier),
            expiry.format("%d.%m.%Y")
        ),
        // Premium with no expiry is the lifetime case handled above.
        None => "You are on the free tier. Use /plans to become a member.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(
        premium: bool,
        tier: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> User {
        User {
            id: 1,
            telegram_user_id: 42,
            telegram_chat_id: 42,
            username: None,
            first_name: None,
            tier: tier.to_string(),
            membership_expires_at: expires_at,
            membership_is_premium: premium,
            tier_updated_at: None,
            tier_updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_user_is_free_tier() {
        let message = format_status_message(None, Utc::now());
        assert!(message.contains("free tier"));
    }

    #[test]
    fn lifetime_member_has_no_expiry_line() {
        let message = format_status_message(Some(&user(true, "premium", None)), Utc::now());
        assert!(message.contains("Lifetime"));
        assert!(message.contains("premium"));
    }

    #[test]
    fn active_member_sees_expiry_date() {
        let now = Utc::now();
        let message = format_status_message(
            Some(&user(true, "basic", Some(now + Duration::days(30)))),
            now,
        );
        assert!(message.contains("Valid until"));
    }

    #[test]
    fn lapsed_member_is_told_to_renew() {
        let now = Utc::now();
        let message = format_status_message(
            Some(&user(true, "basic", Some(now - Duration::days(1)))),
            now,
        );
        assert!(message.contains("expired"));
    }
}
