use crate::config::AppConfig;
use crate::observability::METRICS;
use crate::payments::status::PaymentStatus;
use crate::webhooks::daimo::webhook_handlers::{
    bounced::handle_bounced_event, completed::handle_completed_event,
    refunded::handle_refunded_event, started::handle_started_event,
    unknown_event::handle_unknown_event, EventContext,
};
use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pnptv_bot::db::DbPool;
use pnptv_bot::models::NewWebhookEvent;
use pnptv_bot::{claim_webhook_event, mark_webhook_event_processed};
use serde::Deserialize;
use serde_json::json;
use teloxide::Bot;

#[derive(Debug, Deserialize)]
pub struct DaimoWebhookEvent {
    pub id: String,
    pub status: String,
    #[serde(default, rename = "isTestEvent")]
    pub is_test_event: bool,
    pub source: Option<EventSource>,
    pub destination: Option<EventDestination>,
}

#[derive(Debug, Deserialize)]
pub struct EventSource {
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventDestination {
    #[serde(rename = "chainId")]
    pub chain_id: Option<i32>,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: Option<String>,
    pub address: Option<String>,
}

impl DaimoWebhookEvent {
    pub fn tx_hash(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.tx_hash.as_deref())
    }

    pub fn chain_id(&self) -> Option<i32> {
        self.destination.as_ref().and_then(|d| d.chain_id)
    }

    pub fn token_symbol(&self) -> Option<&str> {
        self.destination
            .as_ref()
            .and_then(|d| d.token_symbol.as_deref())
    }

    pub fn destination_address(&self) -> Option<&str> {
        self.destination.as_ref().and_then(|d| d.address.as_deref())
    }
}

/// The provider authenticates with `Authorization: Basic <base64(secret)>`.
fn is_authorized(header_value: Option<&header::HeaderValue>, secret: &str) -> bool {
    let value = match header_value.and_then(|h| h.to_str().ok()) {
        Some(v) => v,
        None => return false,
    };

    let encoded = match value.strip_prefix("Basic ") {
        Some(e) => e.trim(),
        None => return false,
    };

    match BASE64.decode(encoded) {
        Ok(decoded) => decoded == secret.as_bytes(),
        Err(_) => false,
    }
}

#[post("/webhook")]
pub async fn handle_daimo_webhook(
    req: HttpRequest,
    body: web::Bytes,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let secret = match &config.daimo_webhook_token {
        Some(secret) => secret,
        None => {
            tracing::error!("DAIMO_WEBHOOK_TOKEN not configured, cannot verify webhook");
            return HttpResponse::InternalServerError()
                .json(json!({ "success": false, "error": "webhook token not configured" }));
        }
    };

    if !is_authorized(req.headers().get(header::AUTHORIZATION), secret) {
        tracing::warn!("Webhook rejected: missing or invalid authorization");
        return HttpResponse::Unauthorized()
            .json(json!({ "success": false, "error": "unauthorized" }));
    }

    // From here on every outcome is HTTP 200: the provider must not
    // retry-storm us over internal failures, which land in the logs instead.
    let event: DaimoWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Malformed webhook body: {}", e);
            METRICS.increment_errors();
            return HttpResponse::Ok()
                .json(json!({ "success": false, "error": "malformed body" }));
        }
    };

    let idempotency_key = req
        .headers()
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    tracing::info!(
        "Daimo webhook: payment {} status {} (test: {}, key: {:?})",
        event.id,
        event.status,
        event.is_test_event,
        idempotency_key
    );

    let record = match claim_webhook_event(
        &pool,
        NewWebhookEvent {
            idempotency_key: idempotency_key.as_deref(),
            payment_id: &event.id,
            status: &event.status,
            is_test_event: event.is_test_event,
        },
    ) {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::info!(
                "Duplicate delivery for payment {} (idempotency key already claimed)",
                event.id
            );
            METRICS.increment_duplicate_events();
            return HttpResponse::Ok().json(json!({ "success": true, "duplicate": true }));
        }
        Err(e) => {
            tracing::error!("Failed to record webhook event: {}", e);
            METRICS.increment_errors();
            return HttpResponse::Ok().json(json!({ "success": false, "error": "internal" }));
        }
    };

    // Sandbox traffic is acknowledged and ledgered but must never grant
    // real access.
    if event.is_test_event {
        METRICS.increment_test_events();
        tracing::info!("Test event for payment {}, skipping processing", event.id);
        if let Err(e) = mark_webhook_event_processed(&pool, record.id, None, None) {
            tracing::error!("Failed to finalize test event record: {}", e);
        }
        return HttpResponse::Ok().json(json!({ "success": true, "test": true }));
    }

    METRICS.increment_webhooks(&event.status);

    let bot = Bot::new(&config.bot_token);
    let ctx = EventContext {
        pool: &pool,
        bot: &bot,
        config: &config,
        event: &event,
    };

    let result = match PaymentStatus::parse(&event.status) {
        Some(PaymentStatus::Started) => handle_started_event(&ctx).await,
        Some(PaymentStatus::Completed) => handle_completed_event(&ctx).await,
        Some(PaymentStatus::Bounced) => handle_bounced_event(&ctx).await,
        Some(PaymentStatus::Refunded) => handle_refunded_event(&ctx).await,
        Some(PaymentStatus::Unpaid) | None => handle_unknown_event(&event),
    };

    match result {
        Ok(outcome) => {
            if let Err(e) = mark_webhook_event_processed(
                &pool,
                record.id,
                outcome.user_id,
                outcome.plan_id.as_deref(),
            ) {
                tracing::error!("Failed to finalize webhook record {}: {}", record.id, e);
            }
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(e) => {
            tracing::error!(
                "Failed to process {} for payment {}: {}",
                event.status,
                event.id,
                e
            );
            METRICS.increment_errors();
            HttpResponse::Ok().json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_value(value: &str) -> header::HeaderValue {
        header::HeaderValue::from_str(value).unwrap()
    }

    #[test]
    fn accepts_correct_basic_auth() {
        let encoded = BASE64.encode("hunter2");
        let value = header_value(&format!("Basic {}", encoded));
        assert!(is_authorized(Some(&value), "hunter2"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let encoded = BASE64.encode("wrong");
        let value = header_value(&format!("Basic {}", encoded));
        assert!(!is_authorized(Some(&value), "hunter2"));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!is_authorized(None, "hunter2"));
    }

    #[test]
    fn rejects_non_basic_schemes() {
        let value = header_value("Bearer hunter2");
        assert!(!is_authorized(Some(&value), "hunter2"));
    }

    #[test]
    fn rejects_invalid_base64() {
        let value = header_value("Basic !!!not-base64!!!");
        assert!(!is_authorized(Some(&value), "hunter2"));
    }

    #[test]
    fn parses_full_webhook_payload() {
        let body = r#"{
            "id": "pay_123",
            "status": "payment_completed",
            "isTestEvent": false,
            "source": { "txHash": "0xabc" },
            "destination": { "chainId": 137, "tokenSymbol": "USDC", "address": "0xdef" },
            "metadata": { "planId": "basic-30" }
        }"#;

        let event: DaimoWebhookEvent = serde_json::from_slice(body.as_bytes()).unwrap();
        assert_eq!(event.id, "pay_123");
        assert_eq!(event.status, "payment_completed");
        assert!(!event.is_test_event);
        assert_eq!(event.tx_hash(), Some("0xabc"));
        assert_eq!(event.chain_id(), Some(137));
        assert_eq!(event.token_symbol(), Some("USDC"));
        assert_eq!(event.destination_address(), Some("0xdef"));
    }

    #[test]
    fn parses_minimal_webhook_payload() {
        let body = r#"{ "id": "pay_9", "status": "payment_started" }"#;

        let event: DaimoWebhookEvent = serde_json::from_slice(body.as_bytes()).unwrap();
        assert!(!event.is_test_event);
        assert_eq!(event.tx_hash(), None);
        assert_eq!(event.chain_id(), None);
    }
}
