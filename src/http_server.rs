use crate::config::AppConfig;
use crate::observability::METRICS;
use crate::payments::daimo::{DaimoClient, DaimoError};
use crate::webhooks::daimo::http_server::handle_daimo_webhook;
use actix_web::http::StatusCode;
use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};
use pnptv_bot::db::DbPool;
use serde_json::json;

pub async fn run_http_server(pool: DbPool, config: AppConfig) -> std::io::Result<()> {
    let port = config.port;
    let daimo = DaimoClient::new(&config);

    tracing::info!("Starting HTTP server on port {}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(daimo.clone()))
            .service(health)
            .service(get_service_config)
            .service(get_metrics)
            .service(get_payment_status)
            .service(handle_daimo_webhook)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[get("/health")]
async fn health() -> impl Responder {
    "I'm ok"
}

/// Non-secret configuration for diagnostics. Tokens and keys never appear
/// here, only whether they are set.
#[get("/config")]
async fn get_service_config(config: web::Data<AppConfig>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "bot": "PNPtv",
        "daimoApiUrl": config.daimo_api_url,
        "reorgChainIds": config.reorg_chain_ids,
        "reorgDelaySecs": config.reorg_delay_secs,
        "webhookTokenConfigured": config.daimo_webhook_token.is_some(),
        "premiumChannelConfigured": config.premium_channel_id.is_some(),
        "port": config.port,
    }))
}

#[get("/metrics")]
async fn get_metrics() -> impl Responder {
    HttpResponse::Ok().json(METRICS.snapshot())
}

/// Pass-through to the payment provider's status API.
#[get("/payment/{payment_id}/status")]
async fn get_payment_status(
    path: web::Path<String>,
    daimo: web::Data<DaimoClient>,
) -> impl Responder {
    let payment_id = path.into_inner();

    match daimo.get_payment_status(&payment_id).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(DaimoError::Api { status, body }) => {
            tracing::warn!(
                "Provider returned {} for payment {} status lookup",
                status,
                payment_id
            );
            HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
                .body(body)
        }
        Err(e) => {
            tracing::error!("Failed to reach provider for payment {}: {}", payment_id, e);
            METRICS.increment_errors();
            HttpResponse::BadGateway().json(json!({ "error": "payment provider unreachable" }))
        }
    }
}
