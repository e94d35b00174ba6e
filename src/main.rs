use dotenv::dotenv;
use std::sync::Arc;
use tokio::task;

pub mod bots;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod payments;
pub mod services;
pub mod utils;
pub mod webhooks;

use crate::bots::bot_service::BotService;
use crate::config::AppConfig;
use crate::http_server::run_http_server;
use crate::observability::startup::{
    alert_database_error, alert_migration_error, alert_startup_success,
};
use crate::services::activation_scheduler::run_activation_scheduler;
use crate::services::membership_expiry::run_membership_expiry;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing_subscriber::EnvFilter;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error:\n{}", e);
            std::process::exit(1);
        }
    };

    if config.daimo_webhook_token.is_none() {
        tracing::warn!(
            "DAIMO_WEBHOOK_TOKEN not set; webhook deliveries will be rejected with 500"
        );
    }

    if config.is_admin_logs_active() {
        tracing::info!(
            "Admin alerts enabled for chat {} (level {})",
            config.admin_chat_id,
            config.admin_log_level
        );
    }

    let pool = match pnptv_bot::db::create_pool(&config.database_url) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            alert_database_error(&e.to_string()).await;
            std::process::exit(1);
        }
    };

    match pool.get() {
        Ok(mut conn) => {
            if let Err(e) = conn.run_pending_migrations(MIGRATIONS) {
                alert_migration_error(&e.to_string()).await;
                std::process::exit(1);
            }
        }
        Err(e) => {
            alert_database_error(&e.to_string()).await;
            std::process::exit(1);
        }
    }

    task::spawn(BotService::new(&config, pool.clone()).run_bot());
    task::spawn(run_activation_scheduler(pool.clone(), config.clone()));
    task::spawn(run_membership_expiry(pool.clone(), config.clone()));

    alert_startup_success().await;

    run_http_server(pool, config).await.expect("Http server error");
}
