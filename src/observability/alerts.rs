use html_escape::encode_text;
use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use teloxide::prelude::*;
use teloxide::types::ParseMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Critical => "🚨",
            Severity::Error => "❌",
            Severity::Warning => "⚠️",
            Severity::Info => "ℹ️",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub severity: Severity,
    pub category: String,
}

/// Telegram alerts to the admin chat, rate-limited per (severity, category)
/// so a webhook retry storm cannot flood the channel.
pub struct AlertManager {
    rate_limit: Duration,
    last_alerts: Mutex<HashMap<AlertKey, Instant>>,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertManager {
    pub fn new() -> Self {
        Self {
            rate_limit: Duration::from_secs(60),
            last_alerts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        Self {
            rate_limit,
            last_alerts: Mutex::new(HashMap::new()),
        }
    }

    pub fn should_alert(&self, severity: Severity, category: &str) -> bool {
        let key = AlertKey {
            severity,
            category: category.to_string(),
        };

        let mut last_alerts = match self.last_alerts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("AlertManager mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        if let Some(last_time) = last_alerts.get(&key) {
            if now.duration_since(*last_time) < self.rate_limit {
                return false;
            }
        }

        last_alerts.insert(key, now);
        true
    }

    pub fn format_alert(&self, severity: Severity, category: &str, message: &str) -> String {
        format!(
            "{} <b>[{}]</b> {}\n{}",
            severity.emoji(),
            severity.label(),
            category,
            encode_text(message)
        )
    }

    pub async fn send_alert(&self, bot: &Bot, severity: Severity, category: &str, message: &str) {
        if env::var("ADMIN_LOGS").unwrap_or_default() != "ACTIVE" {
            return;
        }

        if !self.should_alert(severity, category) {
            tracing::debug!("Alert rate-limited: {} - {}", category, message);
            return;
        }

        let admin_chat_id: i64 = match env::var("TELEGRAM_ADMIN_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            Some(id) => id,
            None => {
                tracing::error!("TELEGRAM_ADMIN_CHAT_ID not set or invalid");
                return;
            }
        };

        let formatted = self.format_alert(severity, category, message);

        if let Err(e) = bot
            .send_message(ChatId(admin_chat_id), &formatted)
            .parse_mode(ParseMode::Html)
            .await
        {
            tracing::error!("Failed to send alert: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_format_alert() {
        let manager = AlertManager::new();
        let formatted = manager.format_alert(Severity::Error, "Payments", "Plan basic-30 missing");

        assert!(formatted.contains("❌"));
        assert!(formatted.contains("[ERROR]"));
        assert!(formatted.contains("Payments"));
        assert!(formatted.contains("Plan basic-30 missing"));
    }

    #[test]
    fn test_format_alert_escapes_html() {
        let manager = AlertManager::new();
        let formatted = manager.format_alert(Severity::Warning, "Webhook", "<script>");

        assert!(!formatted.contains("<script>"));
    }

    #[test]
    fn test_rate_limiting_blocks_duplicate() {
        let manager = AlertManager::with_rate_limit(Duration::from_millis(100));

        assert!(manager.should_alert(Severity::Error, "Payments"));
        assert!(!manager.should_alert(Severity::Error, "Payments"));
    }

    #[test]
    fn test_rate_limiting_allows_after_expiry() {
        let manager = AlertManager::with_rate_limit(Duration::from_millis(50));

        assert!(manager.should_alert(Severity::Error, "Payments"));
        sleep(Duration::from_millis(60));
        assert!(manager.should_alert(Severity::Error, "Payments"));
    }

    #[test]
    fn test_different_categories_not_rate_limited() {
        let manager = AlertManager::new();

        assert!(manager.should_alert(Severity::Error, "Payments"));
        assert!(manager.should_alert(Severity::Error, "Webhook"));
    }
}
