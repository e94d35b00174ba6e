use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bot_token: String,
    pub daimo_api_url: String,
    pub daimo_api_key: String,
    pub daimo_webhook_token: Option<String>,
    pub premium_channel_id: Option<i64>,
    pub reorg_chain_ids: Vec<i32>,
    pub reorg_delay_secs: u64,
    pub admin_logs: String,
    pub admin_chat_id: i64,
    pub admin_log_level: u8,
    pub port: u16,
}

#[derive(Debug)]
pub struct ConfigError {
    pub missing_vars: Vec<String>,
    pub invalid_vars: Vec<(String, String)>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.missing_vars.is_empty() {
            writeln!(f, "Missing required environment variables:")?;
            for var in &self.missing_vars {
                writeln!(f, "  - {}", var)?;
            }
        }
        if !self.invalid_vars.is_empty() {
            writeln!(f, "Invalid environment variables:")?;
            for (var, err) in &self.invalid_vars {
                writeln!(f, "  - {}: {}", var, err)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

fn get_required(name: &str, missing: &mut Vec<String>) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}

fn parse_chain_ids(raw: &str, invalid: &mut Vec<(String, String)>) -> Vec<i32> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<i32>() {
            Ok(id) => ids.push(id),
            Err(e) => invalid.push(("REORG_CHAIN_IDS".into(), format!("{}: {}", part, e))),
        }
    }
    ids
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let database_url = get_required("DATABASE_URL", &mut missing);
        let bot_token = get_required("PNPTV_BOT_TOKEN", &mut missing);
        let daimo_api_key = get_required("DAIMO_API_KEY", &mut missing);
        let admin_chat_id_str = get_required("TELEGRAM_ADMIN_CHAT_ID", &mut missing);

        let daimo_api_url =
            env::var("DAIMO_API_URL").unwrap_or_else(|_| "https://pay.daimo.com/api".into());
        if let Err(e) = Url::parse(&daimo_api_url) {
            invalid.push(("DAIMO_API_URL".into(), e.to_string()));
        }

        // The webhook endpoint answers 500 until this is configured.
        let daimo_webhook_token = env::var("DAIMO_WEBHOOK_TOKEN").ok().filter(|t| !t.is_empty());

        let premium_channel_id = match env::var("PREMIUM_CHANNEL_ID") {
            Ok(v) if !v.is_empty() => match v.parse::<i64>() {
                Ok(id) => Some(id),
                Err(e) => {
                    invalid.push(("PREMIUM_CHANNEL_ID".into(), e.to_string()));
                    None
                }
            },
            _ => None,
        };

        let reorg_chain_ids = parse_chain_ids(
            &env::var("REORG_CHAIN_IDS").unwrap_or_else(|_| "137".into()),
            &mut invalid,
        );

        let reorg_delay_secs = env::var("REORG_DELAY_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse::<u64>()
            .map_err(|e| {
                invalid.push(("REORG_DELAY_SECS".into(), e.to_string()));
            })
            .unwrap_or(30);

        let admin_logs = env::var("ADMIN_LOGS").unwrap_or_default();

        let admin_chat_id = admin_chat_id_str
            .as_ref()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| {
                        invalid.push(("TELEGRAM_ADMIN_CHAT_ID".into(), e.to_string()));
                    })
                    .ok()
            })
            .unwrap_or(0);

        let admin_log_level = env::var("ADMIN_LOG_LEVEL")
            .unwrap_or_else(|_| "50".into())
            .parse::<u8>()
            .unwrap_or(50);

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .map_err(|e| {
                invalid.push(("PORT".into(), e.to_string()));
            })
            .unwrap_or(8080);

        if !missing.is_empty() || !invalid.is_empty() {
            return Err(ConfigError {
                missing_vars: missing,
                invalid_vars: invalid,
            });
        }

        Ok(Self {
            database_url: database_url.unwrap(),
            bot_token: bot_token.unwrap(),
            daimo_api_url,
            daimo_api_key: daimo_api_key.unwrap(),
            daimo_webhook_token,
            premium_channel_id,
            reorg_chain_ids,
            reorg_delay_secs,
            admin_logs,
            admin_chat_id,
            admin_log_level,
            port,
        })
    }

    pub fn is_admin_logs_active(&self) -> bool {
        self.admin_logs == "ACTIVE"
    }

    pub fn is_reorg_prone(&self, chain: i32) -> bool {
        self.reorg_chain_ids.contains(&chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chain_id_list() {
        let mut invalid = Vec::new();
        assert_eq!(parse_chain_ids("137, 56,1", &mut invalid), vec![137, 56, 1]);
        assert!(invalid.is_empty());
    }

    #[test]
    fn rejects_garbage_chain_ids() {
        let mut invalid = Vec::new();
        assert_eq!(parse_chain_ids("137,polygon", &mut invalid), vec![137]);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn empty_chain_id_entries_are_skipped() {
        let mut invalid = Vec::new();
        assert_eq!(parse_chain_ids("137,,", &mut invalid), vec![137]);
        assert!(invalid.is_empty());
    }
}
