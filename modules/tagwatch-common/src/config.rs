use std::env;

use crate::types::MonitorConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Monitoring
    pub target_account: String,
    pub hashtags_to_monitor: Vec<String>,
    pub max_posts: usize,
    pub check_interval_secs: u64,

    // Database
    pub database_url: String,

    // Browserless
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    pub fetch_timeout_secs: u64,
    pub request_delay_ms: u64,

    // Telegram (optional — absence disables notification only)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // API server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            target_account: required_env("TARGET_ACCOUNT"),
            hashtags_to_monitor: required_env("HASHTAGS_TO_MONITOR")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_posts: parsed_env("MAX_POSTS", 10),
            check_interval_secs: parsed_env("CHECK_INTERVAL", 600),
            database_url: required_env("DATABASE_URL"),
            browserless_url: env::var("BROWSERLESS_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            fetch_timeout_secs: parsed_env("FETCH_TIMEOUT_SECS", 20),
            request_delay_ms: parsed_env("REQUEST_DELAY_MS", 1000),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parsed_env("API_PORT", 8000),
        }
    }

    /// The monitoring surface the pipeline consumes, normalized.
    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig::new(&self.target_account, &self.hashtags_to_monitor, self.max_posts)
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
