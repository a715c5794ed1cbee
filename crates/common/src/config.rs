use crate::NotifyMode;

const DEFAULT_BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
const DEFAULT_MONITOR_CONFIG_PATH: &str = "config/monitor.toml";

/// Process configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Notifications
    pub notify_mode: NotifyMode,
    pub telegram: Option<TelegramConfig>,

    // Exchange
    pub binance_futures_url: String,

    // Watchlist, timeframes and tuning
    pub monitor_config_path: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let notify_mode = match optional_env("NOTIFY_MODE")
            .unwrap_or_else(|| "telegram".to_string())
            .to_lowercase()
            .as_str()
        {
            "telegram" => NotifyMode::Telegram,
            "log" => NotifyMode::Log,
            other => panic!("ERROR: NOTIFY_MODE must be 'telegram' or 'log', got: '{other}'"),
        };

        let telegram = match notify_mode {
            NotifyMode::Telegram => {
                let raw_chat_id = required_env("TELEGRAM_CHAT_ID");
                let chat_id = raw_chat_id.trim().parse::<i64>().unwrap_or_else(|_| {
                    panic!("TELEGRAM_CHAT_ID is not a numeric chat id: '{}'", raw_chat_id.trim())
                });
                Some(TelegramConfig {
                    token: required_env("TELEGRAM_TOKEN"),
                    chat_id,
                })
            }
            NotifyMode::Log => None,
        };

        Config {
            notify_mode,
            telegram,
            binance_futures_url: optional_env("BINANCE_FUTURES_URL")
                .unwrap_or_else(|| DEFAULT_BINANCE_FUTURES_URL.to_string()),
            monitor_config_path: optional_env("MONITOR_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_MONITOR_CONFIG_PATH.to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
