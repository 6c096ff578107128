//! Process configuration read from the environment (and `.env`).

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_FORMS_URL: &str = "https://qub1ck.github.io/telegram-bot";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_PROXY_FILE: &str = "proxy.txt";

/// Listen port of the process embedding the bot
pub const BOT_PORT: u16 = 5001;
/// Listen port of the standalone form backend
pub const BACKEND_PORT: u16 = 5000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub database_url: String,
    pub forms_url: String,
    pub port: u16,
    pub telegram_api_url: String,
    pub error_bot_token: Option<String>,
    pub error_chat_id: Option<String>,
    pub webdriver_url: String,
    pub chrome_binary: Option<String>,
    pub proxy_file: String,
    pub check_interval: Duration,
    pub db_max_connections: u32,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(default_port, |name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source
    pub fn from_lookup<F>(default_port: u16, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            forms_url: get("GITHUB_PAGES_URL").unwrap_or_else(|| DEFAULT_FORMS_URL.to_string()),
            port: parse_or("PORT", get("PORT"), default_port)?,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            error_bot_token: get("ERROR_BOT_TOKEN"),
            error_chat_id: get("ERROR_CHAT_ID"),
            webdriver_url: get("WEBDRIVER_URL").unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            chrome_binary: get("CHROME_BIN"),
            proxy_file: get("PROXY_FILE").unwrap_or_else(|| DEFAULT_PROXY_FILE.to_string()),
            check_interval: Duration::from_secs(parse_positive(
                "CHECK_INTERVAL_SECS",
                get("CHECK_INTERVAL_SECS"),
                60,
            )?),
            db_max_connections: parse_positive(
                "DB_MAX_CONNECTIONS",
                get("DB_MAX_CONNECTIONS"),
                10,
            )?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Like `parse_or`, but zero is rejected
fn parse_positive<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match parse_or(name, value.clone(), default)? {
        parsed if parsed == T::default() => Err(ConfigError::Invalid {
            name,
            value: value.unwrap_or_default(),
        }),
        parsed => Ok(parsed),
    }
}
