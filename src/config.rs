//! # Configuration
//!
//! Everything the bot reads from the environment (optionally through a
//! `.env` file), grouped by concern. Each section checks itself in
//! `validate`, so a bad value stops the bot before it connects anywhere.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

fn ensure(ok: bool, message: impl FnOnce() -> String) -> AppResult<()> {
    if ok {
        Ok(())
    } else {
        Err(AppError::Config(message()))
    }
}

/// Backoff for Bot API calls that failed on the network or hit a rate limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_retry_delay_ms: u64,
    /// Cap of the exponential delay
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 10000,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> AppResult<()> {
        ensure(self.max_retries > 0, || "BOT_MAX_RETRIES must be at least 1".to_string())?;
        ensure(self.base_retry_delay_ms > 0, || {
            "BOT_RETRY_BASE_DELAY_MS must be at least 1".to_string()
        })?;
        ensure(self.max_retry_delay_ms >= self.base_retry_delay_ms, || {
            format!(
                "BOT_RETRY_MAX_DELAY_MS ({}) is below BOT_RETRY_BASE_DELAY_MS ({})",
                self.max_retry_delay_ms, self.base_retry_delay_ms
            )
        })
    }
}

/// Bot API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub token: String,
    pub http_timeout_secs: u64,
    /// HTTP(S) or SOCKS proxy URL for reaching the Bot API
    pub proxy: Option<String>,
    pub retry: RetryConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
            proxy: None,
            retry: RetryConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> AppResult<()> {
        let (bot_id, secret) = self.token.trim().split_once(':').ok_or_else(|| {
            AppError::Config("TELEGRAM_BOT_TOKEN must look like <bot id>:<secret>".to_string())
        })?;
        ensure(bot_id.parse::<u64>().is_ok(), || {
            "TELEGRAM_BOT_TOKEN starts with a non-numeric bot id".to_string()
        })?;
        ensure(secret.len() >= 20, || "TELEGRAM_BOT_TOKEN secret is too short".to_string())?;

        ensure((1..=300).contains(&self.http_timeout_secs), || {
            format!(
                "HTTP_CLIENT_TIMEOUT_SECS must be between 1 and 300, got {}",
                self.http_timeout_secs
            )
        })?;

        if let Some(proxy) = &self.proxy {
            ensure(reqwest::Proxy::all(proxy.as_str()).is_ok(), || {
                format!("BOT_PROXY is not a valid proxy URL: {}", proxy)
            })?;
        }

        self.retry.validate()
    }
}

/// PostgreSQL pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Idle connections kept open
    pub min_connections: u32,
    /// How long to wait for a pooled connection
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> AppResult<()> {
        ensure(
            self.url.starts_with("postgres://") || self.url.starts_with("postgresql://"),
            || "DATABASE_URL must be a postgres:// or postgresql:// URL".to_string(),
        )?;
        ensure((1..=100).contains(&self.max_connections), || {
            format!(
                "DATABASE_MAX_CONNECTIONS must be between 1 and 100, got {}",
                self.max_connections
            )
        })?;
        ensure(self.min_connections <= self.max_connections, || {
            format!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )
        })?;
        ensure((1..=300).contains(&self.connect_timeout_secs), || {
            format!(
                "DATABASE_CONNECT_TIMEOUT_SECS must be between 1 and 300, got {}",
                self.connect_timeout_secs
            )
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Training and listing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// How many recently shown phrases are kept per user and language
    pub recent_phrases: usize,
    /// How long a recent-phrases list survives without updates, in seconds
    pub recent_phrases_ttl_secs: u64,
    /// Page size for dictionary contents
    pub contents_page_size: i64,
    /// Maximum number of dictionaries offered in the selection keyboard
    pub dict_list_limit: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            recent_phrases: 5,
            recent_phrases_ttl_secs: 24 * 60 * 60,
            contents_page_size: 20,
            dict_list_limit: 6,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> AppResult<()> {
        ensure(self.recent_phrases > 0, || "RECENT_PHRASES must be at least 1".to_string())?;
        ensure(self.recent_phrases_ttl_secs > 0, || {
            "RECENT_PHRASES_TTL_SECS must be at least 1".to_string()
        })?;
        ensure((1..=100).contains(&self.contents_page_size), || {
            format!("CONTENTS_PAGE_SIZE must be between 1 and 100, got {}", self.contents_page_size)
        })?;
        ensure(self.dict_list_limit > 0, || "DICT_LIST_LIMIT must be at least 1".to_string())
    }

    pub fn recent_phrases_ttl(&self) -> Duration {
        Duration::from_secs(self.recent_phrases_ttl_secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub training: TrainingConfig,
    pub observability: ObservabilityConfig,
}

/// Parse `key` if it is set and non-blank, else return `default`
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(default),
    }
}

fn required(key: &str) -> AppResult<String> {
    env::var(key).map_err(|_| AppError::Config(format!("{} must be set", key)))
}

impl DatabaseConfig {
    /// Read only the database section, for tools that never talk to Telegram
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: required("DATABASE_URL")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs)?,
        })
    }
}

impl BotConfig {
    fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            token: required("TELEGRAM_BOT_TOKEN")?,
            http_timeout_secs: env_or("HTTP_CLIENT_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            proxy: env::var("BOT_PROXY").ok().filter(|p| !p.trim().is_empty()),
            retry: RetryConfig {
                max_retries: env_or("BOT_MAX_RETRIES", defaults.retry.max_retries)?,
                base_retry_delay_ms: env_or("BOT_RETRY_BASE_DELAY_MS", defaults.retry.base_retry_delay_ms)?,
                max_retry_delay_ms: env_or("BOT_RETRY_MAX_DELAY_MS", defaults.retry.max_retry_delay_ms)?,
            },
        })
    }
}

impl TrainingConfig {
    fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            recent_phrases: env_or("RECENT_PHRASES", defaults.recent_phrases)?,
            recent_phrases_ttl_secs: env_or("RECENT_PHRASES_TTL_SECS", defaults.recent_phrases_ttl_secs)?,
            contents_page_size: env_or("CONTENTS_PAGE_SIZE", defaults.contents_page_size)?,
            dict_list_limit: env_or("DICT_LIST_LIMIT", defaults.dict_list_limit)?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            bot: BotConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            training: TrainingConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.database.validate()?;
        self.training.validate()?;
        self.observability.validate()
    }

    /// One log line describing the configuration, without secrets
    pub fn summary(&self) -> String {
        format!(
            "proxy={}, recent_phrases={}, page_size={}, environment={}, metrics_port={:?}",
            if self.bot.proxy.is_some() { "set" } else { "none" },
            self.training.recent_phrases,
            self.training.contents_page_size,
            self.observability.environment,
            self.observability.metrics_port,
        )
    }
}
