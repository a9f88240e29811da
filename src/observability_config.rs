//! # Observability Configuration
//!
//! Log format, trace export and the metrics endpoint, read from the
//! environment next to the rest of [`crate::config::AppConfig`].

use std::fmt;
use std::str::FromStr;

use crate::config::env_or;
use crate::errors::{AppError, AppResult};

/// Deployment environment the bot runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        })
    }
}

/// Shape of the log lines written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub environment: Environment,
    /// Level applied to the bot's own targets; `RUST_LOG` still wins
    pub log_level: String,
    pub log_format: LogFormat,
    /// OTLP gRPC endpoint; no traces are exported when unset
    pub otlp_endpoint: Option<String>,
    /// Share of traces kept, `None` keeps all of them
    pub trace_sampling_ratio: Option<f64>,
    /// Port of the `/metrics` and `/health/*` server, `None` disables it
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl ObservabilityConfig {
    /// Defaults for an environment: verbose pretty logs in development,
    /// JSON logs with sampled traces in production
    pub fn for_environment(environment: Environment) -> Self {
        let production = environment == Environment::Production;
        Self {
            environment,
            log_level: if environment == Environment::Development {
                "debug".to_string()
            } else {
                "info".to_string()
            },
            log_format: if environment == Environment::Development {
                LogFormat::Pretty
            } else {
                LogFormat::Json
            },
            otlp_endpoint: None,
            trace_sampling_ratio: production.then_some(0.1),
            metrics_port: Some(9090),
        }
    }

    /// Load the observability section; `ENVIRONMENT` picks the defaults the
    /// other variables override
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::for_environment(env_or("ENVIRONMENT", Environment::Development)?);

        config.log_level = env_or("LOG_LEVEL", config.log_level.clone())?;
        config.log_format = env_or("LOG_FORMAT", config.log_format)?;
        config.otlp_endpoint = std::env::var("OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        if std::env::var("TRACE_SAMPLING_RATIO").is_ok_and(|raw| !raw.trim().is_empty()) {
            config.trace_sampling_ratio = Some(env_or("TRACE_SAMPLING_RATIO", 1.0)?);
        }
        if !env_or("ENABLE_METRICS_EXPORT", true)? {
            config.metrics_port = None;
        } else if let Some(port) = config.metrics_port {
            config.metrics_port = Some(env_or("METRICS_PORT", port)?);
        }

        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(AppError::Config(format!("OTLP endpoint must be an http(s) URL: {}", endpoint)));
            }
        }

        if let Some(ratio) = self.trace_sampling_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(AppError::Config(format!("Trace sampling ratio out of range: {}", ratio)));
            }
        }

        if self.metrics_port == Some(0) {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(AppError::Config(format!("Invalid log level: {}", self.log_level)));
        }

        Ok(())
    }
}
