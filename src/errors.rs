//! # Application Error Types
//!
//! Input errors shown to the user live next to the code that raises them
//! (`phrases::PhraseInputError`, `dictionary::DictionaryError`). Startup and
//! infrastructure failures are [`AppError`]; handlers otherwise propagate
//! `anyhow::Error` and log it through [`error_logging`].

use std::fmt;

/// Errors raised before the dispatcher runs or by its infrastructure
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or invalid environment configuration
    Config(String),
    Database(String),
    /// Bot API request failed
    Telegram(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, msg) = match self {
            AppError::Config(msg) => ("config", msg),
            AppError::Database(msg) => ("database", msg),
            AppError::Telegram(msg) => ("telegram", msg),
        };
        write!(f, "{} error: {}", kind, msg)
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Telegram(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Whether a query failed on a unique constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Structured log lines for failures, one shape per failure source
pub mod error_logging {
    use tracing::{error, warn};

    /// User input longer than this is cut in logs
    const LOGGED_INPUT_CHARS: usize = 100;

    fn shorten(input: &str) -> String {
        if input.chars().count() > LOGGED_INPUT_CHARS {
            let head: String = input.chars().take(LOGGED_INPUT_CHARS).collect();
            format!("{}...", head)
        } else {
            input.to_string()
        }
    }

    pub fn log_database_error(error: &impl std::fmt::Display, operation: &str, chat_id: Option<i64>) {
        error!(error = %error, operation = %operation, chat_id = ?chat_id, "Database operation failed");
    }

    /// A Bot API call that failed for good, after `attempt_count` tries
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        chat_id: Option<i64>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            chat_id = ?chat_id,
            attempt_count = ?attempt_count,
            "Telegram request failed"
        );
    }

    /// Rejected user input; logged at warn since the user gets the reason
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<i64>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        warn!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            input_type = %input_type,
            input_value = ?input_value.map(shorten),
            "Input rejected"
        );
    }

    /// A handler failed; the update is dropped
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
        user_id: Option<i64>,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            user_id = ?user_id,
            "Update handling failed"
        );
    }

}
