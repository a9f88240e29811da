//! # Dictrainer Telegram Bot
//!
//! A Telegram bot for learning vocabulary: users keep personal dictionaries
//! of phrase pairs typed as `cat - кот` and train them with flash-card
//! quizzes that favour the phrases they guess worst.

pub mod bot;
pub mod cache;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod dictionary;
pub mod errors;
pub mod language;
pub mod localization;
pub mod maintenance;
pub mod observability;
pub mod observability_config;
pub mod permissions;
pub mod phrases;
pub mod stats;
pub mod training;
pub mod transport;

// Re-export types for easier access
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use phrases::{parse_phrase_groups, ParsedPhraseGroup, PhraseInputError};
