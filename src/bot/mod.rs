//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `callbacks`: inline-button payloads and their handlers
//! - `command_handlers`: slash commands
//! - `message_handler`: plain and edited text messages
//! - `responses`: outgoing text plus keyboard, and its delivery
//! - `ui_builder`: inline keyboards

pub mod callbacks;
pub mod command_handlers;
pub mod commands;
pub mod message_handler;
pub mod responses;
pub mod ui_builder;

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPool;
use teloxide::types::Chat;
use teloxide::Bot;

use crate::cache::RecentPhrasesCache;
use crate::config::{AppConfig, RetryConfig, TrainingConfig};
use crate::db::{self, ChatIdentity, Profile};
use crate::dictionary::{self, Dictionary};
use crate::localization::LocalizationManager;
use crate::permissions::{self, Permission};
use responses::Texts;

/// Shared state handed to every update handler
pub struct AppState {
    pub pool: Arc<PgPool>,
    pub localization: Arc<LocalizationManager>,
    pub recent: Arc<RecentPhrasesCache>,
    pub config: Arc<AppConfig>,
    /// Bot username, used to parse `/command@bot`
    pub bot_username: String,
}

impl AppState {
    /// Borrow the state for one update
    pub fn context<'a>(&'a self, bot: &'a Bot, language_code: Option<&'a str>) -> HandlerContext<'a> {
        HandlerContext {
            bot,
            pool: &self.pool,
            localization: &self.localization,
            recent: &self.recent,
            retry: &self.config.bot.retry,
            training: &self.config.training,
            language_code,
        }
    }
}

/// Identity of a Telegram chat for user and profile creation
pub fn chat_identity(chat: &Chat, language_code: Option<&str>) -> ChatIdentity {
    ChatIdentity {
        chat_id: chat.id.0,
        username: chat.username().map(str::to_string),
        first_name: chat.first_name().map(str::to_string),
        last_name: chat.last_name().map(str::to_string),
        language_code: language_code.map(str::to_string),
    }
}

/// Common context for bot handlers containing shared dependencies
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub pool: &'a PgPool,
    pub localization: &'a Arc<LocalizationManager>,
    pub recent: &'a RecentPhrasesCache,
    pub retry: &'a RetryConfig,
    pub training: &'a TrainingConfig,
    pub language_code: Option<&'a str>,
}

impl HandlerContext<'_> {
    /// Localized texts in the user's language
    pub fn texts(&self) -> Texts<'_> {
        Texts::new(self.localization, self.language_code)
    }

    /// Get or create the profile of the chat and move it to the state implied
    /// by `input`
    pub async fn enter_profile(&self, identity: &ChatIdentity, input: &str) -> Result<Profile> {
        let mut profile = db::get_or_create_user_profile(self.pool, identity).await?;
        let state = crate::dialogue::ProfileState::after_input(input);
        db::update_profile_state(self.pool, &mut profile, state).await?;
        Ok(profile)
    }

    /// The dictionary if the user may perform `permission` on it
    pub async fn dictionary_with_permission(
        &self,
        user_id: i64,
        dictionary_id: i64,
        permission: Permission,
    ) -> Result<Option<Dictionary>> {
        if !permissions::has_permission(self.pool, user_id, dictionary_id, permission).await? {
            return Ok(None);
        }
        dictionary::get_dictionary(self.pool, dictionary_id).await
    }
}
