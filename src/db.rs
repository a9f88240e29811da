use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::dialogue::ProfileState;
use crate::errors::is_unique_violation;

/// Maximum username length
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Length of the random suffix appended to clashing usernames
pub const USERNAME_SUFFIX_LENGTH: usize = 5;

/// Suffixed usernames tried before giving up on creating a user
const MAX_USERNAME_ATTEMPTS: usize = 10;

/// Maximum stored length of logged text and responses, in characters
pub const LOG_TEXT_LIMIT: usize = 128;

/// Represents a user in the database
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub language_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Represents a chat profile in the database; `id` is the Telegram chat id
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub state: ProfileState,
    pub current_dict_id: Option<i64>,
}

/// Telegram-side identity of a chat, used to create users on first contact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatIdentity {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

/// Open a connection pool with the configured limits
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .connect(&config.url)
        .await
        .context("Failed to connect to database")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    let statements: [(&str, &str); 20] = [
        (
            "users table",
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(150) UNIQUE NOT NULL,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                language_code VARCHAR(10),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ),
        (
            "languages table",
            "CREATE TABLE IF NOT EXISTS languages (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(50) UNIQUE NOT NULL,
                code VARCHAR(50) UNIQUE NOT NULL,
                code_aliases VARCHAR(100) NOT NULL DEFAULT '',
                priority INTEGER NOT NULL DEFAULT 0
            )",
        ),
        (
            "dictionaries table",
            "CREATE TABLE IF NOT EXISTS dictionaries (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(64) NOT NULL,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (name, user_id)
            )",
        ),
        (
            "dictionary_editors table",
            "CREATE TABLE IF NOT EXISTS dictionary_editors (
                dictionary_id BIGINT NOT NULL REFERENCES dictionaries(id) ON DELETE CASCADE,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (dictionary_id, user_id)
            )",
        ),
        (
            "dictionary_viewers table",
            "CREATE TABLE IF NOT EXISTS dictionary_viewers (
                dictionary_id BIGINT NOT NULL REFERENCES dictionaries(id) ON DELETE CASCADE,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (dictionary_id, user_id)
            )",
        ),
        (
            "profiles table",
            "CREATE TABLE IF NOT EXISTS profiles (
                id BIGINT PRIMARY KEY,
                user_id BIGINT UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                state VARCHAR(64) NOT NULL DEFAULT 'wait_nothing',
                current_dict_id BIGINT REFERENCES dictionaries(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ),
        (
            "phrases table",
            "CREATE TABLE IF NOT EXISTS phrases (
                id BIGSERIAL PRIMARY KEY,
                lang_id BIGINT NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (lang_id, user_id, text)
            )",
        ),
        (
            "phrase_groups table",
            "CREATE TABLE IF NOT EXISTS phrase_groups (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ),
        (
            "phrase_group_phrases table",
            "CREATE TABLE IF NOT EXISTS phrase_group_phrases (
                phrase_group_id BIGINT NOT NULL REFERENCES phrase_groups(id) ON DELETE CASCADE,
                phrase_id BIGINT NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
                PRIMARY KEY (phrase_group_id, phrase_id)
            )",
        ),
        (
            "dictionary_phrase_groups table",
            "CREATE TABLE IF NOT EXISTS dictionary_phrase_groups (
                dictionary_id BIGINT NOT NULL REFERENCES dictionaries(id) ON DELETE CASCADE,
                phrase_group_id BIGINT NOT NULL REFERENCES phrase_groups(id) ON DELETE CASCADE,
                PRIMARY KEY (dictionary_id, phrase_group_id)
            )",
        ),
        (
            "phrase_user_stats table",
            "CREATE TABLE IF NOT EXISTS phrase_user_stats (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                phrase_id BIGINT NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
                trained_count INTEGER NOT NULL DEFAULT 0,
                guessed_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (user_id, phrase_id)
            )",
        ),
        (
            "dictionary_user_stats table",
            "CREATE TABLE IF NOT EXISTS dictionary_user_stats (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                dictionary_id BIGINT NOT NULL REFERENCES dictionaries(id) ON DELETE CASCADE,
                kind VARCHAR(16) NOT NULL,
                trained_count INTEGER NOT NULL DEFAULT 0,
                guessed_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (user_id, dictionary_id, kind)
            )",
        ),
        (
            "log_entries table",
            "CREATE TABLE IF NOT EXISTS log_entries (
                id BIGSERIAL PRIMARY KEY,
                profile_id BIGINT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                text VARCHAR(128) NOT NULL,
                text_length INTEGER NOT NULL DEFAULT 0,
                response VARCHAR(128) NOT NULL,
                version VARCHAR(64) NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ),
        (
            "message_entities table",
            "CREATE TABLE IF NOT EXISTS message_entities (
                id BIGSERIAL PRIMARY KEY,
                chat_id BIGINT NOT NULL,
                message_id BIGINT NOT NULL,
                UNIQUE (chat_id, message_id)
            )",
        ),
        (
            "message_entity_phrases table",
            "CREATE TABLE IF NOT EXISTS message_entity_phrases (
                message_entity_id BIGINT NOT NULL REFERENCES message_entities(id) ON DELETE CASCADE,
                phrase_id BIGINT NOT NULL REFERENCES phrases(id) ON DELETE CASCADE,
                PRIMARY KEY (message_entity_id, phrase_id)
            )",
        ),
        (
            "phrases user index",
            "CREATE INDEX IF NOT EXISTS phrases_user_id_idx ON phrases(user_id)",
        ),
        (
            "phrase_group_phrases phrase index",
            "CREATE INDEX IF NOT EXISTS phrase_group_phrases_phrase_id_idx ON phrase_group_phrases(phrase_id)",
        ),
        (
            "dictionary_phrase_groups group index",
            "CREATE INDEX IF NOT EXISTS dictionary_phrase_groups_group_id_idx ON dictionary_phrase_groups(phrase_group_id)",
        ),
        (
            "message_entity_phrases phrase index",
            "CREATE INDEX IF NOT EXISTS message_entity_phrases_phrase_id_idx ON message_entity_phrases(phrase_id)",
        ),
        (
            "log_entries profile index",
            "CREATE INDEX IF NOT EXISTS log_entries_profile_id_idx ON log_entries(profile_id)",
        ),
    ];

    for (name, statement) in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {name}"))?;
    }

    info!("Database schema initialized successfully");
    Ok(())
}

/// Cut `text` to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Username to try after `username` clashed with an existing one
pub fn username_with_suffix(username: &str, suffix: &str) -> String {
    let keep = MAX_USERNAME_LENGTH.saturating_sub(suffix.chars().count());
    format!("{}{}", truncate_chars(username, keep), suffix)
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .filter(u8::is_ascii_alphabetic)
        .take(USERNAME_SUFFIX_LENGTH)
        .map(char::from)
        .collect()
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get(0),
        username: row.get(1),
        first_name: row.get(2),
        last_name: row.get(3),
        language_code: row.get(4),
        is_active: row.get(5),
        created_at: row.get(6),
    }
}

fn profile_from_row(row: &PgRow) -> Profile {
    let state: String = row.get(2);
    let state = state.parse::<ProfileState>().unwrap_or_else(|e| {
        warn!(error = %e, "Resetting unreadable profile state");
        ProfileState::WaitNothing
    });

    Profile {
        id: row.get(0),
        user_id: row.get(1),
        state,
        current_dict_id: row.get(3),
    }
}

/// Get a user by internal ID
pub async fn get_user_by_id(pool: &PgPool, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, first_name, last_name, language_code, is_active, created_at
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Get a profile by chat ID
pub async fn get_profile(pool: &PgPool, chat_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query("SELECT id, user_id, state, current_dict_id FROM profiles WHERE id = $1")
        .bind(chat_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get profile")?;

    Ok(row.as_ref().map(profile_from_row))
}

/// Get or create the user and profile of a chat.
///
/// New users take the Telegram username; a clashing username gets a random
/// alphabetic suffix while staying within the length limit.
pub async fn get_or_create_user_profile(pool: &PgPool, identity: &ChatIdentity) -> Result<Profile> {
    if let Some(profile) = get_profile(pool, identity.chat_id).await? {
        return Ok(profile);
    }

    debug!(chat_id = %identity.chat_id, "Creating user and profile");

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let mut username = truncate_chars(
        identity.username.as_deref().filter(|u| !u.is_empty()).unwrap_or("undefined"),
        MAX_USERNAME_LENGTH,
    );
    let mut user_id = None;
    for _ in 0..MAX_USERNAME_ATTEMPTS {
        // A clash, including one from a concurrent insert, leaves no row
        user_id = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, language_code)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING
             RETURNING id",
        )
        .bind(&username)
        .bind(truncate_chars(identity.first_name.as_deref().unwrap_or_default(), MAX_USERNAME_LENGTH))
        .bind(truncate_chars(identity.last_name.as_deref().unwrap_or_default(), MAX_USERNAME_LENGTH))
        .bind(identity.language_code.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to create user")?
        .map(|row| row.get::<i64, _>(0));
        if user_id.is_some() {
            break;
        }
        debug!(username = %username, "Username taken, retrying with a suffix");
        username = username_with_suffix(&username, &random_suffix());
    }
    let Some(user_id) = user_id else {
        anyhow::bail!("No free username after {} attempts", MAX_USERNAME_ATTEMPTS);
    };

    let inserted = sqlx::query(
        "INSERT INTO profiles (id, user_id) VALUES ($1, $2)
         RETURNING id, user_id, state, current_dict_id",
    )
    .bind(identity.chat_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await;
    let row = match inserted {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            // Another update from the same chat created the profile first
            drop(tx);
            return get_profile(pool, identity.chat_id)
                .await?
                .context("Profile vanished after a concurrent insert");
        }
        Err(e) => return Err(e).context("Failed to create profile"),
    };
    let profile = profile_from_row(&row);

    tx.commit().await.context("Failed to commit new user")?;

    info!(user_id = %user_id, chat_id = %identity.chat_id, "User created");
    Ok(profile)
}

/// Persist a new conversation state; no write when unchanged
pub async fn update_profile_state(
    pool: &PgPool,
    profile: &mut Profile,
    state: ProfileState,
) -> Result<()> {
    if profile.state == state {
        return Ok(());
    }

    sqlx::query("UPDATE profiles SET state = $1, updated_at = NOW() WHERE id = $2")
        .bind(state.as_str())
        .bind(profile.id)
        .execute(pool)
        .await
        .context("Failed to update profile state")?;

    debug!(profile_id = %profile.id, from = %profile.state, to = %state, "Profile state changed");
    profile.state = state;
    Ok(())
}

/// Select the dictionary further commands operate on
pub async fn set_current_dict(
    pool: &PgPool,
    profile: &mut Profile,
    dictionary_id: Option<i64>,
) -> Result<()> {
    if profile.current_dict_id == dictionary_id {
        return Ok(());
    }

    sqlx::query("UPDATE profiles SET current_dict_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(dictionary_id)
        .bind(profile.id)
        .execute(pool)
        .await
        .context("Failed to set current dictionary")?;

    profile.current_dict_id = dictionary_id;
    Ok(())
}

/// Log one bot reply: inbound text and response are cut to 128 characters
pub async fn create_log_entry(pool: &PgPool, profile_id: i64, text: &str, response: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO log_entries (profile_id, text, text_length, response, version)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(profile_id)
    .bind(truncate_chars(text, LOG_TEXT_LIMIT))
    .bind(i32::try_from(text.chars().count()).unwrap_or(i32::MAX))
    .bind(truncate_chars(response, LOG_TEXT_LIMIT))
    .bind(env!("CARGO_PKG_VERSION"))
    .execute(pool)
    .await
    .context("Failed to create log entry")?;
    Ok(())
}
