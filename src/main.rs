use anyhow::{Context, Result};
use dictrainer::bot::callbacks::callback_handler::callback_handler;
use dictrainer::bot::commands::Command;
use dictrainer::bot::message_handler::{edited_message_handler, message_handler};
use dictrainer::bot::AppState;
use dictrainer::cache::RecentPhrasesCache;
use dictrainer::config::AppConfig;
use dictrainer::{db, language, localization, observability};
use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

/// How often expired recent-phrase entries are dropped
const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Build the Bot API HTTP client from the bot section of the configuration
fn build_http_client(config: &AppConfig) -> Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().timeout(Duration::from_secs(config.bot.http_timeout_secs));
    if let Some(proxy) = &config.bot.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid BOT_PROXY")?);
    }
    builder.build().context("Failed to create HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();

    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    db::init_database_schema(&pool).await?;
    language::seed_languages(&pool).await?;

    // Wrap pool in Arc for sharing across async tasks
    let shared_pool = Arc::new(pool);

    observability::init_observability(&config.observability, Some(Arc::clone(&shared_pool))).await?;
    info!(config = %config.summary(), "Configuration loaded");

    let localization_manager = localization::create_localization_manager()?;

    let recent = Arc::new(RecentPhrasesCache::new(
        config.training.recent_phrases,
        config.training.recent_phrases_ttl(),
    ));
    info!(capacity = recent.capacity(), "Recent phrases cache ready");
    {
        let recent = Arc::clone(&recent);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                recent.cleanup();
                let stats = recent.stats();
                debug!(
                    entries = stats.entries,
                    hits = stats.hits,
                    misses = stats.misses,
                    "Recent phrases cache swept"
                );
                observability::record_cache_metrics(&stats, recent.capacity());
            }
        });
    }

    let client = build_http_client(&config)?;
    let bot = Bot::with_client(config.bot.token.clone(), client);

    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let state = Arc::new(AppState {
        pool: shared_pool,
        localization: localization_manager,
        recent,
        config: Arc::new(config),
        bot_username: me.username().to_string(),
    });

    info!(
        bot_username = %state.bot_username,
        timeout_secs = state.config.bot.http_timeout_secs,
        "Bot initialized, starting dispatcher"
    );

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let state = Arc::clone(&state);
            move |bot: Bot, msg: Message| {
                let state = Arc::clone(&state);
                async move { message_handler(bot, msg, state).await }
            }
        }))
        .branch(Update::filter_edited_message().endpoint({
            let state = Arc::clone(&state);
            move |bot: Bot, msg: Message| {
                let state = Arc::clone(&state);
                async move { edited_message_handler(bot, msg, state).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let state = Arc::clone(&state);
            move |bot: Bot, q: CallbackQuery| {
                let state = Arc::clone(&state);
                async move { callback_handler(bot, q, state).await }
            }
        }));

    observability::record_startup_metrics(started.elapsed());

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
