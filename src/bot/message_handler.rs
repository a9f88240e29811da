//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info, Instrument};

use super::callbacks::dictionary_callbacks::dictionary_detail_response;
use super::command_handlers::handle_command;
use super::commands::Command;
use super::responses::{self, Response};
use super::{chat_identity, AppState, HandlerContext};
use crate::db::{self, Profile};
use crate::dialogue::ProfileState;
use crate::dictionary;
use crate::errors::error_logging;
use crate::observability;
use crate::permissions::Permission;
use crate::phrases::{self, AddPhrasesOutcome, SourceMessage, SEGMENT_SEPARATOR};

fn language_code(msg: &Message) -> Option<&str> {
    msg.from.as_ref().and_then(|user| user.language_code.as_deref())
}

fn source_of(msg: &Message) -> SourceMessage {
    SourceMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0.into(),
    }
}

/// Entry point for new messages
pub async fn message_handler(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let span = observability::telegram_span("message_handler", msg.from.as_ref().map(|u| u.id.0 as i64));
    handle_message(&bot, &msg, &state).instrument(span).await
}

async fn handle_message(bot: &Bot, msg: &Message, state: &AppState) -> Result<()> {
    let start_time = std::time::Instant::now();

    let Some(text) = msg.text() else {
        observability::record_telegram_message("unsupported");
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };
    observability::record_telegram_message("text");

    let ctx = state.context(bot, language_code(msg));
    let identity = chat_identity(&msg.chat, language_code(msg));

    let result = match Command::parse_text(text, &state.bot_username) {
        Some(command) => match ctx.enter_profile(&identity, text).await {
            Ok(mut profile) => handle_command(&ctx, msg, command, &mut profile).await,
            Err(e) => Err(e),
        },
        None => match db::get_or_create_user_profile(ctx.pool, &identity).await {
            Ok(mut profile) => handle_text(&ctx, msg, text, &mut profile).await,
            Err(e) => Err(e),
        },
    };

    finish("message", msg, start_time, result)
}

fn finish(kind: &'static str, msg: &Message, start_time: std::time::Instant, result: Result<()>) -> Result<()> {
    let status = if result.is_ok() { 200 } else { 500 };
    observability::record_request_metrics(kind, status, start_time.elapsed());
    if let Err(e) = &result {
        error_logging::log_internal_error(e, "message_handler", kind, Some(msg.chat.id.0));
        observability::record_error_metrics("message", "message_handler");
    }
    result
}

/// Plain text is routed on the state the profile was left in
async fn handle_text(ctx: &HandlerContext<'_>, msg: &Message, text: &str, profile: &mut Profile) -> Result<()> {
    let response = if profile.state == ProfileState::WaitInputCreateDict {
        create_dictionary(ctx, profile, text).await?
    } else if text.contains(SEGMENT_SEPARATOR) {
        add_phrase_groups(ctx, msg, profile, text).await?
    } else {
        let header = ctx.texts().get("unknown-command");
        responses::commands_list(ctx.texts(), Some(&header))
    };

    response.answer_to(ctx, msg.chat.id.0, text).await
}

async fn create_dictionary(ctx: &HandlerContext<'_>, profile: &mut Profile, name: &str) -> Result<Response> {
    match dictionary::create_dictionary(ctx.pool, profile.user_id, name).await? {
        Ok(created) => {
            info!(user_id = %profile.user_id, dictionary_id = %created.id, "Dictionary created");
            db::update_profile_state(ctx.pool, profile, ProfileState::WaitNothing).await?;
            dictionary_detail_response(ctx, profile, created).await
        }
        Err(error) => {
            error_logging::log_validation_error(
                &error,
                "create_dictionary",
                Some(profile.user_id),
                "dictionary_name",
                Some(name),
            );
            Ok(responses::dictionary_error(ctx.texts(), &error))
        }
    }
}

/// The current dictionary if the profile may add phrase groups to it, or the
/// response explaining why not
async fn writable_dictionary(
    ctx: &HandlerContext<'_>,
    profile: &Profile,
) -> Result<Result<dictionary::Dictionary, Response>> {
    let current = match profile.current_dict_id {
        Some(dict_id) => dictionary::get_dictionary(ctx.pool, dict_id).await?,
        None => None,
    };
    let Some(current) = current else {
        let header = ctx.texts().get("select-dict-first");
        return Ok(Err(responses::commands_list(ctx.texts(), Some(&header))));
    };

    match ctx
        .dictionary_with_permission(profile.user_id, current.id, Permission::AddPhraseGroup)
        .await?
    {
        Some(dictionary) => Ok(Ok(dictionary)),
        None => Ok(Err(Response::new(
            ctx.texts().args("not-allowed-add", &[("name", current.name)]),
        ))),
    }
}

fn outcome_response(ctx: &HandlerContext<'_>, outcome: &AddPhrasesOutcome, name: &str) -> Response {
    match outcome {
        AddPhrasesOutcome::Added(report) => {
            observability::record_phrases_added(report.groups_count, report.phrases_count);
            responses::phrases_added(ctx.texts(), report, name)
        }
        AddPhrasesOutcome::Rejected(error) => responses::phrase_input_error(ctx.texts(), error),
    }
}

async fn add_phrase_groups(
    ctx: &HandlerContext<'_>,
    msg: &Message,
    profile: &Profile,
    text: &str,
) -> Result<Response> {
    let dictionary = match writable_dictionary(ctx, profile).await? {
        Ok(dictionary) => dictionary,
        Err(response) => return Ok(response),
    };

    let outcome = phrases::add_phrase_groups(
        ctx.pool,
        profile.user_id,
        dictionary.id,
        text,
        Some(source_of(msg)),
    )
    .await?;
    Ok(outcome_response(ctx, &outcome, &dictionary.name))
}

/// Entry point for edited messages: the phrases created from the original
/// text are replaced by the new text
pub async fn edited_message_handler(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let span = observability::telegram_span(
        "edited_message_handler",
        msg.from.as_ref().map(|u| u.id.0 as i64),
    );
    handle_edited_message(&bot, &msg, &state).instrument(span).await
}

async fn handle_edited_message(bot: &Bot, msg: &Message, state: &AppState) -> Result<()> {
    let start_time = std::time::Instant::now();
    observability::record_telegram_message("edited");

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let ctx = state.context(bot, language_code(msg));
    let identity = chat_identity(&msg.chat, language_code(msg));

    let result = async {
        let profile = db::get_or_create_user_profile(ctx.pool, &identity).await?;
        let dictionary = match writable_dictionary(&ctx, &profile).await? {
            Ok(dictionary) => dictionary,
            Err(_) => {
                debug!(chat_id = %msg.chat.id, "Edited message without a writable dictionary");
                return Ok(());
            }
        };

        let outcome =
            phrases::replace_phrase_groups(ctx.pool, profile.user_id, dictionary.id, text, source_of(msg))
                .await?;
        match outcome {
            Some(outcome) => {
                outcome_response(&ctx, &outcome, &dictionary.name)
                    .answer_to(&ctx, msg.chat.id.0, text)
                    .await
            }
            None => Ok(()),
        }
    }
    .await;

    finish("edited", msg, start_time, result)
}
