//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, warn, Instrument};

use super::callback_data::CallbackAction;
use super::{dictionary_callbacks, training_callbacks};
use crate::bot::responses::{self, CallbackTarget};
use crate::bot::{chat_identity, AppState, HandlerContext};
use crate::db::Profile;
use crate::errors::error_logging;
use crate::observability;
use crate::transport::with_retry;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> Result<()> {
    let span = observability::telegram_span("callback_handler", Some(q.from.id.0 as i64));
    handle_callback(&bot, &q, &state).instrument(span).await
}

async fn handle_callback(bot: &Bot, q: &CallbackQuery, state: &AppState) -> Result<()> {
    let start_time = std::time::Instant::now();
    observability::record_telegram_message("callback");

    let ctx = state.context(bot, q.from.language_code.as_deref());

    let result = match &q.message {
        Some(message) => {
            let target = CallbackTarget {
                chat_id: message.chat().id.0,
                message_id: message.id().0,
                data: q.data.clone().unwrap_or_default(),
            };
            let identity = chat_identity(message.chat(), q.from.language_code.as_deref());
            match ctx.enter_profile(&identity, &target.data).await {
                Ok(mut profile) => {
                    answer_query(&ctx, q).await;
                    route(&ctx, &target, &mut profile).await
                }
                Err(e) => Err(e),
            }
        }
        None => {
            debug!(user_id = %q.from.id, "Callback without an accessible message");
            answer_query(&ctx, q).await;
            Ok(())
        }
    };

    let status = if result.is_ok() { 200 } else { 500 };
    observability::record_request_metrics("callback", status, start_time.elapsed());
    if let Err(e) = &result {
        error_logging::log_internal_error(e, "callback_handler", "route", Some(q.from.id.0 as i64));
        observability::record_error_metrics("callback", "callback_handler");
    }

    result
}

/// Stop the button's loading indicator; failure only costs the spinner
async fn answer_query(ctx: &HandlerContext<'_>, q: &CallbackQuery) {
    let answered = with_retry("answer_callback_query", None, ctx.retry, || {
        let request = ctx.bot.answer_callback_query(q.id.clone());
        async move { request.await }
    })
    .await;
    if let Err(e) = answered {
        warn!(error = %e, "Failed to answer callback query");
    }
}

async fn route(ctx: &HandlerContext<'_>, target: &CallbackTarget, profile: &mut Profile) -> Result<()> {
    let action = match CallbackAction::decode(&target.data) {
        Ok(action) => action,
        Err(e) => {
            warn!(chat_id = %target.chat_id, data = %target.data, error = %e, "Invalid callback payload");
            let header = ctx.texts().get("callback-invalid");
            return responses::commands_list(ctx.texts(), Some(&header))
                .answer_to_callback(ctx, target)
                .await;
        }
    };

    debug!(chat_id = %target.chat_id, handler = %action.tag(), "Routing callback");

    match action {
        CallbackAction::ListDicts => dictionary_callbacks::handle_list_dicts(ctx, target, profile).await,
        CallbackAction::SelectDictionary { dict_id } => {
            dictionary_callbacks::handle_select_dictionary(ctx, target, profile, dict_id).await
        }
        CallbackAction::DictContents {
            dict_id,
            offset,
            count,
            src_lang_id,
            dst_lang_id,
        } => {
            dictionary_callbacks::handle_dict_contents(
                ctx,
                target,
                profile,
                dict_id,
                offset,
                count,
                src_lang_id,
                dst_lang_id,
            )
            .await
        }
        CallbackAction::DeleteDictionaryRequest { dict_id } => {
            dictionary_callbacks::handle_delete_dictionary_request(ctx, target, profile, dict_id).await
        }
        CallbackAction::DictDeleteConfirm { dict_id } => {
            dictionary_callbacks::handle_dict_delete_confirm(ctx, target, profile, dict_id).await
        }
        CallbackAction::DictTraining {
            dict_id,
            src_lang_id,
            dst_lang_id,
        } => {
            training_callbacks::handle_dict_training(ctx, target, profile, dict_id, src_lang_id, dst_lang_id)
                .await
        }
        CallbackAction::DictTrainingPhrase {
            dict_id,
            phrase_id,
            dst_lang_id,
            is_guessed,
        } => {
            training_callbacks::handle_dict_training_phrase(
                ctx,
                target,
                profile,
                dict_id,
                phrase_id,
                dst_lang_id,
                is_guessed,
            )
            .await
        }
        CallbackAction::TrainingDone { dict_id } => {
            training_callbacks::handle_training_done(ctx, target, profile, dict_id).await
        }
        CallbackAction::Noop => Ok(()),
    }
}
