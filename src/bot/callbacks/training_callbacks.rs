//! Training session callbacks: start, answer, finish

use anyhow::Result;
use tracing::{debug, info};

use super::super::responses::{self, CallbackTarget, Response};
use super::super::HandlerContext;
use super::dictionary_callbacks::dict_list_response;
use crate::db::Profile;
use crate::dictionary::{self, Dictionary};
use crate::language;
use crate::observability;
use crate::permissions::Permission;
use crate::phrases;
use crate::stats::{self, StatKind};
use crate::training;

/// Next question for the pair, or the dictionary list when nothing is left
async fn next_question(
    ctx: &HandlerContext<'_>,
    profile: &Profile,
    dictionary: &Dictionary,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<Response> {
    let next = training::next_phrase_for_training(
        ctx.pool,
        ctx.recent,
        profile.user_id,
        dictionary.id,
        src_lang_id,
        dst_lang_id,
    )
    .await?;

    let phrase = match next {
        Some(phrase_id) => phrases::get_phrase_in_dictionary(ctx.pool, phrase_id, dictionary.id).await?,
        None => None,
    };

    match phrase {
        Some(phrase) => Ok(responses::training_question(
            ctx.texts(),
            dictionary.id,
            &phrase,
            dst_lang_id,
        )),
        None => not_found_response(ctx, profile, "no-phrases-available").await,
    }
}

/// The dictionary to train on, if the user may view it
async fn training_dictionary(
    ctx: &HandlerContext<'_>,
    profile: &Profile,
    dict_id: i64,
) -> Result<Option<Dictionary>> {
    ctx.dictionary_with_permission(profile.user_id, dict_id, Permission::ViewDictionary)
        .await
}

async fn not_found_response(ctx: &HandlerContext<'_>, profile: &Profile, key: &str) -> Result<Response> {
    let header = ctx.texts().get(key);
    dict_list_response(ctx, profile.user_id, Some(&header)).await
}

/// Handle `dict_training`: reset the session counters and ask the first question
pub async fn handle_dict_training(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<()> {
    let dictionary = training_dictionary(ctx, profile, dict_id).await?;
    let src = language::get_language(ctx.pool, src_lang_id).await?;
    let dst = language::get_language(ctx.pool, dst_lang_id).await?;
    let (Some(dictionary), Some(_), Some(_)) = (dictionary, src, dst) else {
        return not_found_response(ctx, profile, "dict-or-language-not-found")
            .await?
            .replace_prev(ctx, target)
            .await;
    };

    stats::reset_training_stat(ctx.pool, profile.user_id, dictionary.id).await?;
    info!(
        user_id = %profile.user_id,
        dictionary_id = %dictionary.id,
        src_lang_id = %src_lang_id,
        dst_lang_id = %dst_lang_id,
        "Training started"
    );

    next_question(ctx, profile, &dictionary, src_lang_id, dst_lang_id)
        .await?
        .answer_to_callback(ctx, target)
        .await
}

/// Handle `dict_training_phrase`: record the answer, reveal the translations
/// in place and move on
pub async fn handle_dict_training_phrase(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
    phrase_id: i64,
    dst_lang_id: i64,
    is_guessed: bool,
) -> Result<()> {
    let dictionary = training_dictionary(ctx, profile, dict_id).await?;
    let phrase = match &dictionary {
        Some(dictionary) => phrases::get_phrase_in_dictionary(ctx.pool, phrase_id, dictionary.id).await?,
        None => None,
    };
    let dst = language::get_language(ctx.pool, dst_lang_id).await?;

    let (Some(dictionary), Some(phrase), Some(_)) = (dictionary, phrase, dst) else {
        debug!(phrase_id = %phrase_id, dictionary_id = %dict_id, "Answered phrase is gone");
        return not_found_response(ctx, profile, "language-or-phrase-not-found")
            .await?
            .replace_prev(ctx, target)
            .await;
    };

    stats::record_answer(ctx.pool, profile.user_id, dictionary.id, phrase.id, is_guessed).await?;
    observability::record_training_answer(is_guessed);

    let revealed = phrases::verbose_translations(ctx.pool, &phrase, dst_lang_id).await?;
    Response::new(revealed)
        .edit_message(ctx, target.chat_id, target.message_id)
        .await?;

    let counters =
        stats::dictionary_counters(ctx.pool, profile.user_id, dictionary.id, StatKind::Training).await?;
    let spanning =
        dictionary::groups_spanning_both(ctx.pool, dictionary.id, phrase.lang_id, dst_lang_id).await?;

    let response = if stats::is_training_completed(counters.trained_count, spanning) {
        responses::training_done(ctx.texts(), dictionary.id, &counters)
    } else {
        next_question(ctx, profile, &dictionary, phrase.lang_id, dst_lang_id).await?
    };
    response.answer_to_callback(ctx, target).await
}

/// Handle `training_done`: show the session counters
pub async fn handle_training_done(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
) -> Result<()> {
    let Some(dictionary) = training_dictionary(ctx, profile, dict_id).await? else {
        return not_found_response(ctx, profile, "dict-not-found")
            .await?
            .answer_to_callback(ctx, target)
            .await;
    };

    let counters =
        stats::dictionary_counters(ctx.pool, profile.user_id, dictionary.id, StatKind::Training).await?;
    responses::training_done(ctx.texts(), dictionary.id, &counters)
        .answer_to_callback(ctx, target)
        .await
}
