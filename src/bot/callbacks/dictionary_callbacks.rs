//! Dictionary list, detail, contents and deletion callbacks

use anyhow::Result;
use tracing::info;

use super::super::responses::{self, CallbackTarget, DictionaryDetail, Response};
use super::super::HandlerContext;
use crate::db::{self, Profile};
use crate::dictionary::{self, Dictionary};
use crate::language;
use crate::permissions::{self, Permission};
use crate::phrases;
use crate::stats;

/// Dictionary picker for the user, below an optional header
pub async fn dict_list_response(
    ctx: &HandlerContext<'_>,
    user_id: i64,
    header: Option<&str>,
) -> Result<Response> {
    let dictionaries = dictionary::dictionaries_for_user(ctx.pool, user_id).await?;
    Ok(responses::dict_list(
        ctx.texts(),
        &dictionaries,
        header,
        ctx.training.dict_list_limit,
    ))
}

/// Detail screen of a dictionary; selects it as the profile's current one
pub async fn dictionary_detail_response(
    ctx: &HandlerContext<'_>,
    profile: &mut Profile,
    dictionary: Dictionary,
) -> Result<Response> {
    db::set_current_dict(ctx.pool, profile, Some(dictionary.id)).await?;

    let user_id = profile.user_id;
    let entries_count = dictionary::phrase_groups_count(ctx.pool, dictionary.id).await?;
    let overall = stats::dictionary_progress(ctx.pool, user_id, dictionary.id, None).await?;

    let languages = dictionary::dictionary_languages(ctx.pool, dictionary.id).await?;
    let mut per_language = Vec::with_capacity(languages.len());
    for lang in &languages {
        let progress = stats::dictionary_progress(ctx.pool, user_id, dictionary.id, Some(lang.id)).await?;
        per_language.push((lang.clone(), progress));
    }

    let can_delete = permissions::has_permission(
        ctx.pool,
        user_id,
        dictionary.id,
        Permission::DeleteDictionary,
    )
    .await?;

    let detail = DictionaryDetail {
        combinations: dictionary::language_pairs(&languages),
        dictionary,
        entries_count,
        overall,
        per_language,
        can_delete,
        page_size: ctx.training.contents_page_size,
    };
    Ok(responses::dictionary_detail(ctx.texts(), &detail))
}

/// Handle `list_dicts`
pub async fn handle_list_dicts(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
) -> Result<()> {
    dict_list_response(ctx, profile.user_id, None)
        .await?
        .replace_prev(ctx, target)
        .await
}

async fn not_found(ctx: &HandlerContext<'_>, target: &CallbackTarget, profile: &Profile, key: &str) -> Result<()> {
    let header = ctx.texts().get(key);
    dict_list_response(ctx, profile.user_id, Some(&header))
        .await?
        .replace_prev(ctx, target)
        .await
}

/// Handle `select_dictionary`
pub async fn handle_select_dictionary(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &mut Profile,
    dict_id: i64,
) -> Result<()> {
    match ctx
        .dictionary_with_permission(profile.user_id, dict_id, Permission::ViewDictionary)
        .await?
    {
        Some(dictionary) => {
            dictionary_detail_response(ctx, profile, dictionary)
                .await?
                .replace_prev(ctx, target)
                .await
        }
        None => not_found(ctx, target, profile, "dict-not-found").await,
    }
}

/// Handle `dict_contents`
#[allow(clippy::too_many_arguments)]
pub async fn handle_dict_contents(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
    offset: i64,
    count: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<()> {
    let dictionary = ctx
        .dictionary_with_permission(profile.user_id, dict_id, Permission::ViewDictionary)
        .await?;
    let src = language::get_language(ctx.pool, src_lang_id).await?;
    let dst = language::get_language(ctx.pool, dst_lang_id).await?;

    let (Some(dictionary), Some(src), Some(dst)) = (dictionary, src, dst) else {
        return not_found(ctx, target, profile, "dict-or-language-not-found").await;
    };

    let count = count.min(ctx.training.contents_page_size.max(1));
    let page = dictionary::dictionary_contents(ctx.pool, dictionary.id, src.id, dst.id, offset, count).await?;

    let mut lines = Vec::with_capacity(page.phrases.len());
    for (phrase_id, text) in &page.phrases {
        let translations = phrases::translations(ctx.pool, *phrase_id, dst.id).await?;
        lines.push(phrases::format_translations(text, &translations));
    }

    responses::dict_contents(ctx.texts(), &dictionary, &src, &dst, &page, &lines)
        .replace_prev(ctx, target)
        .await
}

/// Handle `delete_dictionary_request`
pub async fn handle_delete_dictionary_request(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
) -> Result<()> {
    match ctx
        .dictionary_with_permission(profile.user_id, dict_id, Permission::DeleteDictionary)
        .await?
    {
        Some(dictionary) => {
            responses::delete_dictionary_request(ctx.texts(), &dictionary)
                .replace_prev(ctx, target)
                .await
        }
        None => not_found(ctx, target, profile, "dict-not-found").await,
    }
}

/// Handle `dict_delete_confirm`
pub async fn handle_dict_delete_confirm(
    ctx: &HandlerContext<'_>,
    target: &CallbackTarget,
    profile: &Profile,
    dict_id: i64,
) -> Result<()> {
    let key = match ctx
        .dictionary_with_permission(profile.user_id, dict_id, Permission::DeleteDictionary)
        .await?
    {
        Some(dictionary) => {
            dictionary::delete_dictionary(ctx.pool, dictionary.id).await?;
            info!(user_id = %profile.user_id, dictionary_id = %dictionary.id, "Dictionary deleted by user");
            "dict-deleted"
        }
        None => "dict-not-found",
    };
    not_found(ctx, target, profile, key).await
}
