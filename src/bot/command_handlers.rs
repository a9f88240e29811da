//! Command Handlers module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use tracing::debug;

use super::callbacks::dictionary_callbacks::{dict_list_response, dictionary_detail_response};
use super::commands::Command;
use super::responses;
use super::HandlerContext;
use crate::db::{self, Profile};
use crate::permissions::Permission;

/// Run a parsed command for the profile; the profile state was already moved
/// by the command text
pub async fn handle_command(
    ctx: &HandlerContext<'_>,
    msg: &Message,
    command: Command,
    profile: &mut Profile,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, command = %command.name(), "Handling command");

    match command {
        Command::Start => handle_start_command(ctx, msg, profile).await,
        Command::CreateDict => handle_create_dict_command(ctx, msg).await,
        Command::ListDicts => handle_list_dicts_command(ctx, msg, profile).await,
        Command::DictDetail => handle_dict_detail_command(ctx, msg, profile).await,
        Command::Help => handle_help_command(ctx, msg).await,
    }
}

fn inbound(msg: &Message) -> &str {
    msg.text().unwrap_or_default()
}

/// Handle the /start command
pub async fn handle_start_command(ctx: &HandlerContext<'_>, msg: &Message, profile: &Profile) -> Result<()> {
    let first_name = match db::get_user_by_id(ctx.pool, profile.user_id).await? {
        Some(user) if !user.first_name.is_empty() => user.first_name,
        Some(user) => user.username,
        None => String::new(),
    };
    let greeting = ctx.texts().args("start-greeting", &[("name", first_name)]);

    responses::commands_list(ctx.texts(), Some(&greeting))
        .answer_to(ctx, msg.chat.id.0, inbound(msg))
        .await
}

/// Handle the /create_dict command
pub async fn handle_create_dict_command(ctx: &HandlerContext<'_>, msg: &Message) -> Result<()> {
    responses::create_dictionary_input(ctx.texts())
        .answer_to(ctx, msg.chat.id.0, inbound(msg))
        .await
}

/// Handle the /list_dicts command
pub async fn handle_list_dicts_command(ctx: &HandlerContext<'_>, msg: &Message, profile: &Profile) -> Result<()> {
    dict_list_response(ctx, profile.user_id, None)
        .await?
        .answer_to(ctx, msg.chat.id.0, inbound(msg))
        .await
}

/// Handle the /dict_detail command: the current dictionary, or the list to
/// pick one from
pub async fn handle_dict_detail_command(
    ctx: &HandlerContext<'_>,
    msg: &Message,
    profile: &mut Profile,
) -> Result<()> {
    let current = match profile.current_dict_id {
        Some(dict_id) => {
            ctx.dictionary_with_permission(profile.user_id, dict_id, Permission::ViewDictionary)
                .await?
        }
        None => None,
    };

    let response = match current {
        Some(dictionary) => dictionary_detail_response(ctx, profile, dictionary).await?,
        None => dict_list_response(ctx, profile.user_id, None).await?,
    };
    response.answer_to(ctx, msg.chat.id.0, inbound(msg)).await
}

/// Handle the /help command
pub async fn handle_help_command(ctx: &HandlerContext<'_>, msg: &Message) -> Result<()> {
    responses::help(ctx.texts())
        .answer_to(ctx, msg.chat.id.0, inbound(msg))
        .await
}
