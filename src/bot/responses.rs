//! Outgoing responses.
//!
//! A [`Response`] is built from domain data by the builder functions below and
//! delivered in one of three ways: as a new message answering a message, as a
//! new message in the chat of a callback, or by editing the message whose
//! button was pressed. Every delivery is recorded as a log entry.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::html;
use tracing::debug;

use super::commands::commands_as_text;
use super::ui_builder;
use super::HandlerContext;
use crate::db;
use crate::dictionary::{ContentsPage, Dictionary, DictionaryError};
use crate::errors::error_logging;
use crate::language::Language;
use crate::localization::{t_lang, t_owned_args_lang, LocalizationManager};
use crate::phrases::{AddReport, Phrase, PhraseInputError};
use crate::stats::{Counters, Progress};
use crate::transport::{is_message_not_modified, with_retry};

/// Localized texts in one user's language
#[derive(Clone, Copy)]
pub struct Texts<'a> {
    pub localization: &'a LocalizationManager,
    pub language_code: Option<&'a str>,
}

impl<'a> Texts<'a> {
    pub fn new(localization: &'a LocalizationManager, language_code: Option<&'a str>) -> Self {
        Self {
            localization,
            language_code,
        }
    }

    pub fn get(&self, key: &str) -> String {
        t_lang(self.localization, key, self.language_code)
    }

    pub fn args(&self, key: &str, args: &[(&str, String)]) -> String {
        t_owned_args_lang(self.localization, key, args, self.language_code)
    }
}

/// The message a pressed inline button belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub chat_id: i64,
    pub message_id: i32,
    /// Raw callback payload, logged as the inbound text
    pub data: String,
}

/// Text and optional inline keyboard to send
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
    pub parse_mode: Option<ParseMode>,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            parse_mode: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Html);
        self
    }

    async fn send(&self, ctx: &HandlerContext<'_>, chat_id: i64) -> Result<()> {
        with_retry("send_message", Some(chat_id), ctx.retry, || {
            let mut request = ctx.bot.send_message(ChatId(chat_id), self.text.clone());
            if let Some(keyboard) = &self.keyboard {
                request = request.reply_markup(keyboard.clone());
            }
            if let Some(mode) = self.parse_mode {
                request = request.parse_mode(mode);
            }
            async move { request.await }
        })
        .await?;
        Ok(())
    }

    /// Edit an existing message to this response; an unchanged message is
    /// not an error. Nothing is logged.
    pub async fn edit_message(&self, ctx: &HandlerContext<'_>, chat_id: i64, message_id: i32) -> Result<()> {
        let result = with_retry("edit_message_text", Some(chat_id), ctx.retry, || {
            let mut request =
                ctx.bot
                    .edit_message_text(ChatId(chat_id), MessageId(message_id), self.text.clone());
            if let Some(keyboard) = &self.keyboard {
                request = request.reply_markup(keyboard.clone());
            }
            if let Some(mode) = self.parse_mode {
                request = request.parse_mode(mode);
            }
            async move { request.await }
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified(&e) => {
                debug!(chat_id = %chat_id, message_id = %message_id, "Message not modified");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn log(&self, ctx: &HandlerContext<'_>, chat_id: i64, inbound: &str) {
        if let Err(e) = db::create_log_entry(ctx.pool, chat_id, inbound, &self.text).await {
            error_logging::log_database_error(&e, "create_log_entry", Some(chat_id));
        }
    }

    /// Reply to a message with a new message
    pub async fn answer_to(&self, ctx: &HandlerContext<'_>, chat_id: i64, inbound: &str) -> Result<()> {
        self.send(ctx, chat_id).await?;
        self.log(ctx, chat_id, inbound).await;
        Ok(())
    }

    /// Send a new message into the chat of a pressed button
    pub async fn answer_to_callback(&self, ctx: &HandlerContext<'_>, target: &CallbackTarget) -> Result<()> {
        self.send(ctx, target.chat_id).await?;
        self.log(ctx, target.chat_id, &target.data).await;
        Ok(())
    }

    /// Replace the message of a pressed button
    pub async fn replace_prev(&self, ctx: &HandlerContext<'_>, target: &CallbackTarget) -> Result<()> {
        self.edit_message(ctx, target.chat_id, target.message_id).await?;
        self.log(ctx, target.chat_id, &target.data).await;
        Ok(())
    }
}

fn with_header(header: Option<&str>, body: String) -> String {
    match header {
        Some(header) => format!("{}\n{}", header, body),
        None => body,
    }
}

/// Command list, optionally below a header line
pub fn commands_list(texts: Texts<'_>, header: Option<&str>) -> Response {
    Response::new(with_header(
        header,
        commands_as_text(texts.localization, texts.language_code),
    ))
}

/// Help text followed by the command list
pub fn help(texts: Texts<'_>) -> Response {
    commands_list(texts, Some(texts.get("help-text").as_str()))
}

/// Hint shown when the user has no dictionaries
pub fn dict_list_empty(texts: Texts<'_>) -> Response {
    Response::new(texts.args("dict-list-empty", &[("command", "/create_dict".to_string())]))
}

/// Dictionary picker, or the empty hint when there is nothing to pick
pub fn dict_list(texts: Texts<'_>, dictionaries: &[Dictionary], header: Option<&str>, limit: usize) -> Response {
    if dictionaries.is_empty() {
        return dict_list_empty(texts);
    }

    Response::new(with_header(header, texts.get("dict-list-select")))
        .with_keyboard(ui_builder::dict_list_keyboard(dictionaries, limit))
}

/// Everything shown on the dictionary detail screen
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryDetail {
    pub dictionary: Dictionary,
    pub entries_count: i64,
    pub overall: Progress,
    pub per_language: Vec<(Language, Progress)>,
    pub combinations: Vec<(Language, Language)>,
    pub can_delete: bool,
    pub page_size: i64,
}

fn progress_line(texts: Texts<'_>, label: &str, progress: &Progress) -> String {
    texts.args(
        "dict-detail-progress-line",
        &[
            ("label", label.to_string()),
            ("trained", progress.trained_phrases_count.to_string()),
            ("total", progress.phrases_count.to_string()),
            ("percent", progress.percent().to_string()),
        ],
    )
}

pub fn dictionary_detail(texts: Texts<'_>, detail: &DictionaryDetail) -> Response {
    let mut lines = vec![
        texts.args(
            "dict-detail-title",
            &[("name", html::escape(&detail.dictionary.name))],
        ),
        texts.args(
            "dict-detail-entries",
            &[("count", detail.entries_count.to_string())],
        ),
        texts.get("dict-detail-progress"),
        progress_line(texts, &texts.get("dict-detail-progress-all"), &detail.overall),
    ];

    for (language, progress) in &detail.per_language {
        lines.push(progress_line(texts, &language.name, progress));
    }
    lines.push(texts.get("dict-detail-prompt"));

    Response::new(lines.join("\n"))
        .html()
        .with_keyboard(ui_builder::dictionary_actions_keyboard(
            texts,
            detail.dictionary.id,
            &detail.combinations,
            detail.can_delete,
            detail.page_size,
        ))
}

pub fn create_dictionary_input(texts: Texts<'_>) -> Response {
    Response::new(texts.get("dict-create-prompt"))
}

/// Why the name was rejected; the user stays in the name prompt
pub fn dictionary_error(texts: Texts<'_>, error: &DictionaryError) -> Response {
    Response::new(texts.args(error.message_key(), &error.message_args()))
}

pub fn delete_dictionary_request(texts: Texts<'_>, dictionary: &Dictionary) -> Response {
    Response::new(texts.args(
        "dict-delete-confirm",
        &[("name", html::escape(&dictionary.name))],
    ))
    .html()
    .with_keyboard(ui_builder::delete_confirm_keyboard(texts, dictionary.id))
}

/// Telegram rejects longer message texts; counted in UTF-16 code units
pub const MAX_MESSAGE_LEN: usize = 4096;

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Longest prefix of `text` within `max` UTF-16 code units, marked with an
/// ellipsis when cut
fn truncate_utf16(text: &str, max: usize) -> String {
    if utf16_len(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        if used + c.len_utf16() + 1 > max {
            break;
        }
        used += c.len_utf16();
        out.push(c);
    }
    out.push('…');
    out
}

/// One contents page; `lines` are `text - translations` per phrase.
///
/// Lines that would push the message past [`MAX_MESSAGE_LEN`] are left for
/// the next page, and a single line too long on its own is cut.
pub fn dict_contents(
    texts: Texts<'_>,
    dictionary: &Dictionary,
    src: &Language,
    dst: &Language,
    page: &ContentsPage,
    lines: &[String],
) -> Response {
    let title = |shown: usize| {
        texts.args(
            "dict-contents-title",
            &[
                ("name", dictionary.name.clone()),
                ("src", src.short_label()),
                ("dst", dst.short_label()),
                ("from", (page.offset + 1).min(page.total).to_string()),
                ("to", (page.offset + shown as i64).to_string()),
                ("total", page.total.to_string()),
            ],
        )
    };

    // The title only gets shorter when fewer lines are shown
    let budget = MAX_MESSAGE_LEN.saturating_sub(utf16_len(&title(lines.len())));
    let mut shown = Vec::with_capacity(lines.len());
    let mut used = 0;
    for line in lines {
        let cost = 1 + utf16_len(line);
        if used + cost <= budget {
            shown.push(line.clone());
            used += cost;
            continue;
        }
        if shown.is_empty() {
            shown.push(truncate_utf16(line, budget.saturating_sub(1)));
        }
        break;
    }

    let page = if shown.len() < lines.len() {
        page.showing(shown.len())
    } else {
        page.clone()
    };

    let mut text = vec![title(shown.len())];
    if shown.is_empty() {
        text.push(texts.get("dict-contents-empty"));
    } else {
        text.extend(shown);
    }

    Response::new(text.join("\n")).with_keyboard(ui_builder::contents_keyboard(
        texts,
        dictionary.id,
        src.id,
        dst.id,
        &page,
    ))
}

/// The phrase to translate, with Yes/No/Done buttons
pub fn training_question(texts: Texts<'_>, dictionary_id: i64, phrase: &Phrase, dst_lang_id: i64) -> Response {
    Response::new(phrase.text.clone()).with_keyboard(ui_builder::training_keyboard(
        texts,
        dictionary_id,
        phrase.id,
        dst_lang_id,
    ))
}

/// Session results
pub fn training_done(texts: Texts<'_>, dictionary_id: i64, counters: &Counters) -> Response {
    let lines = [
        texts.get("training-results"),
        texts.args(
            "training-results-trained",
            &[("count", counters.trained_count.to_string())],
        ),
        texts.args(
            "training-results-guessed",
            &[("percent", counters.guessed_percent().to_string())],
        ),
    ];
    Response::new(lines.join("\n"))
        .with_keyboard(ui_builder::back_to_dict_keyboard(texts, dictionary_id))
}

/// Report of a successful add
pub fn phrases_added(texts: Texts<'_>, report: &AddReport, dictionary_name: &str) -> Response {
    Response::new(texts.args(
        "phrases-added",
        &[
            ("groups", report.groups_count.to_string()),
            ("phrases", report.phrases_count.to_string()),
            ("name", dictionary_name.to_string()),
        ],
    ))
}

/// Malformed phrase input, with the failing line when known
pub fn phrase_input_error(texts: Texts<'_>, error: &PhraseInputError) -> Response {
    let message = texts.args(error.message_key(), &error.message_args());
    let text = match error.line() {
        Some(line) => texts.args(
            "phrase-error-on-line",
            &[("line", line.to_string()), ("error", message)],
        ),
        None => message,
    };
    Response::new(text)
}
