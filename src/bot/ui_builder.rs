//! UI Builder module for creating inline keyboards

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::callback_data::CallbackAction;
use super::responses::Texts;
use crate::dictionary::{ContentsPage, Dictionary};
use crate::language::Language;

/// Buttons per row in the dictionary list
const DICT_LIST_ROW_WIDTH: usize = 2;

/// One button per dictionary, at most `limit` of them
pub fn dict_list_keyboard(dictionaries: &[Dictionary], limit: usize) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = dictionaries
        .iter()
        .take(limit)
        .map(|d| CallbackAction::SelectDictionary { dict_id: d.id }.button(d.name.clone()))
        .collect();

    InlineKeyboardMarkup::new(buttons.chunks(DICT_LIST_ROW_WIDTH).map(|row| row.to_vec()))
}

/// Training and contents buttons per language pair, then delete and back
pub fn dictionary_actions_keyboard(
    texts: Texts<'_>,
    dictionary_id: i64,
    combinations: &[(Language, Language)],
    can_delete: bool,
    page_size: i64,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for (src, dst) in combinations {
        let pair = [
            ("src", src.short_label()),
            ("dst", dst.short_label()),
        ];
        rows.push(vec![
            CallbackAction::DictTraining {
                dict_id: dictionary_id,
                src_lang_id: src.id,
                dst_lang_id: dst.id,
            }
            .button(texts.args("button-start-training", &pair)),
            CallbackAction::DictContents {
                dict_id: dictionary_id,
                offset: 0,
                count: page_size,
                src_lang_id: src.id,
                dst_lang_id: dst.id,
            }
            .button(texts.args("button-contents", &pair)),
        ]);
    }

    let mut actions = Vec::new();
    if can_delete {
        actions.push(
            CallbackAction::DeleteDictionaryRequest {
                dict_id: dictionary_id,
            }
            .button(texts.get("button-delete")),
        );
    }
    actions.push(CallbackAction::ListDicts.button(texts.get("button-back-to-list")));
    rows.push(actions);

    InlineKeyboardMarkup::new(rows)
}

/// Confirm or cancel deleting a dictionary
pub fn delete_confirm_keyboard(texts: Texts<'_>, dictionary_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        CallbackAction::DictDeleteConfirm {
            dict_id: dictionary_id,
        }
        .button(texts.get("button-delete")),
        CallbackAction::SelectDictionary {
            dict_id: dictionary_id,
        }
        .button(texts.get("button-cancel")),
    ]])
}

/// Previous/next page buttons, then back to the dictionary
pub fn contents_keyboard(
    texts: Texts<'_>,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
    page: &ContentsPage,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    let mut navigation = Vec::new();
    if page.has_prev() {
        navigation.push(
            CallbackAction::DictContents {
                dict_id: dictionary_id,
                offset: page.prev_offset(),
                count: page.count,
                src_lang_id,
                dst_lang_id,
            }
            .button(texts.get("button-prev-page")),
        );
    }
    if page.has_next() {
        navigation.push(
            CallbackAction::DictContents {
                dict_id: dictionary_id,
                offset: page.next_offset(),
                count: page.count,
                src_lang_id,
                dst_lang_id,
            }
            .button(texts.get("button-next-page")),
        );
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    rows.push(back_to_dict_buttons(texts, dictionary_id));
    InlineKeyboardMarkup::new(rows)
}

/// Yes / No / Done under a training question
pub fn training_keyboard(
    texts: Texts<'_>,
    dictionary_id: i64,
    phrase_id: i64,
    dst_lang_id: i64,
) -> InlineKeyboardMarkup {
    let answer = |is_guessed: bool| CallbackAction::DictTrainingPhrase {
        dict_id: dictionary_id,
        phrase_id,
        dst_lang_id,
        is_guessed,
    };

    InlineKeyboardMarkup::new(vec![vec![
        answer(true).button(texts.get("button-yes")),
        answer(false).button(texts.get("button-no")),
        CallbackAction::TrainingDone {
            dict_id: dictionary_id,
        }
        .button(texts.get("button-done")),
    ]])
}

fn back_to_dict_buttons(texts: Texts<'_>, dictionary_id: i64) -> Vec<InlineKeyboardButton> {
    vec![
        CallbackAction::SelectDictionary {
            dict_id: dictionary_id,
        }
        .button(texts.get("button-dictionary-details")),
        CallbackAction::ListDicts.button(texts.get("button-back-to-list")),
    ]
}

/// Dictionary details and back to list
pub fn back_to_dict_keyboard(texts: Texts<'_>, dictionary_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_to_dict_buttons(texts, dictionary_id)])
}
