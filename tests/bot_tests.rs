//! # Bot Response Tests
//!
//! Response builders and keyboards, checked without talking to Telegram.

use chrono::Utc;
use dictrainer::bot::callbacks::callback_data::CallbackAction;
use dictrainer::bot::commands::Command;
use dictrainer::bot::responses::{self, DictionaryDetail, Texts};
use dictrainer::dialogue::ProfileState;
use dictrainer::dictionary::{ContentsPage, Dictionary, DictionaryError};
use dictrainer::language::Language;
use dictrainer::localization::LocalizationManager;
use dictrainer::phrases::{parse_phrase_groups, AddReport, Phrase};
use dictrainer::stats::{Counters, Progress};
use std::path::PathBuf;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup, ParseMode};

fn localization() -> LocalizationManager {
    LocalizationManager::from_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("locales"))
        .expect("Failed to load catalogs")
}

fn dictionary(id: i64, name: &str) -> Dictionary {
    Dictionary {
        id,
        name: name.to_string(),
        user_id: 1,
        created_at: Utc::now(),
    }
}

fn language(id: i64, code: &str, name: &str) -> Language {
    Language {
        id,
        name: name.to_string(),
        code: code.to_string(),
        code_aliases: String::new(),
        priority: 0,
    }
}

fn actions(keyboard: &InlineKeyboardMarkup) -> Vec<Vec<CallbackAction>> {
    keyboard
        .inline_keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.kind {
                    InlineKeyboardButtonKind::CallbackData(data) => {
                        CallbackAction::decode(data).expect("button payload must decode")
                    }
                    other => panic!("unexpected button kind {other:?}"),
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_dict_list_is_limited_and_paired() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let dictionaries: Vec<Dictionary> = (1..=8).map(|id| dictionary(id, &format!("D{id}"))).collect();

    let response = responses::dict_list(texts, &dictionaries, Some("Dictionary deleted."), 6);
    assert_eq!(response.text, "Dictionary deleted.\nSelect active dictionary:");

    let rows = actions(response.keyboard.as_ref().unwrap());
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == 2));
    assert_eq!(rows[0][0], CallbackAction::SelectDictionary { dict_id: 1 });
    assert_eq!(rows[2][1], CallbackAction::SelectDictionary { dict_id: 6 });
}

#[test]
fn test_empty_dict_list_hints_create_command() {
    let manager = localization();
    let response = responses::dict_list(Texts::new(&manager, None), &[], None, 6);
    assert!(response.text.contains("/create_dict"));
    assert!(response.keyboard.is_none());
}

#[test]
fn test_dictionary_detail_actions() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let en = language(1, "en", "English");
    let ru = language(2, "ru", "Russian");

    let detail = DictionaryDetail {
        dictionary: dictionary(9, "Food & drinks"),
        entries_count: 4,
        overall: Progress::new(2, 8),
        per_language: vec![(en.clone(), Progress::new(1, 4)), (ru.clone(), Progress::new(1, 4))],
        combinations: vec![(en.clone(), ru.clone()), (ru, en)],
        can_delete: false,
        page_size: 20,
    };
    let response = responses::dictionary_detail(texts, &detail);

    assert_eq!(response.parse_mode, Some(ParseMode::Html));
    assert!(response.text.contains("<b>Food &amp; drinks</b>"));
    assert!(response.text.contains("4 entries"));
    assert!(response.text.contains("all languages: 2 of 8 (25%)"));

    let rows = actions(response.keyboard.as_ref().unwrap());
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        vec![
            CallbackAction::DictTraining {
                dict_id: 9,
                src_lang_id: 1,
                dst_lang_id: 2
            },
            CallbackAction::DictContents {
                dict_id: 9,
                offset: 0,
                count: 20,
                src_lang_id: 1,
                dst_lang_id: 2
            },
        ]
    );
    // No delete button without the permission
    assert_eq!(rows[2], vec![CallbackAction::ListDicts]);
}

#[test]
fn test_contents_page_navigation_buttons() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let page = ContentsPage {
        phrases: vec![(1, "cat".to_string()), (2, "dog".to_string())],
        total: 6,
        offset: 2,
        count: 2,
    };
    let lines = vec!["cat - кот".to_string(), "dog - собака".to_string()];
    let response = responses::dict_contents(
        texts,
        &dictionary(3, "Pets"),
        &language(1, "en", "English"),
        &language(2, "ru", "Russian"),
        &page,
        &lines,
    );

    assert_eq!(response.text, "Pets (EN - RU), 3-4 of 6:\ncat - кот\ndog - собака");
    let rows = actions(response.keyboard.as_ref().unwrap());
    assert_eq!(rows[0].len(), 2);
    assert!(matches!(rows[0][0], CallbackAction::DictContents { offset: 0, .. }));
    assert!(matches!(rows[0][1], CallbackAction::DictContents { offset: 4, .. }));
}

#[test]
fn test_contents_page_fits_message_limit() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let page = ContentsPage {
        phrases: (0..20).map(|i| (i, "a".repeat(250))).collect(),
        total: 45,
        offset: 20,
        count: 20,
    };
    let lines: Vec<String> = (0..20)
        .map(|_| format!("{} - {}", "a".repeat(250), "я".repeat(255)))
        .collect();
    let response = responses::dict_contents(
        texts,
        &dictionary(3, "Pets"),
        &language(1, "en", "English"),
        &language(2, "ru", "Russian"),
        &page,
        &lines,
    );

    assert!(response.text.encode_utf16().count() <= responses::MAX_MESSAGE_LEN);
    let shown = response.text.lines().count() - 1;
    assert!(shown > 0 && shown < 20);
    assert!(response.text.starts_with(&format!("Pets (EN - RU), 21-{} of 45:", 20 + shown)));

    let rows = actions(response.keyboard.as_ref().unwrap());
    match &rows[0][1] {
        CallbackAction::DictContents { offset, count, .. } => {
            assert_eq!(*offset, 20 + shown as i64);
            assert_eq!(*count, shown as i64);
        }
        other => panic!("expected next page button, got {other:?}"),
    }
}

#[test]
fn test_contents_single_oversized_line_is_cut() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let page = ContentsPage {
        phrases: vec![(1, "cat".to_string()), (2, "dog".to_string())],
        total: 2,
        offset: 0,
        count: 2,
    };
    let translations = vec!["я".repeat(255); 20].join(", ");
    let lines = vec![format!("cat - {}", translations), "dog - собака".to_string()];
    let response = responses::dict_contents(
        texts,
        &dictionary(3, "Pets"),
        &language(1, "en", "English"),
        &language(2, "ru", "Russian"),
        &page,
        &lines,
    );

    assert!(response.text.encode_utf16().count() <= responses::MAX_MESSAGE_LEN);
    assert!(response.text.starts_with("Pets (EN - RU), 1-1 of 2:\ncat - я"));
    assert!(response.text.ends_with('…'));
    let rows = actions(response.keyboard.as_ref().unwrap());
    assert!(matches!(rows[0][0], CallbackAction::DictContents { offset: 1, count: 1, .. }));
}

#[test]
fn test_training_question_and_results() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));
    let phrase = Phrase {
        id: 11,
        lang_id: 1,
        user_id: 1,
        text: "cat".to_string(),
    };

    let question = responses::training_question(texts, 3, &phrase, 2);
    assert_eq!(question.text, "cat");
    let rows = actions(question.keyboard.as_ref().unwrap());
    assert_eq!(
        rows[0],
        vec![
            CallbackAction::DictTrainingPhrase {
                dict_id: 3,
                phrase_id: 11,
                dst_lang_id: 2,
                is_guessed: true
            },
            CallbackAction::DictTrainingPhrase {
                dict_id: 3,
                phrase_id: 11,
                dst_lang_id: 2,
                is_guessed: false
            },
            CallbackAction::TrainingDone { dict_id: 3 },
        ]
    );

    let counters = Counters {
        trained_count: 4,
        guessed_count: 3,
    };
    let done = responses::training_done(texts, 3, &counters);
    assert_eq!(done.text, "Training results:\nTrained 4 phrases\nGuessed: 75%");
}

#[test]
fn test_input_error_messages() {
    let manager = localization();
    let texts = Texts::new(&manager, Some("en"));

    let error = parse_phrase_groups("cat - кот\nbroken").unwrap_err();
    let response = responses::phrase_input_error(texts, &error);
    assert!(response.text.starts_with("Line 2: "));

    let response = responses::dictionary_error(
        texts,
        &DictionaryError::Exists {
            name: "Food".to_string(),
        },
    );
    assert!(response.text.contains("\"Food\" already exists"));

    let report = AddReport {
        groups_count: 1,
        phrases_count: 2,
        merged_count: 0,
    };
    let response = responses::phrases_added(texts, &report, "Food");
    assert_eq!(response.text, "Added 1 group (2 phrases) to dictionary \"Food\"");
}

#[test]
fn test_command_text_drives_profile_state() {
    assert_eq!(ProfileState::after_input("/create_dict"), ProfileState::WaitInputCreateDict);
    assert_eq!(
        ProfileState::after_input("/create_dict@dictrainer_bot"),
        ProfileState::WaitInputCreateDict
    );
    assert_eq!(ProfileState::after_input("/list_dicts"), ProfileState::WaitNothing);
    assert_eq!(ProfileState::after_input("select_dictionary:4"), ProfileState::WaitNothing);

    assert_eq!(
        Command::parse_text("/dict_detail", "dictrainer_bot"),
        Some(Command::DictDetail)
    );
}
