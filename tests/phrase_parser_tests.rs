//! # Phrase Parser Tests
//!
//! Parsing of `phrase - translation` input lines into language-tagged
//! phrase groups, including the error reported for each malformed shape.

use dictrainer::phrases::{
    format_translations, parse_phrase_group, parse_phrase_groups, PhraseInputError,
    MAX_PHRASE_LENGTH,
};

#[test]
fn test_single_pair_is_grouped_by_language() {
    let groups = parse_phrase_groups("cat - кот").unwrap();
    assert_eq!(groups.len(), 1);

    let group = &groups[0];
    assert_eq!(group.first.language_code, "en");
    assert_eq!(group.first.phrases, vec!["cat"]);
    assert_eq!(group.second.language_code, "ru");
    assert_eq!(group.second.phrases, vec!["кот"]);
    assert_eq!(group.phrase_count(), 2);
}

#[test]
fn test_language_order_follows_input() {
    let group = parse_phrase_group("собака - dog").unwrap();
    assert_eq!(group.first.language_code, "ru");
    assert_eq!(group.second.language_code, "en");
}

#[test]
fn test_variants_split_on_commas() {
    let group = parse_phrase_group("car, automobile - машина,  автомобиль ").unwrap();
    assert_eq!(group.first.phrases, vec!["car", "automobile"]);
    assert_eq!(group.second.phrases, vec!["машина", "автомобиль"]);
}

#[test]
fn test_capitalized_first_letter_is_lowered() {
    let group = parse_phrase_group("Cat - Кот").unwrap();
    assert_eq!(group.first.phrases, vec!["cat"]);
    assert_eq!(group.second.phrases, vec!["кот"]);

    let group = parse_phrase_group("NASA - НАСА").unwrap();
    assert_eq!(group.first.phrases, vec!["NASA"]);
    assert_eq!(group.second.phrases, vec!["НАСА"]);
}

#[test]
fn test_single_segment_is_invalid_phrase_count() {
    let error = parse_phrase_group("just a phrase").unwrap_err();
    assert_eq!(error, PhraseInputError::InvalidPhraseCount { found: 1 });

    let error = parse_phrase_groups("cat").unwrap_err();
    assert_eq!(
        error.root(),
        &PhraseInputError::InvalidPhraseCount { found: 1 }
    );
    assert_eq!(error.line(), Some(1));
}

#[test]
fn test_three_segments_are_invalid_phrase_count() {
    let error = parse_phrase_group("cat - кот - kitty").unwrap_err();
    assert_eq!(error, PhraseInputError::InvalidPhraseCount { found: 3 });
}

#[test]
fn test_blank_input_is_invalid_phrase_count() {
    let error = parse_phrase_groups(" \n\n  ").unwrap_err();
    assert_eq!(error, PhraseInputError::InvalidPhraseCount { found: 0 });
    assert_eq!(error.line(), None);
}

#[test]
fn test_same_language_on_both_sides() {
    let error = parse_phrase_group("cat - kitty").unwrap_err();
    assert_eq!(
        error,
        PhraseInputError::DuplicateLanguage {
            code: "en".to_string()
        }
    );
}

#[test]
fn test_segment_without_letters() {
    let error = parse_phrase_group("cat - 42").unwrap_err();
    assert!(matches!(error, PhraseInputError::MissingLanguage { .. }));

    let error = parse_phrase_group("cat - , ,").unwrap_err();
    assert_eq!(error, PhraseInputError::EmptySegment);
}

#[test]
fn test_overlong_phrase_is_rejected() {
    let long = "a".repeat(MAX_PHRASE_LENGTH + 1);
    let error = parse_phrase_group(&format!("{} - кот", long)).unwrap_err();
    assert!(matches!(error, PhraseInputError::PhraseTooLong { .. }));
    assert_eq!(error.message_key(), "phrase-error-too-long");
}

#[test]
fn test_multiline_input_reports_failing_line() {
    let input = "cat - кот\n\ndog - собака\nbroken line";
    let error = parse_phrase_groups(input).unwrap_err();
    assert_eq!(error.line(), Some(4));
    assert_eq!(error.message_key(), "phrase-error-count");

    let groups = parse_phrase_groups("cat - кот\n\ndog - собака").unwrap();
    assert_eq!(groups.len(), 2);
}

#[test]
fn test_format_translations_lists_all_variants() {
    let translations = vec!["кот".to_string(), "кошка".to_string()];
    assert_eq!(format_translations("cat", &translations), "cat - кот, кошка");
}
