//! Phrase-group parsing and storage.
//!
//! Users add vocabulary as lines of the form `A, A2 - B, B2`: two segments
//! separated by `" - "`, each a comma-separated list of phrases in one
//! language. Every line becomes one phrase group (a set of mutual
//! translations spanning exactly two languages).
//!
//! Parsing is pure and lives in [`parse_phrase_group`] /
//! [`parse_phrase_groups`]; the store functions persist parsed groups inside a
//! single transaction, reusing existing phrase rows and merging into an
//! existing group when the same pair is already linked.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Row, Transaction};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, Instrument};

use crate::language::{detect_language_code, Language};
use crate::observability;

/// Separator between the two language segments of a line
pub const SEGMENT_SEPARATOR: &str = " - ";

/// Maximum stored length of a phrase, in characters
pub const MAX_PHRASE_LENGTH: usize = 255;

/// Structured error for malformed phrase input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhraseInputError {
    /// The line did not split into exactly two language segments
    InvalidPhraseCount { found: usize },
    /// One of the segments contained no phrases
    EmptySegment,
    /// The language of a segment could not be detected
    MissingLanguage { segment: String },
    /// Both segments were detected as the same language
    DuplicateLanguage { code: String },
    /// The detected language is not known to the store
    UnknownLanguage { code: String },
    /// A phrase exceeds the stored length limit
    PhraseTooLong { phrase: String },
    /// An error on a specific (1-based) line of multi-line input
    LineError {
        line: usize,
        error: Box<PhraseInputError>,
    },
}

impl PhraseInputError {
    /// Localization key describing this error to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            PhraseInputError::InvalidPhraseCount { .. } => "phrase-error-count",
            PhraseInputError::EmptySegment => "phrase-error-empty-segment",
            PhraseInputError::MissingLanguage { .. } => "phrase-error-missing-language",
            PhraseInputError::DuplicateLanguage { .. } => "phrase-error-duplicate-language",
            PhraseInputError::UnknownLanguage { .. } => "phrase-error-unknown-language",
            PhraseInputError::PhraseTooLong { .. } => "phrase-error-too-long",
            PhraseInputError::LineError { error, .. } => error.message_key(),
        }
    }

    /// Arguments for the localized message
    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            PhraseInputError::InvalidPhraseCount { found } => vec![("found", found.to_string())],
            PhraseInputError::EmptySegment => Vec::new(),
            PhraseInputError::MissingLanguage { segment } => vec![("segment", segment.clone())],
            PhraseInputError::DuplicateLanguage { code }
            | PhraseInputError::UnknownLanguage { code } => vec![("code", code.clone())],
            PhraseInputError::PhraseTooLong { phrase } => {
                vec![("max", MAX_PHRASE_LENGTH.to_string()), ("phrase", phrase.clone())]
            }
            PhraseInputError::LineError { error, .. } => error.message_args(),
        }
    }

    /// The line number for multi-line input errors
    pub fn line(&self) -> Option<usize> {
        match self {
            PhraseInputError::LineError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The error without its line wrapper
    pub fn root(&self) -> &PhraseInputError {
        match self {
            PhraseInputError::LineError { error, .. } => error.root(),
            other => other,
        }
    }
}

impl fmt::Display for PhraseInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhraseInputError::InvalidPhraseCount { found } => {
                write!(f, "expected 2 language segments, found {}", found)
            }
            PhraseInputError::EmptySegment => write!(f, "a language segment is empty"),
            PhraseInputError::MissingLanguage { segment } => {
                write!(f, "cannot detect language of '{}'", segment)
            }
            PhraseInputError::DuplicateLanguage { code } => {
                write!(f, "both segments are in language '{}'", code)
            }
            PhraseInputError::UnknownLanguage { code } => write!(f, "unknown language '{}'", code),
            PhraseInputError::PhraseTooLong { phrase } => write!(
                f,
                "phrase is longer than {} characters: '{}…'",
                MAX_PHRASE_LENGTH,
                phrase.chars().take(20).collect::<String>()
            ),
            PhraseInputError::LineError { line, error } => write!(f, "line {}: {}", line, error),
        }
    }
}

impl std::error::Error for PhraseInputError {}

/// One language side of a parsed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSegment {
    pub language_code: &'static str,
    pub phrases: Vec<String>,
}

/// A parsed line: two segments in two different languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPhraseGroup {
    /// 1-based line of the input the group was read from
    pub line: usize,
    pub first: ParsedSegment,
    pub second: ParsedSegment,
}

impl ParsedPhraseGroup {
    /// Number of phrases on both sides
    pub fn phrase_count(&self) -> usize {
        self.first.phrases.len() + self.second.phrases.len()
    }

    /// Both segments in input order
    pub fn segments(&self) -> [&ParsedSegment; 2] {
        [&self.first, &self.second]
    }
}

/// Lower-case the first character when it is the only upper-case one.
///
/// Phone keyboards capitalize the first letter; genuine acronyms survive.
///
/// ```
/// use dictrainer::phrases::fix_input_uppercase;
///
/// assert_eq!(fix_input_uppercase("abc"), "abc");
/// assert_eq!(fix_input_uppercase("Abc"), "abc");
/// assert_eq!(fix_input_uppercase("ABC"), "ABC");
/// ```
pub fn fix_input_uppercase(line: &str) -> String {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    if chars.clone().any(char::is_uppercase) {
        return line.to_string();
    }

    first.to_lowercase().chain(chars).collect()
}

fn parse_segment(segment: &str) -> Result<ParsedSegment, PhraseInputError> {
    let mut phrases: Vec<String> = Vec::new();

    for item in segment.split(',') {
        let item = item.split_whitespace().collect::<Vec<_>>().join(" ");
        if item.is_empty() {
            continue;
        }
        if item.chars().count() > MAX_PHRASE_LENGTH {
            return Err(PhraseInputError::PhraseTooLong { phrase: item });
        }
        let item = fix_input_uppercase(&item);
        if !phrases.contains(&item) {
            phrases.push(item);
        }
    }

    if phrases.is_empty() {
        return Err(PhraseInputError::EmptySegment);
    }

    let language_code =
        detect_language_code(&phrases.join(" ")).ok_or_else(|| PhraseInputError::MissingLanguage {
            segment: segment.trim().to_string(),
        })?;

    Ok(ParsedSegment {
        language_code,
        phrases,
    })
}

/// Parse one line of the form `A, A2 - B, B2`
pub fn parse_phrase_group(line: &str) -> Result<ParsedPhraseGroup, PhraseInputError> {
    let segments: Vec<&str> = line.trim().split(SEGMENT_SEPARATOR).collect();
    if segments.len() != 2 {
        return Err(PhraseInputError::InvalidPhraseCount {
            found: segments.len(),
        });
    }

    let first = parse_segment(segments[0])?;
    let second = parse_segment(segments[1])?;

    if first.language_code == second.language_code {
        return Err(PhraseInputError::DuplicateLanguage {
            code: first.language_code.to_string(),
        });
    }

    Ok(ParsedPhraseGroup {
        line: 1,
        first,
        second,
    })
}

/// Parse every non-blank line; the first failing line aborts the whole input
pub fn parse_phrase_groups(input: &str) -> Result<Vec<ParsedPhraseGroup>, PhraseInputError> {
    let groups = input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_phrase_group(line)
                .map(|group| ParsedPhraseGroup {
                    line: index + 1,
                    ..group
                })
                .map_err(|error| PhraseInputError::LineError {
                    line: index + 1,
                    error: Box::new(error),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if groups.is_empty() {
        return Err(PhraseInputError::InvalidPhraseCount { found: 0 });
    }

    Ok(groups)
}

/// Resolve the detected language codes of a parsed line to stored languages
pub fn resolve_languages<'a>(
    group: &ParsedPhraseGroup,
    languages: &'a [Language],
) -> Result<[&'a Language; 2], PhraseInputError> {
    let find = |code: &str| {
        languages
            .iter()
            .find(|lang| lang.matches_code(code))
            .ok_or_else(|| PhraseInputError::UnknownLanguage {
                code: code.to_string(),
            })
    };

    Ok([
        find(group.first.language_code)?,
        find(group.second.language_code)?,
    ])
}

/// Resolve every parsed line; an unknown language is reported with the
/// input line it came from
pub fn resolve_all_languages<'g, 'l>(
    groups: &'g [ParsedPhraseGroup],
    languages: &'l [Language],
) -> Result<Vec<(&'g ParsedPhraseGroup, [&'l Language; 2])>, PhraseInputError> {
    groups
        .iter()
        .map(|group| {
            resolve_languages(group, languages)
                .map(|langs| (group, langs))
                .map_err(|error| PhraseInputError::LineError {
                    line: group.line,
                    error: Box::new(error),
                })
        })
        .collect()
}

/// Represents a phrase in the database
#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    pub id: i64,
    pub lang_id: i64,
    pub user_id: i64,
    pub text: String,
}

/// Render `text - t1, t2` for a phrase and its translations
pub fn format_translations(text: &str, translations: &[String]) -> String {
    if translations.is_empty() {
        text.to_string()
    } else {
        format!("{}{}{}", text, SEGMENT_SEPARATOR, translations.join(", "))
    }
}

/// Result of storing one parsed line
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGroup {
    pub group_id: i64,
    pub phrase_ids: Vec<i64>,
    /// True when the phrases were merged into an already existing group
    pub merged: bool,
}

/// Summary of a multi-line add
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddReport {
    pub groups_count: usize,
    pub phrases_count: usize,
    pub merged_count: usize,
}

/// Outcome of adding user input to a dictionary
#[derive(Debug, Clone, PartialEq)]
pub enum AddPhrasesOutcome {
    Added(AddReport),
    Rejected(PhraseInputError),
}

/// Telegram message that produced phrases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

async fn get_or_create_phrase(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: i64,
    lang_id: i64,
    text: &str,
) -> Result<i64> {
    let inserted = sqlx::query(
        "INSERT INTO phrases (lang_id, user_id, text) VALUES ($1, $2, $3)
         ON CONFLICT (lang_id, user_id, text) DO NOTHING RETURNING id",
    )
    .bind(lang_id)
    .bind(owner_id)
    .bind(text)
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to insert phrase")?;

    if let Some(row) = inserted {
        return Ok(row.get(0));
    }

    let row = sqlx::query("SELECT id FROM phrases WHERE lang_id = $1 AND user_id = $2 AND text = $3")
        .bind(lang_id)
        .bind(owner_id)
        .bind(text)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to read existing phrase")?;

    Ok(row.get(0))
}

/// Store one parsed line for `owner_id`, reusing existing phrases and merging
/// into an existing group that already links both sides.
pub async fn store_phrase_group(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: i64,
    group: &ParsedPhraseGroup,
    languages: [&Language; 2],
) -> Result<StoredGroup> {
    let mut sides: [Vec<i64>; 2] = [Vec::new(), Vec::new()];

    for (side, (segment, lang)) in group.segments().into_iter().zip(languages).enumerate() {
        for text in &segment.phrases {
            let id = get_or_create_phrase(tx, owner_id, lang.id, text).await?;
            sides[side].push(id);
        }
    }

    let existing = sqlx::query(
        "SELECT g.id FROM phrase_groups g
         WHERE g.user_id = $1
           AND EXISTS (SELECT 1 FROM phrase_group_phrases p
                       WHERE p.phrase_group_id = g.id AND p.phrase_id = ANY($2))
           AND EXISTS (SELECT 1 FROM phrase_group_phrases p
                       WHERE p.phrase_group_id = g.id AND p.phrase_id = ANY($3))
         ORDER BY g.id
         LIMIT 1",
    )
    .bind(owner_id)
    .bind(&sides[0])
    .bind(&sides[1])
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to look up existing phrase group")?;

    let (group_id, merged) = match existing {
        Some(row) => (row.get::<i64, _>(0), true),
        None => {
            let row = sqlx::query("INSERT INTO phrase_groups (user_id) VALUES ($1) RETURNING id")
                .bind(owner_id)
                .fetch_one(&mut **tx)
                .await
                .context("Failed to create phrase group")?;
            (row.get::<i64, _>(0), false)
        }
    };

    let phrase_ids: Vec<i64> = sides.concat();
    sqlx::query(
        "INSERT INTO phrase_group_phrases (phrase_group_id, phrase_id)
         SELECT $1, UNNEST($2::BIGINT[])
         ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(&phrase_ids)
    .execute(&mut **tx)
    .await
    .context("Failed to link phrases to group")?;

    debug!(group_id = %group_id, merged = %merged, phrases = phrase_ids.len(), "Phrase group stored");

    Ok(StoredGroup {
        group_id,
        phrase_ids,
        merged,
    })
}

async fn attach_group_to_dictionary(
    tx: &mut Transaction<'_, Postgres>,
    dictionary_id: i64,
    group_id: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO dictionary_phrase_groups (dictionary_id, phrase_group_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(dictionary_id)
    .bind(group_id)
    .execute(&mut **tx)
    .await
    .context("Failed to attach phrase group to dictionary")?;
    Ok(())
}

async fn get_or_create_message_entity(
    tx: &mut Transaction<'_, Postgres>,
    source: SourceMessage,
) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO message_entities (chat_id, message_id) VALUES ($1, $2)
         ON CONFLICT (chat_id, message_id) DO UPDATE SET chat_id = EXCLUDED.chat_id
         RETURNING id",
    )
    .bind(source.chat_id)
    .bind(source.message_id)
    .fetch_one(&mut **tx)
    .await
    .context("Failed to get or create message entity")?;
    Ok(row.get(0))
}

async fn link_message_phrases(
    tx: &mut Transaction<'_, Postgres>,
    entity_id: i64,
    phrase_ids: &[i64],
) -> Result<()> {
    sqlx::query(
        "INSERT INTO message_entity_phrases (message_entity_id, phrase_id)
         SELECT $1, UNNEST($2::BIGINT[])
         ON CONFLICT DO NOTHING",
    )
    .bind(entity_id)
    .bind(phrase_ids)
    .execute(&mut **tx)
    .await
    .context("Failed to link phrases to message")?;
    Ok(())
}

async fn store_groups(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: i64,
    dictionary_id: i64,
    groups: &[ParsedPhraseGroup],
    languages: &[Language],
    source: Option<SourceMessage>,
) -> Result<AddPhrasesOutcome> {
    let resolved = match resolve_all_languages(groups, languages) {
        Ok(resolved) => resolved,
        Err(error) => return Ok(AddPhrasesOutcome::Rejected(error)),
    };

    let entity_id = match source {
        Some(source) => Some(get_or_create_message_entity(tx, source).await?),
        None => None,
    };

    let mut report = AddReport::default();
    for (group, langs) in resolved {
        let stored = store_phrase_group(tx, owner_id, group, langs).await?;
        attach_group_to_dictionary(tx, dictionary_id, stored.group_id).await?;
        if let Some(entity_id) = entity_id {
            link_message_phrases(tx, entity_id, &stored.phrase_ids).await?;
        }

        report.groups_count += 1;
        report.phrases_count += stored.phrase_ids.len();
        if stored.merged {
            report.merged_count += 1;
        }
    }

    Ok(AddPhrasesOutcome::Added(report))
}

/// Parse `input` and add every line as a phrase group to the dictionary.
///
/// All lines are written in one transaction: a malformed line rejects the
/// whole input and nothing is stored.
pub async fn add_phrase_groups(
    pool: &PgPool,
    owner_id: i64,
    dictionary_id: i64,
    input: &str,
    source: Option<SourceMessage>,
) -> Result<AddPhrasesOutcome> {
    let groups = match parse_phrase_groups(input) {
        Ok(groups) => groups,
        Err(error) => return Ok(AddPhrasesOutcome::Rejected(error)),
    };
    let languages = crate::language::list_languages(pool).await?;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let started = Instant::now();
    let outcome = store_groups(&mut tx, owner_id, dictionary_id, &groups, &languages, source)
        .instrument(observability::db_span("store_phrase_groups", "phrases"))
        .await?;
    observability::record_db_metrics("store_phrase_groups", started.elapsed());

    match &outcome {
        AddPhrasesOutcome::Added(report) => {
            tx.commit().await.context("Failed to commit phrase groups")?;
            info!(
                owner_id = %owner_id,
                dictionary_id = %dictionary_id,
                groups = report.groups_count,
                phrases = report.phrases_count,
                merged = report.merged_count,
                "Phrase groups added"
            );
        }
        AddPhrasesOutcome::Rejected(_) => {
            tx.rollback().await.context("Failed to roll back phrase groups")?;
        }
    }

    Ok(outcome)
}

/// Replace the phrase groups created from an edited message.
///
/// Returns `Ok(None)` when the message never produced phrases. Otherwise the
/// groups of the dictionary that contain the message's phrases are detached
/// (and deleted once they belong to no dictionary) before the new text is
/// added.
pub async fn replace_phrase_groups(
    pool: &PgPool,
    owner_id: i64,
    dictionary_id: i64,
    input: &str,
    source: SourceMessage,
) -> Result<Option<AddPhrasesOutcome>> {
    let entity = sqlx::query("SELECT id FROM message_entities WHERE chat_id = $1 AND message_id = $2")
        .bind(source.chat_id)
        .bind(source.message_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up message entity")?;

    let Some(entity) = entity else {
        return Ok(None);
    };
    let entity_id: i64 = entity.get(0);

    let groups = match parse_phrase_groups(input) {
        Ok(groups) => groups,
        Err(error) => return Ok(Some(AddPhrasesOutcome::Rejected(error))),
    };
    let languages = crate::language::list_languages(pool).await?;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let old_groups: Vec<i64> = sqlx::query(
        "SELECT DISTINCT pgp.phrase_group_id
         FROM phrase_group_phrases pgp
         JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = pgp.phrase_group_id
         JOIN message_entity_phrases mep ON mep.phrase_id = pgp.phrase_id
         WHERE dpg.dictionary_id = $1 AND mep.message_entity_id = $2",
    )
    .bind(dictionary_id)
    .bind(entity_id)
    .fetch_all(&mut *tx)
    .await
    .context("Failed to find phrase groups of edited message")?
    .iter()
    .map(|row| row.get(0))
    .collect();

    sqlx::query(
        "DELETE FROM dictionary_phrase_groups WHERE dictionary_id = $1 AND phrase_group_id = ANY($2)",
    )
    .bind(dictionary_id)
    .bind(&old_groups)
    .execute(&mut *tx)
    .await
    .context("Failed to detach old phrase groups")?;

    sqlx::query(
        "DELETE FROM phrase_groups g WHERE g.id = ANY($1)
         AND NOT EXISTS (SELECT 1 FROM dictionary_phrase_groups d WHERE d.phrase_group_id = g.id)",
    )
    .bind(&old_groups)
    .execute(&mut *tx)
    .await
    .context("Failed to delete detached phrase groups")?;

    sqlx::query("DELETE FROM message_entity_phrases WHERE message_entity_id = $1")
        .bind(entity_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear message phrases")?;

    let started = Instant::now();
    let outcome = store_groups(&mut tx, owner_id, dictionary_id, &groups, &languages, Some(source))
        .instrument(observability::db_span("store_phrase_groups", "phrases"))
        .await?;
    observability::record_db_metrics("store_phrase_groups", started.elapsed());

    match &outcome {
        AddPhrasesOutcome::Added(_) => {
            tx.commit().await.context("Failed to commit replaced phrase groups")?;
            info!(
                dictionary_id = %dictionary_id,
                removed_groups = old_groups.len(),
                "Phrase groups replaced from edited message"
            );
        }
        AddPhrasesOutcome::Rejected(_) => {
            tx.rollback().await.context("Failed to roll back replaced phrase groups")?;
        }
    }

    Ok(Some(outcome))
}

/// Read a phrase that belongs to one of the dictionary's groups
pub async fn get_phrase_in_dictionary(
    pool: &PgPool,
    phrase_id: i64,
    dictionary_id: i64,
) -> Result<Option<Phrase>> {
    let row = sqlx::query(
        "SELECT p.id, p.lang_id, p.user_id, p.text FROM phrases p
         WHERE p.id = $1 AND EXISTS (
             SELECT 1 FROM phrase_group_phrases pgp
             JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = pgp.phrase_group_id
             WHERE pgp.phrase_id = p.id AND dpg.dictionary_id = $2)",
    )
    .bind(phrase_id)
    .bind(dictionary_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read phrase")?;

    Ok(row.map(|row| Phrase {
        id: row.get(0),
        lang_id: row.get(1),
        user_id: row.get(2),
        text: row.get(3),
    }))
}

/// Phrases in `dst_lang_id` sharing a group with `phrase_id`, ordered by text
pub async fn translations(pool: &PgPool, phrase_id: i64, dst_lang_id: i64) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT DISTINCT t.text FROM phrases t
         JOIN phrase_group_phrases tg ON tg.phrase_id = t.id
         JOIN phrase_group_phrases sg ON sg.phrase_group_id = tg.phrase_group_id
         WHERE sg.phrase_id = $1 AND t.lang_id = $2 AND t.id <> $1
         ORDER BY t.text",
    )
    .bind(phrase_id)
    .bind(dst_lang_id)
    .fetch_all(pool)
    .await
    .context("Failed to list translations")?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// `text - t1, t2` for a stored phrase
pub async fn verbose_translations(pool: &PgPool, phrase: &Phrase, dst_lang_id: i64) -> Result<String> {
    let translations = translations(pool, phrase.id, dst_lang_id).await?;
    Ok(format_translations(&phrase.text, &translations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_input_uppercase_edge_cases() {
        assert_eq!(fix_input_uppercase(""), "");
        assert_eq!(fix_input_uppercase("A"), "a");
        assert_eq!(fix_input_uppercase("Кот"), "кот");
        assert_eq!(fix_input_uppercase("New York"), "New York");
    }

    #[test]
    fn test_segment_normalizes_whitespace_and_dedups() {
        let segment = parse_segment("  Cat ,  cat,big   cat ,").unwrap();
        assert_eq!(segment.phrases, vec!["cat", "big cat"]);
        assert_eq!(segment.language_code, "en");
    }

    #[test]
    fn test_separator_requires_spaces() {
        // A hyphen inside a word is not a separator
        let err = parse_phrase_group("well-known").unwrap_err();
        assert_eq!(err, PhraseInputError::InvalidPhraseCount { found: 1 });
    }

    #[test]
    fn test_unknown_language_reports_source_line() {
        let english = Language {
            id: 1,
            name: "English".to_string(),
            code: "en".to_string(),
            code_aliases: String::new(),
            priority: 0,
        };
        let russian = Language {
            id: 2,
            name: "Russian".to_string(),
            code: "ru".to_string(),
            code_aliases: String::new(),
            priority: 0,
        };
        let groups = parse_phrase_groups("cat - кот\n\n\ndog - собака\n").unwrap();
        assert_eq!(groups.iter().map(|g| g.line).collect::<Vec<_>>(), vec![1, 4]);

        assert_eq!(resolve_all_languages(&groups, &[english.clone(), russian]).unwrap().len(), 2);
        let err = resolve_all_languages(&groups[1..], &[english]).unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert_eq!(err.root(), &PhraseInputError::UnknownLanguage { code: "ru".to_string() });
    }

    #[test]
    fn test_format_translations() {
        assert_eq!(format_translations("cat", &[]), "cat");
        assert_eq!(
            format_translations("cat", &["кот".to_string(), "кошка".to_string()]),
            "cat - кот, кошка"
        );
    }

    #[test]
    fn test_error_keys_follow_line_wrapper() {
        let err = PhraseInputError::LineError {
            line: 3,
            error: Box::new(PhraseInputError::EmptySegment),
        };
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.message_key(), "phrase-error-empty-segment");
        assert_eq!(err.root(), &PhraseInputError::EmptySegment);
        assert_eq!(err.to_string(), "line 3: a language segment is empty");
    }
}
