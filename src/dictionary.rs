//! Dictionaries: named, shareable collections of phrase groups.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::fmt;
use std::time::Instant;
use tracing::{info, Instrument};

use crate::errors::is_unique_violation;
use crate::language::Language;
use crate::observability;

/// Maximum dictionary name length, in characters
pub const MAX_DICTIONARY_NAME_LENGTH: usize = 64;

/// User-facing dictionary errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    /// The owner already has a dictionary with this name
    Exists { name: String },
    EmptyName,
    NameTooLong { length: usize },
}

impl DictionaryError {
    /// Localization key describing this error to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            DictionaryError::Exists { .. } => "dict-error-exists",
            DictionaryError::EmptyName => "dict-error-empty-name",
            DictionaryError::NameTooLong { .. } => "dict-error-name-too-long",
        }
    }

    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            DictionaryError::Exists { name } => vec![("name", name.clone())],
            DictionaryError::EmptyName => Vec::new(),
            DictionaryError::NameTooLong { .. } => {
                vec![("max", MAX_DICTIONARY_NAME_LENGTH.to_string())]
            }
        }
    }
}

impl fmt::Display for DictionaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionaryError::Exists { name } => write!(f, "dictionary '{}' already exists", name),
            DictionaryError::EmptyName => write!(f, "dictionary name is empty"),
            DictionaryError::NameTooLong { length } => write!(
                f,
                "dictionary name has {} characters, at most {} allowed",
                length, MAX_DICTIONARY_NAME_LENGTH
            ),
        }
    }
}

impl std::error::Error for DictionaryError {}

/// Represents a dictionary in the database
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn dictionary_from_row(row: &PgRow) -> Dictionary {
    Dictionary {
        id: row.get(0),
        name: row.get(1),
        user_id: row.get(2),
        created_at: row.get(3),
    }
}

/// Trim and check a dictionary name before storing it
pub fn validate_dictionary_name(name: &str) -> Result<String, DictionaryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DictionaryError::EmptyName);
    }
    let length = name.chars().count();
    if length > MAX_DICTIONARY_NAME_LENGTH {
        return Err(DictionaryError::NameTooLong { length });
    }
    Ok(name.to_string())
}

/// All ordered (src, dst) pairs of distinct languages
pub fn language_pairs(languages: &[Language]) -> Vec<(Language, Language)> {
    let mut pairs = Vec::new();
    for src in languages {
        for dst in languages {
            if src.id != dst.id {
                pairs.push((src.clone(), dst.clone()));
            }
        }
    }
    pairs
}

/// Create a dictionary; a duplicate name for the same owner is reported as
/// [`DictionaryError::Exists`] rather than as a database failure.
pub async fn create_dictionary(
    pool: &PgPool,
    owner_id: i64,
    name: &str,
) -> Result<Result<Dictionary, DictionaryError>> {
    let name = match validate_dictionary_name(name) {
        Ok(name) => name,
        Err(e) => return Ok(Err(e)),
    };

    let result = sqlx::query(
        "INSERT INTO dictionaries (name, user_id) VALUES ($1, $2)
         RETURNING id, name, user_id, created_at",
    )
    .bind(&name)
    .bind(owner_id)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => {
            let dictionary = dictionary_from_row(&row);
            info!(dictionary_id = %dictionary.id, owner_id = %owner_id, "Dictionary created");
            Ok(Ok(dictionary))
        }
        Err(e) if is_unique_violation(&e) => Ok(Err(DictionaryError::Exists { name })),
        Err(e) => Err(e).context("Failed to create dictionary"),
    }
}

/// Dictionaries owned, viewed or edited by the user, ordered by name
pub async fn dictionaries_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Dictionary>> {
    let rows = sqlx::query(
        "SELECT DISTINCT d.id, d.name, d.user_id, d.created_at FROM dictionaries d
         LEFT JOIN dictionary_editors e ON e.dictionary_id = d.id
         LEFT JOIN dictionary_viewers v ON v.dictionary_id = d.id
         WHERE d.user_id = $1 OR e.user_id = $1 OR v.user_id = $1
         ORDER BY d.name, d.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list dictionaries")?;

    Ok(rows.iter().map(dictionary_from_row).collect())
}

/// Read a dictionary by ID
pub async fn get_dictionary(pool: &PgPool, dictionary_id: i64) -> Result<Option<Dictionary>> {
    let row = sqlx::query("SELECT id, name, user_id, created_at FROM dictionaries WHERE id = $1")
        .bind(dictionary_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get dictionary")?;

    Ok(row.as_ref().map(dictionary_from_row))
}

/// Delete a dictionary; groups, stats and sharing rows cascade
pub async fn delete_dictionary(pool: &PgPool, dictionary_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM dictionaries WHERE id = $1")
        .bind(dictionary_id)
        .execute(pool)
        .await
        .context("Failed to delete dictionary")?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(dictionary_id = %dictionary_id, "Dictionary deleted");
    }
    Ok(deleted)
}

/// Languages of the phrases in the dictionary, highest priority first
pub async fn dictionary_languages(pool: &PgPool, dictionary_id: i64) -> Result<Vec<Language>> {
    let rows = sqlx::query(
        "SELECT DISTINCT l.id, l.name, l.code, l.code_aliases, l.priority FROM languages l
         JOIN phrases p ON p.lang_id = l.id
         JOIN phrase_group_phrases pgp ON pgp.phrase_id = p.id
         JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = pgp.phrase_group_id
         WHERE dpg.dictionary_id = $1
         ORDER BY l.priority DESC, l.name",
    )
    .bind(dictionary_id)
    .fetch_all(pool)
    .await
    .context("Failed to list dictionary languages")?;

    Ok(rows
        .iter()
        .map(|row| Language {
            id: row.get(0),
            name: row.get(1),
            code: row.get(2),
            code_aliases: row.get(3),
            priority: row.get(4),
        })
        .collect())
}

/// Ordered (src, dst) language pairs available for training
pub async fn language_combinations(
    pool: &PgPool,
    dictionary_id: i64,
) -> Result<Vec<(Language, Language)>> {
    let languages = dictionary_languages(pool, dictionary_id).await?;
    Ok(language_pairs(&languages))
}

/// Number of phrase groups in the dictionary
pub async fn phrase_groups_count(pool: &PgPool, dictionary_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM dictionary_phrase_groups WHERE dictionary_id = $1")
        .bind(dictionary_id)
        .fetch_one(pool)
        .await
        .context("Failed to count phrase groups")?;
    Ok(row.get(0))
}

/// Number of groups in the dictionary holding phrases in both languages
pub async fn groups_spanning_both(
    pool: &PgPool,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) FROM dictionary_phrase_groups dpg
         WHERE dpg.dictionary_id = $1
           AND EXISTS (SELECT 1 FROM phrase_group_phrases pgp JOIN phrases p ON p.id = pgp.phrase_id
                       WHERE pgp.phrase_group_id = dpg.phrase_group_id AND p.lang_id = $2)
           AND EXISTS (SELECT 1 FROM phrase_group_phrases pgp JOIN phrases p ON p.id = pgp.phrase_id
                       WHERE pgp.phrase_group_id = dpg.phrase_group_id AND p.lang_id = $3)",
    )
    .bind(dictionary_id)
    .bind(src_lang_id)
    .bind(dst_lang_id)
    .fetch_one(pool)
    .await
    .context("Failed to count phrase groups spanning both languages")?;
    Ok(row.get(0))
}

/// One page of dictionary contents
#[derive(Debug, Clone, PartialEq)]
pub struct ContentsPage {
    /// `(phrase_id, text)` in source language, ordered by text
    pub phrases: Vec<(i64, String)>,
    pub total: i64,
    pub offset: i64,
    pub count: i64,
}

impl ContentsPage {
    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    pub fn has_next(&self) -> bool {
        self.offset + self.count < self.total
    }

    /// Offset of the previous page, clamped at zero
    pub fn prev_offset(&self) -> i64 {
        (self.offset - self.count).max(0)
    }

    pub fn next_offset(&self) -> i64 {
        self.offset + self.count
    }

    /// The same page cut to its first `rows` phrases, so paging resumes at
    /// the first phrase left out
    pub fn showing(&self, rows: usize) -> ContentsPage {
        ContentsPage {
            phrases: self.phrases.iter().take(rows).cloned().collect(),
            total: self.total,
            offset: self.offset,
            count: (rows as i64).min(self.count),
        }
    }
}

/// Page of phrases in `src_lang_id` that have a translation in `dst_lang_id`
pub async fn dictionary_contents(
    pool: &PgPool,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
    offset: i64,
    count: i64,
) -> Result<ContentsPage> {
    let started = Instant::now();
    let page = contents_page(pool, dictionary_id, src_lang_id, dst_lang_id, offset, count)
        .instrument(observability::db_span("dictionary_contents", "phrases"))
        .await?;
    observability::record_db_metrics("dictionary_contents", started.elapsed());
    Ok(page)
}

async fn contents_page(
    pool: &PgPool,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
    offset: i64,
    count: i64,
) -> Result<ContentsPage> {
    const CANDIDATES: &str = "FROM phrases p
         WHERE p.lang_id = $2 AND EXISTS (
             SELECT 1 FROM phrase_group_phrases sg
             JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = sg.phrase_group_id
             JOIN phrase_group_phrases tg ON tg.phrase_group_id = sg.phrase_group_id
             JOIN phrases t ON t.id = tg.phrase_id
             WHERE sg.phrase_id = p.id AND dpg.dictionary_id = $1 AND t.lang_id = $3)";

    let total: i64 = sqlx::query(&format!("SELECT COUNT(*) {CANDIDATES}"))
        .bind(dictionary_id)
        .bind(src_lang_id)
        .bind(dst_lang_id)
        .fetch_one(pool)
        .await
        .context("Failed to count dictionary contents")?
        .get(0);

    let rows = sqlx::query(&format!(
        "SELECT p.id, p.text {CANDIDATES} ORDER BY p.text, p.id OFFSET $4 LIMIT $5"
    ))
    .bind(dictionary_id)
    .bind(src_lang_id)
    .bind(dst_lang_id)
    .bind(offset.max(0))
    .bind(count)
    .fetch_all(pool)
    .await
    .context("Failed to read dictionary contents")?;

    Ok(ContentsPage {
        phrases: rows.iter().map(|row| (row.get(0), row.get(1))).collect(),
        total,
        offset: offset.max(0),
        count,
    })
}

/// Share a dictionary with a viewer
pub async fn add_viewer(pool: &PgPool, dictionary_id: i64, user_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO dictionary_viewers (dictionary_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(dictionary_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to add dictionary viewer")?;
    Ok(())
}

/// Share a dictionary with an editor
pub async fn add_editor(pool: &PgPool, dictionary_id: i64, user_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO dictionary_editors (dictionary_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(dictionary_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to add dictionary editor")?;
    Ok(())
}
