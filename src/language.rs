//! Language detection and stored language lookups.
//!
//! Phrases are assigned a language by the script they are written in. The
//! detector only distinguishes scripts; mapping a script to a stored
//! [`Language`] row happens through its code (or one of its aliases).

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

lazy_static! {
    static ref LATIN_LETTER: Regex = Regex::new(r"\p{Latin}").expect("Invalid latin regex");
    static ref CYRILLIC_LETTER: Regex =
        Regex::new(r"\p{Cyrillic}").expect("Invalid cyrillic regex");
}

/// Writing systems the detector knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Cyrillic,
}

impl Script {
    /// Language code a phrase in this script is stored under
    pub fn language_code(self) -> &'static str {
        match self {
            Script::Latin => "en",
            Script::Cyrillic => "ru",
        }
    }

    fn of_char(c: char) -> Option<Self> {
        let mut buf = [0u8; 4];
        let s = c.encode_utf8(&mut buf);
        if LATIN_LETTER.is_match(s) {
            Some(Script::Latin)
        } else if CYRILLIC_LETTER.is_match(s) {
            Some(Script::Cyrillic)
        } else {
            None
        }
    }
}

/// Detect the dominant script of `text`.
///
/// The script with the most letters wins; on a tie the script of the first
/// letter wins. Text without any Latin or Cyrillic letters yields `None`.
///
/// ```
/// use dictrainer::language::{detect_script, Script};
///
/// assert_eq!(detect_script("cat"), Some(Script::Latin));
/// assert_eq!(detect_script("кот"), Some(Script::Cyrillic));
/// assert_eq!(detect_script("42 !"), None);
/// ```
pub fn detect_script(text: &str) -> Option<Script> {
    let mut first = None;
    let mut latin = 0usize;
    let mut cyrillic = 0usize;

    for script in text.chars().filter_map(Script::of_char) {
        first.get_or_insert(script);
        match script {
            Script::Latin => latin += 1,
            Script::Cyrillic => cyrillic += 1,
        }
    }

    match latin.cmp(&cyrillic) {
        std::cmp::Ordering::Greater => Some(Script::Latin),
        std::cmp::Ordering::Less => Some(Script::Cyrillic),
        std::cmp::Ordering::Equal => first,
    }
}

/// Shortcut for `detect_script(text).map(Script::language_code)`
pub fn detect_language_code(text: &str) -> Option<&'static str> {
    detect_script(text).map(Script::language_code)
}

/// Represents a language in the database
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub code_aliases: String,
    pub priority: i32,
}

impl Language {
    /// Whether `code` is this language's primary code or one of its aliases
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code)
            || self
                .code_aliases
                .split_whitespace()
                .any(|alias| alias.eq_ignore_ascii_case(code))
    }

    /// Upper-case code used on buttons, e.g. `EN`
    pub fn short_label(&self) -> String {
        self.code.to_uppercase()
    }
}

fn language_from_row(row: &sqlx::postgres::PgRow) -> Language {
    Language {
        id: row.get(0),
        name: row.get(1),
        code: row.get(2),
        code_aliases: row.get(3),
        priority: row.get(4),
    }
}

/// Insert the built-in languages if they are missing
pub async fn seed_languages(pool: &PgPool) -> Result<()> {
    for (name, code, aliases, priority) in [
        ("English", "en", "en_US en_GB", 10),
        ("Russian", "ru", "ru_RU", 5),
    ] {
        sqlx::query(
            "INSERT INTO languages (name, code, code_aliases, priority) VALUES ($1, $2, $3, $4)
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(name)
        .bind(code)
        .bind(aliases)
        .bind(priority)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to seed language {code}"))?;
    }

    debug!("Languages seeded");
    Ok(())
}

/// List every stored language, highest priority first
pub async fn list_languages(pool: &PgPool) -> Result<Vec<Language>> {
    let rows = sqlx::query(
        "SELECT id, name, code, code_aliases, priority FROM languages ORDER BY priority DESC, name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list languages")?;

    Ok(rows.iter().map(language_from_row).collect())
}

/// Find a language by primary code or alias
pub async fn find_language_by_code(pool: &PgPool, code: &str) -> Result<Option<Language>> {
    Ok(list_languages(pool)
        .await?
        .into_iter()
        .find(|lang| lang.matches_code(code)))
}

/// Find a language by internal ID
pub async fn get_language(pool: &PgPool, language_id: i64) -> Result<Option<Language>> {
    let row = sqlx::query(
        "SELECT id, name, code, code_aliases, priority FROM languages WHERE id = $1",
    )
    .bind(language_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get language")?;

    Ok(row.as_ref().map(language_from_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Language {
        Language {
            id: 1,
            name: "English".to_string(),
            code: "en".to_string(),
            code_aliases: "en_US en_GB".to_string(),
            priority: 10,
        }
    }

    #[test]
    fn test_detect_script_majority() {
        assert_eq!(detect_script("the кот"), Some(Script::Latin));
        assert_eq!(detect_script("большой cat"), Some(Script::Cyrillic));
    }

    #[test]
    fn test_detect_script_tie_uses_first_letter() {
        assert_eq!(detect_script("ab вг"), Some(Script::Latin));
        assert_eq!(detect_script("вг ab"), Some(Script::Cyrillic));
    }

    #[test]
    fn test_detect_script_ignores_digits_and_punctuation() {
        assert_eq!(detect_script("  1, 2 - 3!"), None);
        assert_eq!(detect_script(""), None);
        assert_eq!(detect_script("ёж"), Some(Script::Cyrillic));
        assert_eq!(detect_script("café"), Some(Script::Latin));
    }

    #[test]
    fn test_detect_language_code() {
        assert_eq!(detect_language_code("cat"), Some("en"));
        assert_eq!(detect_language_code("кот"), Some("ru"));
    }

    #[test]
    fn test_language_matches_aliases() {
        let en = english();
        assert!(en.matches_code("en"));
        assert!(en.matches_code("EN"));
        assert!(en.matches_code("en_GB"));
        assert!(!en.matches_code("ru"));
        assert_eq!(en.short_label(), "EN");
    }
}
