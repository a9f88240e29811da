//! Training statistics.
//!
//! Counters are kept per (user, phrase) and per (user, dictionary, kind).
//! Ratios are always derived from the counters, never stored.

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

/// Kind of dictionary stat row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Lifetime counters
    Total,
    /// Counters of the current training session
    Training,
}

impl StatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatKind::Total => "total",
            StatKind::Training => "training",
        }
    }
}

/// `part / whole`, or 0.0 when `whole` is zero
pub fn ratio(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Guessed/trained counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub trained_count: i64,
    pub guessed_count: i64,
}

impl Counters {
    pub fn guessed_ratio(&self) -> f64 {
        ratio(self.guessed_count, self.trained_count)
    }

    /// Whole-number percentage of guessed answers
    pub fn guessed_percent(&self) -> i64 {
        (self.guessed_ratio() * 100.0).round() as i64
    }
}

/// How much of a dictionary the user has trained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub trained_phrases_count: i64,
    pub phrases_count: i64,
    pub trained_ratio: f64,
}

impl Progress {
    pub fn new(trained_phrases_count: i64, phrases_count: i64) -> Self {
        Self {
            trained_phrases_count,
            phrases_count,
            trained_ratio: ratio(trained_phrases_count, phrases_count),
        }
    }

    pub fn percent(&self) -> i64 {
        (self.trained_ratio * 100.0).round() as i64
    }
}

/// A session is complete once every group spanning both languages was trained
pub fn is_training_completed(trained_count: i64, groups_spanning_both: i64) -> bool {
    trained_count >= groups_spanning_both
}

/// Record one training answer: phrase stat and both dictionary stat kinds
/// are incremented in a single transaction.
pub async fn record_answer(
    pool: &PgPool,
    user_id: i64,
    dictionary_id: i64,
    phrase_id: i64,
    guessed: bool,
) -> Result<()> {
    let guessed_inc: i32 = guessed.into();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        "INSERT INTO phrase_user_stats (user_id, phrase_id, trained_count, guessed_count)
         VALUES ($1, $2, 1, $3)
         ON CONFLICT (user_id, phrase_id) DO UPDATE SET
             trained_count = phrase_user_stats.trained_count + 1,
             guessed_count = phrase_user_stats.guessed_count + EXCLUDED.guessed_count,
             updated_at = NOW()",
    )
    .bind(user_id)
    .bind(phrase_id)
    .bind(guessed_inc)
    .execute(&mut *tx)
    .await
    .context("Failed to update phrase stat")?;

    for kind in [StatKind::Total, StatKind::Training] {
        sqlx::query(
            "INSERT INTO dictionary_user_stats (user_id, dictionary_id, kind, trained_count, guessed_count)
             VALUES ($1, $2, $3, 1, $4)
             ON CONFLICT (user_id, dictionary_id, kind) DO UPDATE SET
                 trained_count = dictionary_user_stats.trained_count + 1,
                 guessed_count = dictionary_user_stats.guessed_count + EXCLUDED.guessed_count,
                 updated_at = NOW()",
        )
        .bind(user_id)
        .bind(dictionary_id)
        .bind(kind.as_str())
        .bind(guessed_inc)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update {} dictionary stat", kind.as_str()))?;
    }

    tx.commit().await.context("Failed to commit training answer")?;

    debug!(user_id = %user_id, phrase_id = %phrase_id, guessed = %guessed, "Training answer recorded");
    Ok(())
}

/// Start a fresh training session by dropping the session counters
pub async fn reset_training_stat(pool: &PgPool, user_id: i64, dictionary_id: i64) -> Result<()> {
    sqlx::query(
        "DELETE FROM dictionary_user_stats WHERE user_id = $1 AND dictionary_id = $2 AND kind = $3",
    )
    .bind(user_id)
    .bind(dictionary_id)
    .bind(StatKind::Training.as_str())
    .execute(pool)
    .await
    .context("Failed to reset training stat")?;
    Ok(())
}

/// Dictionary counters of one kind; zeros when nothing was trained yet
pub async fn dictionary_counters(
    pool: &PgPool,
    user_id: i64,
    dictionary_id: i64,
    kind: StatKind,
) -> Result<Counters> {
    let row = sqlx::query(
        "SELECT trained_count, guessed_count FROM dictionary_user_stats
         WHERE user_id = $1 AND dictionary_id = $2 AND kind = $3",
    )
    .bind(user_id)
    .bind(dictionary_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
    .context("Failed to read dictionary stat")?;

    Ok(row
        .map(|row| Counters {
            trained_count: row.get::<i32, _>(0).into(),
            guessed_count: row.get::<i32, _>(1).into(),
        })
        .unwrap_or_default())
}

/// Trained share of the dictionary's phrases, optionally for one language
pub async fn dictionary_progress(
    pool: &PgPool,
    user_id: i64,
    dictionary_id: i64,
    lang_id: Option<i64>,
) -> Result<Progress> {
    let row = sqlx::query(
        "SELECT COUNT(DISTINCT p.id), COUNT(DISTINCT s.phrase_id) FROM phrases p
         JOIN phrase_group_phrases pgp ON pgp.phrase_id = p.id
         JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = pgp.phrase_group_id
         LEFT JOIN phrase_user_stats s ON s.phrase_id = p.id AND s.user_id = $2
         WHERE dpg.dictionary_id = $1 AND ($3::BIGINT IS NULL OR p.lang_id = $3)",
    )
    .bind(dictionary_id)
    .bind(user_id)
    .bind(lang_id)
    .fetch_one(pool)
    .await
    .context("Failed to compute dictionary progress")?;

    Ok(Progress::new(row.get(1), row.get(0)))
}
