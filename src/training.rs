//! Training selector: picks the next phrase to quiz.
//!
//! Untrained phrases come first, in random order. Once everything was trained
//! at least once, the worst-guessed phrase is asked next. A per-user,
//! per-language buffer of recently asked phrases keeps the same phrase from
//! being repeated until the dictionary runs out of alternatives.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, Instrument};

use crate::cache::RecentPhrasesCache;
use crate::observability;
use crate::stats::Counters;

/// Per-user stat of a trained candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateStat {
    pub counters: Counters,
    pub last_trained: DateTime<Utc>,
}

/// A phrase that can be asked in the current language direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingCandidate {
    pub phrase_id: i64,
    /// `None` when the user never trained this phrase
    pub stat: Option<CandidateStat>,
}

/// Choose the next phrase among `candidates`.
///
/// `recent` is the recency buffer, newest first.
pub fn select_next<R: Rng + ?Sized>(
    candidates: &[TrainingCandidate],
    recent: &[i64],
    rng: &mut R,
) -> Option<i64> {
    let untrained: Vec<i64> = candidates
        .iter()
        .filter(|c| c.stat.is_none() && !recent.contains(&c.phrase_id))
        .map(|c| c.phrase_id)
        .collect();
    if let Some(id) = untrained.choose(rng) {
        return Some(*id);
    }

    let mut trained: Vec<(i64, CandidateStat)> = candidates
        .iter()
        .filter_map(|c| c.stat.map(|stat| (c.phrase_id, stat)))
        .collect();
    trained.sort_by(|(a_id, a), (b_id, b)| {
        a.counters
            .guessed_ratio()
            .total_cmp(&b.counters.guessed_ratio())
            .then(a.last_trained.cmp(&b.last_trained))
            .then(a_id.cmp(b_id))
    });
    if let Some((id, _)) = trained.iter().find(|(id, _)| !recent.contains(id)) {
        return Some(*id);
    }

    // Everything was asked recently: repeat the oldest buffered phrase
    if let Some(id) = recent
        .iter()
        .rev()
        .find(|id| candidates.iter().any(|c| c.phrase_id == **id))
    {
        return Some(*id);
    }

    candidates.first().map(|c| c.phrase_id)
}

/// Source-language phrases of the dictionary that have a translation in the
/// target language, with the user's stat when present
pub async fn training_candidates(
    pool: &PgPool,
    user_id: i64,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<Vec<TrainingCandidate>> {
    let rows = sqlx::query(
        "SELECT p.id, s.trained_count, s.guessed_count, s.updated_at FROM phrases p
         LEFT JOIN phrase_user_stats s ON s.phrase_id = p.id AND s.user_id = $4
         WHERE p.lang_id = $2 AND EXISTS (
             SELECT 1 FROM phrase_group_phrases sg
             JOIN dictionary_phrase_groups dpg ON dpg.phrase_group_id = sg.phrase_group_id
             JOIN phrase_group_phrases tg ON tg.phrase_group_id = sg.phrase_group_id
             JOIN phrases t ON t.id = tg.phrase_id
             WHERE sg.phrase_id = p.id AND dpg.dictionary_id = $1 AND t.lang_id = $3)
         ORDER BY p.id",
    )
    .bind(dictionary_id)
    .bind(src_lang_id)
    .bind(dst_lang_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list training candidates")?;

    Ok(rows
        .iter()
        .map(|row| {
            let trained: Option<i32> = row.get(1);
            let guessed: Option<i32> = row.get(2);
            let updated_at: Option<DateTime<Utc>> = row.get(3);
            let stat = match (trained, guessed, updated_at) {
                (Some(trained), Some(guessed), Some(last_trained)) => Some(CandidateStat {
                    counters: Counters {
                        trained_count: trained.into(),
                        guessed_count: guessed.into(),
                    },
                    last_trained,
                }),
                _ => None,
            };
            TrainingCandidate {
                phrase_id: row.get(0),
                stat,
            }
        })
        .collect())
}

/// Pick the next phrase for the user and remember it in the recency buffer
pub async fn next_phrase_for_training(
    pool: &PgPool,
    recent: &RecentPhrasesCache,
    user_id: i64,
    dictionary_id: i64,
    src_lang_id: i64,
    dst_lang_id: i64,
) -> Result<Option<i64>> {
    let started = std::time::Instant::now();
    let candidates = training_candidates(pool, user_id, dictionary_id, src_lang_id, dst_lang_id)
        .instrument(observability::db_span("training_candidates", "phrases"))
        .await?;
    observability::record_db_metrics("training_candidates", started.elapsed());
    let buffer = recent.recent(user_id, src_lang_id);

    let chosen = select_next(&candidates, &buffer, &mut rand::rng());
    if let Some(phrase_id) = chosen {
        recent.push(user_id, src_lang_id, phrase_id);
    }

    debug!(
        user_id = %user_id,
        dictionary_id = %dictionary_id,
        candidates = candidates.len(),
        buffered = buffer.len(),
        chosen = ?chosen,
        "Training phrase selected"
    );
    Ok(chosen)
}
