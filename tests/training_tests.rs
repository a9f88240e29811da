//! # Training Selector Tests
//!
//! Simulated training sessions driving the phrase selector through the
//! recency buffer, plus the session-completion rule.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use dictrainer::cache::RecentPhrasesCache;
use dictrainer::stats::{is_training_completed, Counters};
use dictrainer::training::{select_next, CandidateStat, TrainingCandidate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const USER: i64 = 7;
const LANG: i64 = 1;

fn untrained(ids: impl IntoIterator<Item = i64>) -> Vec<TrainingCandidate> {
    ids.into_iter()
        .map(|phrase_id| TrainingCandidate {
            phrase_id,
            stat: None,
        })
        .collect()
}

fn trained(phrase_id: i64, trained_count: i64, guessed_count: i64, minutes_ago: i64) -> TrainingCandidate {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    TrainingCandidate {
        phrase_id,
        stat: Some(CandidateStat {
            counters: Counters {
                trained_count,
                guessed_count,
            },
            last_trained: now - ChronoDuration::minutes(minutes_ago),
        }),
    }
}

/// Ask `rounds` questions, recording them in the buffer like the bot does
fn run_session(candidates: &[TrainingCandidate], cache: &RecentPhrasesCache, rounds: usize, seed: u64) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rounds)
        .map(|_| {
            let recent = cache.recent(USER, LANG);
            let id = select_next(candidates, &recent, &mut rng).unwrap();
            cache.push(USER, LANG, id);
            id
        })
        .collect()
}

#[test]
fn test_no_repeat_within_buffer_window() {
    let capacity = 5;
    let cache = RecentPhrasesCache::new(capacity, Duration::from_secs(3600));
    let candidates = untrained(1..=20);

    for seed in 0..10 {
        cache.clear(USER, LANG);
        let asked = run_session(&candidates, &cache, 40, seed);
        for window in asked.windows(capacity + 1) {
            let last = window[capacity];
            assert!(
                !window[..capacity].contains(&last),
                "phrase {last} repeated within {capacity} questions: {asked:?}"
            );
        }
    }
}

#[test]
fn test_repeat_only_when_exhausted() {
    let cache = RecentPhrasesCache::new(5, Duration::from_secs(3600));
    let candidates = untrained([10, 20, 30]);

    let asked = run_session(&candidates, &cache, 6, 42);

    // The first three questions cover the dictionary before anything repeats
    let mut first_round = asked[..3].to_vec();
    first_round.sort_unstable();
    assert_eq!(first_round, vec![10, 20, 30]);

    // After that the oldest buffered phrase comes back first
    assert_eq!(asked[3], asked[0]);
}

#[test]
fn test_untrained_before_trained() {
    let cache = RecentPhrasesCache::new(5, Duration::from_secs(3600));
    let mut candidates = vec![trained(1, 3, 0, 10), trained(2, 3, 1, 5)];
    candidates.extend(untrained([3]));

    let asked = run_session(&candidates, &cache, 3, 1);
    assert_eq!(asked, vec![3, 1, 2]);
}

#[test]
fn test_worst_guessed_first_then_least_recent() {
    let candidates = vec![
        trained(1, 4, 4, 1),
        trained(2, 4, 1, 1),
        trained(3, 4, 1, 30),
    ];
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(select_next(&candidates, &[], &mut rng), Some(3));
    assert_eq!(select_next(&candidates, &[3], &mut rng), Some(2));
    assert_eq!(select_next(&candidates, &[2, 3], &mut rng), Some(1));
}

#[test]
fn test_no_candidates_no_phrase() {
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(select_next(&[], &[1, 2], &mut rng), None);
}

#[test]
fn test_stale_buffer_entries_are_ignored() {
    let mut rng = StdRng::seed_from_u64(0);
    // Buffered phrases that left the dictionary do not count as candidates
    let candidates = untrained([5]);
    assert_eq!(select_next(&candidates, &[5, 99], &mut rng), Some(5));
}

#[test]
fn test_training_completion_matches_spanning_groups() {
    assert!(!is_training_completed(0, 3));
    assert!(!is_training_completed(2, 3));
    assert!(is_training_completed(3, 3));
    assert!(is_training_completed(4, 3));
    // A dictionary without groups in both languages is trivially done
    assert!(is_training_completed(0, 0));
}
