//! # Database Tests
//!
//! Run against the PostgreSQL database in `DATABASE_URL`; every test is
//! skipped when it is not set. Tests create their own users so they can run
//! in parallel on a shared database.

use anyhow::{Context, Result};
use dictrainer::cache::RecentPhrasesCache;
use dictrainer::db::{self, ChatIdentity, Profile};
use dictrainer::dialogue::ProfileState;
use dictrainer::dictionary::{self, DictionaryError};
use dictrainer::language::{self, Language};
use dictrainer::maintenance;
use dictrainer::permissions::{self, Permission};
use dictrainer::phrases::{self, AddPhrasesOutcome, SourceMessage};
use dictrainer::stats::{self, StatKind};
use dictrainer::training;
use sqlx::{PgPool, Row};
use std::env;
use std::time::Duration;

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {
        match setup_test_db().await {
            Ok(pool) => $test_fn(&pool).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    };
}

async fn setup_test_db() -> Result<PgPool> {
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    db::init_database_schema(&pool).await?;
    language::seed_languages(&pool).await?;

    Ok(pool)
}

/// Profile of a fresh chat with a random id
async fn new_profile(pool: &PgPool, username: &str) -> Result<Profile> {
    let chat_id = i64::from(rand::random::<u32>()) + 1_000_000_000;
    let identity = ChatIdentity {
        chat_id,
        username: Some(format!("{}_{}", username, chat_id)),
        first_name: Some("Test".to_string()),
        last_name: None,
        language_code: Some("en".to_string()),
    };
    db::get_or_create_user_profile(pool, &identity).await
}

async fn languages(pool: &PgPool) -> Result<(Language, Language)> {
    let en = language::find_language_by_code(pool, "en")
        .await?
        .context("en not seeded")?;
    let ru = language::find_language_by_code(pool, "ru")
        .await?
        .context("ru not seeded")?;
    Ok((en, ru))
}

async fn user_phrase_count(pool: &PgPool, user_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) FROM phrases WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get(0))
}

fn added(outcome: AddPhrasesOutcome) -> phrases::AddReport {
    match outcome {
        AddPhrasesOutcome::Added(report) => report,
        AddPhrasesOutcome::Rejected(error) => panic!("input rejected: {error}"),
    }
}

#[tokio::test]
async fn test_profile_operations() -> Result<()> {
    skip_if_no_db!(test_profile_operations_impl)
}

async fn test_profile_operations_impl(pool: &PgPool) -> Result<()> {
    let mut profile = new_profile(pool, "profile").await?;
    assert_eq!(profile.state, ProfileState::WaitNothing);
    assert_eq!(profile.current_dict_id, None);

    db::update_profile_state(pool, &mut profile, ProfileState::WaitInputCreateDict).await?;
    let stored = db::get_profile(pool, profile.id).await?.context("profile missing")?;
    assert_eq!(stored.state, ProfileState::WaitInputCreateDict);
    assert_eq!(stored.user_id, profile.user_id);

    let user = db::get_user_by_id(pool, profile.user_id).await?.context("user missing")?;
    assert_eq!(user.first_name, "Test");
    assert!(user.is_active);

    db::create_log_entry(pool, profile.id, "/start", "Hi Test!").await?;
    Ok(())
}

#[tokio::test]
async fn test_clashing_username_gets_suffix() -> Result<()> {
    skip_if_no_db!(test_clashing_username_gets_suffix_impl)
}

async fn test_clashing_username_gets_suffix_impl(pool: &PgPool) -> Result<()> {
    let first = new_profile(pool, "clash").await?;
    let taken = db::get_user_by_id(pool, first.user_id)
        .await?
        .context("user missing")?
        .username;

    let identity = ChatIdentity {
        chat_id: first.id + 1,
        username: Some(taken.clone()),
        first_name: Some("Other".to_string()),
        last_name: None,
        language_code: None,
    };
    let second = db::get_or_create_user_profile(pool, &identity).await?;
    assert_ne!(second.user_id, first.user_id);

    let renamed = db::get_user_by_id(pool, second.user_id)
        .await?
        .context("user missing")?
        .username;
    assert_ne!(renamed, taken);
    assert!(renamed.starts_with(&taken));

    // The same chat keeps its profile
    let again = db::get_or_create_user_profile(pool, &identity).await?;
    assert_eq!(again.user_id, second.user_id);
    Ok(())
}

#[tokio::test]
async fn test_dictionary_operations() -> Result<()> {
    skip_if_no_db!(test_dictionary_operations_impl)
}

async fn test_dictionary_operations_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "dicts").await?;

    let food = dictionary::create_dictionary(pool, profile.user_id, "Food").await??;
    assert_eq!(food.name, "Food");

    let duplicate = dictionary::create_dictionary(pool, profile.user_id, "Food").await?;
    assert_eq!(
        duplicate,
        Err(DictionaryError::Exists {
            name: "Food".to_string()
        })
    );

    let empty = dictionary::create_dictionary(pool, profile.user_id, "   ").await?;
    assert_eq!(empty, Err(DictionaryError::EmptyName));

    let list = dictionary::dictionaries_for_user(pool, profile.user_id).await?;
    assert_eq!(list.len(), 1);

    assert!(dictionary::delete_dictionary(pool, food.id).await?);
    assert!(dictionary::get_dictionary(pool, food.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_identical_pair_creates_no_duplicates() -> Result<()> {
    skip_if_no_db!(test_identical_pair_creates_no_duplicates_impl)
}

async fn test_identical_pair_creates_no_duplicates_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "dedup").await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Animals").await??;

    let first = added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat - кот", None).await?);
    assert_eq!(first.groups_count, 1);
    assert_eq!(first.merged_count, 0);

    let second = added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "Cat - кот", None).await?);
    assert_eq!(second.merged_count, 1);

    assert_eq!(user_phrase_count(pool, profile.user_id).await?, 2);
    assert_eq!(dictionary::phrase_groups_count(pool, dict.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_groups_merge_on_shared_pair() -> Result<()> {
    skip_if_no_db!(test_groups_merge_on_shared_pair_impl)
}

async fn test_groups_merge_on_shared_pair_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "merge").await?;
    let (en, ru) = languages(pool).await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Animals").await??;

    added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat - кот", None).await?);
    let report =
        added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat, kitty - кот", None).await?);
    assert_eq!(report.merged_count, 1);
    assert_eq!(dictionary::phrase_groups_count(pool, dict.id).await?, 1);

    // A pair not linked yet starts its own group
    added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat - кошка", None).await?);
    assert_eq!(dictionary::phrase_groups_count(pool, dict.id).await?, 2);

    let page = dictionary::dictionary_contents(pool, dict.id, ru.id, en.id, 0, 10).await?;
    let texts: Vec<&str> = page.phrases.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(texts, vec!["кот", "кошка"]);
    assert_eq!(page.total, 2);

    let kot = page.phrases[0].0;
    assert_eq!(
        phrases::translations(pool, kot, en.id).await?,
        vec!["cat".to_string(), "kitty".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_input_stores_nothing() -> Result<()> {
    skip_if_no_db!(test_rejected_input_stores_nothing_impl)
}

async fn test_rejected_input_stores_nothing_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "reject").await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Mixed").await??;

    let outcome =
        phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat - кот\nbroken", None).await?;
    match outcome {
        AddPhrasesOutcome::Rejected(error) => assert_eq!(error.line(), Some(2)),
        AddPhrasesOutcome::Added(_) => panic!("malformed input must be rejected"),
    }
    assert_eq!(user_phrase_count(pool, profile.user_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_edited_message_replaces_phrases() -> Result<()> {
    skip_if_no_db!(test_edited_message_replaces_phrases_impl)
}

async fn test_edited_message_replaces_phrases_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "edit").await?;
    let (en, ru) = languages(pool).await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Pets").await??;
    let source = SourceMessage {
        chat_id: profile.id,
        message_id: 100,
    };

    added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "dog - собака", Some(source)).await?);

    let outcome =
        phrases::replace_phrase_groups(pool, profile.user_id, dict.id, "dog - пёс", source).await?;
    assert!(matches!(outcome, Some(AddPhrasesOutcome::Added(_))));

    let page = dictionary::dictionary_contents(pool, dict.id, en.id, ru.id, 0, 10).await?;
    assert_eq!(page.total, 1);
    let dog = page.phrases[0].0;
    assert_eq!(phrases::translations(pool, dog, ru.id).await?, vec!["пёс".to_string()]);

    // Messages that never produced phrases are left alone
    let unknown = SourceMessage {
        chat_id: profile.id,
        message_id: 101,
    };
    assert!(phrases::replace_phrase_groups(pool, profile.user_id, dict.id, "dog - пёс", unknown)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_training_stats_and_completion() -> Result<()> {
    skip_if_no_db!(test_training_stats_and_completion_impl)
}

async fn test_training_stats_and_completion_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "train").await?;
    let (en, ru) = languages(pool).await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Words").await??;
    added(
        phrases::add_phrase_groups(pool, profile.user_id, dict.id, "cat - кот\ndog - собака", None).await?,
    );

    let spanning = dictionary::groups_spanning_both(pool, dict.id, en.id, ru.id).await?;
    assert_eq!(spanning, 2);

    let recent = RecentPhrasesCache::new(5, Duration::from_secs(3600));
    let first = training::next_phrase_for_training(pool, &recent, profile.user_id, dict.id, en.id, ru.id)
        .await?
        .context("no phrase")?;
    stats::record_answer(pool, profile.user_id, dict.id, first, true).await?;

    let counters = stats::dictionary_counters(pool, profile.user_id, dict.id, StatKind::Training).await?;
    assert!(!stats::is_training_completed(counters.trained_count, spanning));

    let second = training::next_phrase_for_training(pool, &recent, profile.user_id, dict.id, en.id, ru.id)
        .await?
        .context("no phrase")?;
    assert_ne!(first, second);
    stats::record_answer(pool, profile.user_id, dict.id, second, false).await?;

    let counters = stats::dictionary_counters(pool, profile.user_id, dict.id, StatKind::Training).await?;
    assert_eq!(counters.trained_count, 2);
    assert_eq!(counters.guessed_percent(), 50);
    assert!(stats::is_training_completed(counters.trained_count, spanning));

    let progress = stats::dictionary_progress(pool, profile.user_id, dict.id, Some(en.id)).await?;
    assert_eq!(progress.trained_phrases_count, 2);
    assert_eq!(progress.phrases_count, 2);

    stats::reset_training_stat(pool, profile.user_id, dict.id).await?;
    let training = stats::dictionary_counters(pool, profile.user_id, dict.id, StatKind::Training).await?;
    assert_eq!(training.trained_count, 0);
    let total = stats::dictionary_counters(pool, profile.user_id, dict.id, StatKind::Total).await?;
    assert_eq!(total.trained_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_permissions_by_role() -> Result<()> {
    skip_if_no_db!(test_permissions_by_role_impl)
}

async fn test_permissions_by_role_impl(pool: &PgPool) -> Result<()> {
    let owner = new_profile(pool, "owner").await?;
    let viewer = new_profile(pool, "viewer").await?;
    let editor = new_profile(pool, "editor").await?;
    let stranger = new_profile(pool, "stranger").await?;
    let dict = dictionary::create_dictionary(pool, owner.user_id, "Shared").await??;

    dictionary::add_viewer(pool, dict.id, viewer.user_id).await?;
    dictionary::add_editor(pool, dict.id, editor.user_id).await?;

    let can = |user_id: i64, permission: Permission| permissions::has_permission(pool, user_id, dict.id, permission);

    assert!(can(owner.user_id, Permission::DeleteDictionary).await?);
    assert!(can(viewer.user_id, Permission::ViewDictionary).await?);
    assert!(!can(viewer.user_id, Permission::AddPhraseGroup).await?);
    assert!(can(editor.user_id, Permission::AddPhraseGroup).await?);
    assert!(!can(editor.user_id, Permission::DeleteDictionary).await?);
    assert!(!can(stranger.user_id, Permission::ViewDictionary).await?);

    let shared = dictionary::dictionaries_for_user(pool, viewer.user_id).await?;
    assert!(shared.iter().any(|d| d.id == dict.id));
    Ok(())
}

#[tokio::test]
async fn test_clean_removes_orphans() -> Result<()> {
    skip_if_no_db!(test_clean_removes_orphans_impl)
}

async fn test_clean_removes_orphans_impl(pool: &PgPool) -> Result<()> {
    let profile = new_profile(pool, "clean").await?;
    let dict = dictionary::create_dictionary(pool, profile.user_id, "Temporary").await??;
    let source = SourceMessage {
        chat_id: profile.id,
        message_id: 7,
    };
    added(phrases::add_phrase_groups(pool, profile.user_id, dict.id, "sun - солнце", Some(source)).await?);

    dictionary::delete_dictionary(pool, dict.id).await?;
    assert_eq!(user_phrase_count(pool, profile.user_id).await?, 2);

    let report = maintenance::clean(pool).await?;
    assert!(report.orphaned_groups >= 1);
    assert!(report.orphaned_phrases >= 2);
    assert!(report.empty_message_entities >= 1);
    assert_eq!(user_phrase_count(pool, profile.user_id).await?, 0);
    Ok(())
}
