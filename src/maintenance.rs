//! Database cleanup of rows no dictionary can reach any more

use std::fmt;

use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use tracing::info;

/// Rows removed by one [`clean`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub orphaned_groups: u64,
    pub orphaned_phrases: u64,
    pub empty_groups: u64,
    pub empty_message_entities: u64,
}

impl CleanReport {
    pub fn total(&self) -> u64 {
        self.orphaned_groups + self.orphaned_phrases + self.empty_groups + self.empty_message_entities
    }
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "deleted orphaned groups: {}", self.orphaned_groups)?;
        writeln!(f, "deleted orphaned phrases: {}", self.orphaned_phrases)?;
        writeln!(f, "deleted empty groups: {}", self.empty_groups)?;
        write!(f, "deleted empty message entities: {}", self.empty_message_entities)
    }
}

// Order matters: deleting orphaned groups frees their phrases, and deleting
// orphaned phrases empties groups and message entities.
const CLEANUP_STEPS: [(&str, &str); 4] = [
    (
        "orphaned phrase groups",
        "DELETE FROM phrase_groups g
         WHERE NOT EXISTS (SELECT 1 FROM dictionary_phrase_groups d WHERE d.phrase_group_id = g.id)",
    ),
    (
        "orphaned phrases",
        "DELETE FROM phrases p
         WHERE NOT EXISTS (SELECT 1 FROM phrase_group_phrases gp WHERE gp.phrase_id = p.id)",
    ),
    (
        "empty phrase groups",
        "DELETE FROM phrase_groups g
         WHERE NOT EXISTS (SELECT 1 FROM phrase_group_phrases gp WHERE gp.phrase_group_id = g.id)",
    ),
    (
        "empty message entities",
        "DELETE FROM message_entities m
         WHERE NOT EXISTS (SELECT 1 FROM message_entity_phrases mp WHERE mp.message_entity_id = m.id)",
    ),
];

/// Delete orphaned groups and phrases, then groups and message entities left
/// without phrases, in one transaction
pub async fn clean(pool: &PgPool) -> Result<CleanReport> {
    let mut tx = pool.begin().await.context("Failed to begin cleanup transaction")?;
    let mut counts = [0u64; 4];

    for (count, (name, sql)) in counts.iter_mut().zip(CLEANUP_STEPS) {
        *count = sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete {}", name))?
            .rows_affected();
    }

    tx.commit().await.context("Failed to commit cleanup")?;

    let [orphaned_groups, orphaned_phrases, empty_groups, empty_message_entities] = counts;
    let report = CleanReport {
        orphaned_groups,
        orphaned_phrases,
        empty_groups,
        empty_message_entities,
    };
    info!(
        orphaned_groups = report.orphaned_groups,
        orphaned_phrases = report.orphaned_phrases,
        empty_groups = report.empty_groups,
        empty_message_entities = report.empty_message_entities,
        "Database cleanup finished"
    );
    Ok(report)
}
