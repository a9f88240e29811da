//! Health check functionality module.

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

/// Body of `/health/ready`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.status == "ok"
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"status\":\"{}\"}}", self.status))
    }
}

/// Perform readiness checks against the bot's dependencies
pub async fn perform_readiness_checks(db_pool: Option<Arc<PgPool>>) -> Result<()> {
    if let Some(pool) = &db_pool {
        check_database_health(pool.as_ref()).await?;
    }

    Ok(())
}

/// Run the readiness checks and describe the outcome
pub async fn readiness_report(db_pool: Option<Arc<PgPool>>) -> ReadinessReport {
    let has_db = db_pool.is_some();
    match perform_readiness_checks(db_pool).await {
        Ok(()) => ReadinessReport {
            status: "ok",
            database: if has_db { "ok" } else { "not_configured" },
            error: None,
        },
        Err(e) => ReadinessReport {
            status: "not_ready",
            database: "unavailable",
            error: Some(e.to_string()),
        },
    }
}

/// Check database connectivity and basic query capability
pub async fn check_database_health(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;

    tracing::debug!("Database health check passed");
    Ok(())
}
