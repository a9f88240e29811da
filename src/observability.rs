//! Logging, trace export, Prometheus metrics and health endpoints.
//!
//! [`init_observability`] wires everything from an [`ObservabilityConfig`];
//! the `record_*` helpers are what handlers call.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::observability_config::ObservabilityConfig;

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

pub use self::metrics::{
    record_cache_metrics, record_db_metrics, record_error_metrics, record_phrases_added,
    record_request_metrics, record_startup_metrics, record_telegram_message,
    record_telegram_retry, record_training_answer,
};
pub use self::tracing_mod::{db_span, init_tracing_with_config, telegram_span};

/// Install the log subscriber, the optional OTLP exporter and, when a port
/// is configured, the metrics server whose readiness probe checks `db_pool`
pub async fn init_observability(
    config: &ObservabilityConfig,
    db_pool: Option<Arc<PgPool>>,
) -> Result<()> {
    config.validate()?;

    tracing_mod::init_tracing_with_config(config)?;
    tracing_mod::init_opentelemetry_tracing_with_config(config)?;

    match config.metrics_port {
        Some(port) => {
            let handle = self::metrics::init_metrics()?;
            self::metrics::start_metrics_server(handle, port, db_pool).await?;
        }
        None => tracing::info!("Metrics export disabled"),
    }

    Ok(())
}
