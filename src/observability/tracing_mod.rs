//! Log subscriber, OTLP trace export and the spans used around updates and
//! queries.

use anyhow::{Context, Result};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::observability_config::{LogFormat, ObservabilityConfig};

// Crate targets that follow LOG_LEVEL; dependencies stay at warn
const OWN_TARGETS: [&str; 2] = ["dictrainer", "clean"];
const QUIET_TARGETS: [&str; 3] = ["sqlx", "teloxide", "hyper"];

fn build_filter(log_level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for target in OWN_TARGETS {
        filter = filter.add_directive(format!("{}={}", target, log_level).parse()?);
    }
    for target in QUIET_TARGETS {
        filter = filter.add_directive(format!("{}=warn", target).parse()?);
    }
    Ok(filter)
}

/// Install the global log subscriber in the configured format
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_filter(&config.log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    }
    .context("Failed to install log subscriber")?;

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Logging initialized"
    );
    Ok(())
}

/// Register a batch OTLP exporter as the global tracer provider, if an
/// endpoint is configured
pub fn init_opentelemetry_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        tracing::debug!("No OTLP endpoint, trace export disabled");
        return Ok(());
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;

    let sampler = match config.trace_sampling_ratio {
        Some(ratio) => Sampler::TraceIdRatioBased(ratio),
        None => Sampler::AlwaysOn,
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(sampler)
        .build();
    opentelemetry::global::set_tracer_provider(provider);

    tracing::info!(
        otlp_endpoint = %endpoint,
        sampling_ratio = ?config.trace_sampling_ratio,
        "OTLP trace export enabled"
    );
    Ok(())
}

/// Span around a database query
pub fn db_span(operation: &str, table: &str) -> tracing::Span {
    tracing::debug_span!("db", operation = operation, table = table)
}

/// Span around the handling of one Telegram update
pub fn telegram_span(operation: &str, user_id: Option<i64>) -> tracing::Span {
    tracing::info_span!("update", operation = operation, user_id = user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_configured_level() {
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("loud").is_err());
    }
}
