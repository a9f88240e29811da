//! Prometheus recorder, the monitoring HTTP server and the counters the bot
//! records.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use tokio::net::TcpListener;

use super::health_checks::readiness_report;
use crate::cache::CacheStats;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

async fn route(
    req: Request<Incoming>,
    metrics_handle: PrometheusHandle,
    db_pool: Option<Arc<PgPool>>,
) -> Result<Response<String>, Infallible> {
    if req.method() != Method::GET {
        return Ok(respond(StatusCode::METHOD_NOT_ALLOWED, "text/plain", String::new()));
    }

    let response = match req.uri().path() {
        "/metrics" => respond(StatusCode::OK, PROMETHEUS_CONTENT_TYPE, metrics_handle.render()),
        "/health/live" => respond(StatusCode::OK, "text/plain", "OK".to_string()),
        "/health/ready" => {
            let report = readiness_report(db_pool).await;
            let status = if report.is_ready() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            respond(status, "application/json", report.to_json())
        }
        _ => respond(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string()),
    };
    Ok(response)
}

/// Serve `/metrics`, `/health/live` and `/health/ready` on `port` from a
/// background task
pub async fn start_metrics_server(
    metrics_handle: PrometheusHandle,
    port: u16,
    db_pool: Option<Arc<PgPool>>,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", addr))?;
    tracing::info!(%addr, "Metrics server listening");

    tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept metrics connection");
                    continue;
                }
            };

            let metrics_handle = metrics_handle.clone();
            let db_pool = db_pool.clone();
            tokio::spawn(async move {
                let service =
                    service_fn(move |req| route(req, metrics_handle.clone(), db_pool.clone()));
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    tracing::debug!(%peer, error = ?e, "Metrics connection closed with error");
                }
            });
        }
    });

    Ok(())
}

/// Record one database query and its latency
pub fn record_db_metrics(operation: &'static str, duration: Duration) {
    metrics::counter!("db_queries_total", "operation" => operation).increment(1);
    metrics::histogram!("db_query_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record a handled update: `kind` is message, edited or callback
pub fn record_request_metrics(kind: &'static str, status: u16, duration: Duration) {
    metrics::counter!("updates_handled_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("update_duration_seconds", "kind" => kind).record(duration.as_secs_f64());
}

pub fn record_error_metrics(error_type: &'static str, component: &'static str) {
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}

/// Record an inbound Telegram update by content type
pub fn record_telegram_message(message_type: &'static str) {
    metrics::counter!("telegram_updates_total", "type" => message_type).increment(1);
}

/// Record an outbound Telegram call that had to be retried
pub fn record_telegram_retry(operation: &'static str) {
    metrics::counter!("telegram_retries_total", "operation" => operation).increment(1);
}

pub fn record_phrases_added(groups: usize, phrases: usize) {
    metrics::counter!("phrase_groups_added_total").increment(groups as u64);
    metrics::counter!("phrases_added_total").increment(phrases as u64);
}

pub fn record_training_answer(guessed: bool) {
    let result = if guessed { "guessed" } else { "missed" };
    metrics::counter!("training_answers_total", "result" => result).increment(1);
}

/// Publish a snapshot of the recent-phrases cache
pub fn record_cache_metrics(stats: &CacheStats, capacity: usize) {
    metrics::gauge!("recent_cache_entries").set(stats.entries as f64);
    metrics::gauge!("recent_cache_capacity").set(capacity as f64);
    metrics::gauge!("recent_cache_hit_ratio").set(stats.hit_ratio());
    metrics::counter!("recent_cache_lookups_total", "result" => "hit").absolute(stats.hits);
    metrics::counter!("recent_cache_lookups_total", "result" => "miss").absolute(stats.misses);
}

pub fn record_startup_metrics(duration: Duration) {
    metrics::gauge!("startup_duration_seconds").set(duration.as_secs_f64());
    metrics::counter!("bot_starts_total").increment(1);
}
