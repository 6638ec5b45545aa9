//! Structured logging plus the `/health` and `/metrics` HTTP surface
//! (spec §4.I — ambient observability, not the alert routing the spec's
//! non-goals exclude).
//!
//! `tracing`/`tracing-subscriber` give structured logs the way every repo
//! in the pack sets them up; `prometheus` + `axum` serve the process's own
//! operational metrics, grounded on `pgtrickle-relay`'s "Metrics + health
//! (always required)" dependency comment — analogous to the teacher's own
//! `monitor.rs` alerting on its operational state rather than the business
//! data it moves.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

pub fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .init();
}

/// Process-level judging metrics, independent of any single turn or
/// strategy — one instance lives for the process lifetime.
pub struct Telemetry {
    registry: Registry,
    evaluations_total: IntCounter,
    emissions_total: IntCounterVec,
    suppressed_total: IntCounterVec,
    query_errors_total: IntCounter,
    turn_duration_seconds: HistogramVec,
    last_tick_unix: Arc<AtomicI64>,
}

impl Telemetry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let evaluations_total =
            IntCounter::new("judge_evaluations_total", "Strategy evaluations attempted").unwrap();
        let emissions_total = IntCounterVec::new(
            prometheus::Opts::new("judge_emissions_total", "Events emitted"),
            &["status"],
        )
        .unwrap();
        let suppressed_total = IntCounterVec::new(
            prometheus::Opts::new("judge_suppressed_total", "Evaluations suppressed"),
            &["reason"],
        )
        .unwrap();
        let query_errors_total = IntCounter::new(
            "judge_query_errors_total",
            "Graph backend query failures",
        )
        .unwrap();
        let turn_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "judge_turn_duration_seconds",
                "Wall-clock duration of one scheduler turn",
            ),
            &[],
        )
        .unwrap();

        registry.register(Box::new(evaluations_total.clone())).unwrap();
        registry.register(Box::new(emissions_total.clone())).unwrap();
        registry.register(Box::new(suppressed_total.clone())).unwrap();
        registry.register(Box::new(query_errors_total.clone())).unwrap();
        registry.register(Box::new(turn_duration_seconds.clone())).unwrap();

        Self {
            registry,
            evaluations_total,
            emissions_total,
            suppressed_total,
            query_errors_total,
            turn_duration_seconds,
            last_tick_unix: Arc::new(AtomicI64::new(now_unix())),
        }
    }

    pub fn record_evaluation(&self) {
        self.evaluations_total.inc();
    }

    pub fn record_emission(&self, status: &str) {
        self.emissions_total.with_label_values(&[status]).inc();
    }

    pub fn record_suppressed(&self, reason: &str) {
        self.suppressed_total.with_label_values(&[reason]).inc();
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.inc();
    }

    pub fn observe_turn_duration(&self, seconds: f64) {
        self.turn_duration_seconds
            .with_label_values(&[])
            .observe(seconds);
        self.last_tick_unix.store(now_unix(), Ordering::Relaxed);
    }

    fn encode(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buf)
            .expect("prometheus text encoding cannot fail");
        String::from_utf8(buf).expect("prometheus output is always valid UTF-8")
    }

    fn last_tick_age_secs(&self) -> i64 {
        now_unix() - self.last_tick_unix.load(Ordering::Relaxed)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

async fn metrics_handler(State(telemetry): State<Arc<Telemetry>>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        telemetry.encode(),
    )
}

async fn health_handler(State(telemetry): State<Arc<Telemetry>>) -> impl IntoResponse {
    let age = telemetry.last_tick_age_secs();
    axum::Json(serde_json::json!({
        "status": "ok",
        "last_tick_age_secs": age,
    }))
}

/// Bind and serve `/health` and `/metrics` until the process exits.
pub async fn serve(telemetry: Arc<Telemetry>, addr: &str) -> Result<(), CliError> {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(telemetry);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::TelemetryBind {
            addr: addr.to_string(),
            source,
        })?;

    axum::serve(listener, router)
        .await
        .map_err(|e| CliError::TelemetryBind {
            addr: addr.to_string(),
            source: std::io::Error::other(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_encode_with_the_spec_named_metric_families() {
        let telemetry = Telemetry::new();
        telemetry.record_evaluation();
        telemetry.record_emission("PROBLEM");
        telemetry.record_suppressed("interval");
        telemetry.record_query_error();
        telemetry.observe_turn_duration(0.5);

        let text = telemetry.encode();
        for name in [
            "judge_evaluations_total",
            "judge_emissions_total",
            "judge_suppressed_total",
            "judge_query_errors_total",
            "judge_turn_duration_seconds",
        ] {
            assert!(text.contains(name), "missing metric family {name}");
        }
    }

    #[test]
    fn fresh_telemetry_has_near_zero_tick_age() {
        let telemetry = Telemetry::new();
        assert!(telemetry.last_tick_age_secs() <= 1);
    }
}
