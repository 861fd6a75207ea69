//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the metrics
//! port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Label value for invocations whose function name did not parse.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Invocations by `function` and `outcome` (`ok` or an error kind).
    pub invocations_total: IntCounterVec,
    /// Invocation latency in seconds, by `function`.
    pub invocation_latency_seconds: HistogramVec,
    /// Invocations that committed at least one write.
    pub transactions_committed_total: IntCounter,
    /// Keys written or deleted across all commits.
    pub committed_ops_total: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("estate".into()), None)?;

        let invocations_total = IntCounterVec::new(
            Opts::new("invocations_total", "Contract invocations by function and outcome"),
            &["function", "outcome"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let invocation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "invocation_latency_seconds",
                "Time from receipt to commit or rejection, in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["function"],
        )?;
        registry.register(Box::new(invocation_latency_seconds.clone()))?;

        let transactions_committed_total = IntCounter::new(
            "transactions_committed_total",
            "Invocations whose writes were committed to the world state",
        )?;
        registry.register(Box::new(transactions_committed_total.clone()))?;

        let committed_ops_total = IntCounter::new(
            "committed_ops_total",
            "Puts and deletes applied by committed invocations",
        )?;
        registry.register(Box::new(committed_ops_total.clone()))?;

        Ok(Self {
            registry,
            invocations_total,
            invocation_latency_seconds,
            transactions_committed_total,
            committed_ops_total,
        })
    }

    /// Record one finished invocation.
    pub fn observe(&self, function: &str, outcome: &str, elapsed: Duration, committed: usize) {
        self.invocations_total
            .with_label_values(&[function, outcome])
            .inc();
        self.invocation_latency_seconds
            .with_label_values(&[function])
            .observe(elapsed.as_secs_f64());
        if committed > 0 {
            self.transactions_committed_total.inc();
            self.committed_ops_total.inc_by(committed as u64);
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
