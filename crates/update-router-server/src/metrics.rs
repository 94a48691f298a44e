//! Prometheus metrics sink.
//!
//! The recorder is owned by [`Metrics`] and passed explicitly to the
//! pipeline; nothing is installed as the process-global recorder.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | `method`, `handler`, `code` |
//! | `http_request_duration_seconds` | Histogram | `method`, `handler`, `code` |
//! | `channel_requests_total` | Counter | `url` |

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, routing::get};
use ::metrics::{counter, describe_counter, describe_histogram, histogram, with_local_recorder};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

/// Request counter name.
pub const REQUESTS_TOTAL: &str = "http_requests_total";
/// Request latency histogram name.
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
/// Channel decision counter name.
pub const CHANNEL_REQUESTS_TOTAL: &str = "channel_requests_total";

/// Default buckets: 5ms .. 10s.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

/// Cloneable handle to the service's metrics recorder.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

impl Metrics {
    /// Build a new, empty metrics registry.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
            describe_histogram!(REQUEST_DURATION, "HTTP request duration in seconds");
            describe_counter!(CHANNEL_REQUESTS_TOTAL, "Channel decisions by target URL");
        });

        Ok(Self {
            inner: Arc::new(Inner { recorder, handle }),
        })
    }

    /// Record a completed request.
    pub fn record_request(&self, method: &str, handler: &str, status: u16, duration: Duration) {
        let code = status.to_string();
        with_local_recorder(&self.inner.recorder, || {
            counter!(
                REQUESTS_TOTAL,
                "method" => method.to_string(),
                "handler" => handler.to_string(),
                "code" => code.clone()
            )
            .increment(1);
            histogram!(
                REQUEST_DURATION,
                "method" => method.to_string(),
                "handler" => handler.to_string(),
                "code" => code
            )
            .record(duration.as_secs_f64());
        });
    }

    /// Record a channel decision.
    pub fn record_channel(&self, url: &str) {
        with_local_recorder(&self.inner.recorder, || {
            counter!(CHANNEL_REQUESTS_TOTAL, "url" => url.to_string()).increment(1);
        });
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    /// Drain histogram buffers. Call periodically.
    pub fn run_upkeep(&self) {
        self.inner.handle.run_upkeep();
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

/// GET /metrics
async fn render_metrics(State(metrics): State<Metrics>) -> String {
    metrics.render()
}

/// Router exposing `/metrics`, served on the metrics address.
pub fn router(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}
