//! Metrics collection and exposition.
//!
//! # Metrics
//! - `exgin_req_count` (counter): completed requests by status_code, path, method
//! - `exgin_req_latency` (histogram): request latency in seconds, same labels
//!
//! # Design Decisions
//! - The Prometheus recorder is built, not installed globally; every
//!   [`MetricsRegistry`] owns its own series, so tests get a fresh one
//! - Updates go through the recorder's atomics; no locks on the request path

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics::{counter, describe_counter, describe_histogram, histogram, with_local_recorder, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const REQ_COUNT: &str = "exgin_req_count";
pub const REQ_LATENCY: &str = "exgin_req_latency";

/// Default Prometheus histogram buckets, in seconds.
pub const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build Prometheus recorder: {0}")]
    Build(#[from] BuildError),
}

/// Process-lifetime request metrics.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Build a registry with its own recorder and latency buckets.
    pub fn new() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQ_LATENCY.to_string()), &LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(REQ_COUNT, "server request count");
            describe_histogram!(REQ_LATENCY, Unit::Seconds, "server request latency in seconds");
        });

        Ok(Self { recorder, handle })
    }

    /// One counter increment and one latency observation for a completed request.
    pub fn record(&self, status: u16, path: &str, method: &str, latency: Duration) {
        let labels = [
            ("status_code", status.to_string()),
            ("path", path.to_string()),
            ("method", method.to_string()),
        ];

        with_local_recorder(&self.recorder, || {
            counter!(REQ_COUNT, &labels).increment(1);
            histogram!(REQ_LATENCY, &labels).record(latency.as_secs_f64());
        });
    }

    /// Current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

/// Handler for the metrics scrape endpoint.
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], metrics.render())
}
