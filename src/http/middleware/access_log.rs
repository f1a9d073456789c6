//! Structured access logging and request metrics.
//!
//! # Responsibilities
//! - Time every request and expose a [`RequestContext`] to handlers
//! - Flag slow requests
//! - One structured log line per request, level chosen by outcome
//! - One counter increment and one latency observation per request, labelled
//!   with the matched route template

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::http::request::{client_ip, request_host, trace_id, RequestContext};
use crate::observability::metrics::MetricsRegistry;

pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(3);

/// Substituted for an empty query string in log lines.
const EMPTY_QUERY: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Error level when the handler reported errors or the status is a server error.
pub fn classify(status: u16, error_count: usize) -> LogLevel {
    if error_count > 0 || status >= 500 {
        LogLevel::Error
    } else {
        LogLevel::Info
    }
}

#[derive(Debug, Clone)]
pub struct AccessLogState {
    pub metrics: Arc<MetricsRegistry>,
    pub slow_threshold: Duration,
    skip_paths: Arc<HashSet<String>>,
}

impl AccessLogState {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            metrics,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            skip_paths: Arc::new(HashSet::new()),
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Paths whose log lines are suppressed (health probes and the like).
    /// Their metrics are still recorded.
    pub fn with_skip_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.skip_paths = Arc::new(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_skipped(&self, path: &str) -> bool {
        self.skip_paths.contains(path)
    }
}

pub async fn access_log_middleware(
    State(state): State<AccessLogState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    // Route template for the metric label; raw path only when nothing matched.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let method = request.method().to_string();
    let query = request
        .uri()
        .query()
        .filter(|q| !q.is_empty())
        .unwrap_or(EMPTY_QUERY)
        .to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let host = request_host(&request).unwrap_or_default();
    let client_ip = client_ip(&request).unwrap_or_else(|| "-".to_string());

    let ctx = RequestContext::new(trace_id(&request).unwrap_or_default());
    request.extensions_mut().insert(ctx.clone());

    let response = next.run(request).await;

    let latency = ctx.started().elapsed();
    let status = response.status().as_u16();

    if !state.is_skipped(&path) {
        if latency > state.slow_threshold {
            tracing::warn!(
                path = %path,
                latency_ms = latency.as_millis() as u64,
                "Slow request"
            );
        }

        match classify(status, ctx.error_count()) {
            LogLevel::Error => tracing::error!(
                trace_id = %ctx.trace_id(),
                status,
                client_ip = %client_ip,
                user_agent = %user_agent,
                method = %method,
                host = %host,
                path = %path,
                query = %query,
                latency_ms = latency.as_millis() as u64,
                errors = %ctx.error_text(),
                "Request failed"
            ),
            LogLevel::Info => tracing::info!(
                trace_id = %ctx.trace_id(),
                status,
                client_ip = %client_ip,
                user_agent = %user_agent,
                method = %method,
                host = %host,
                path = %path,
                query = %query,
                latency_ms = latency.as_millis() as u64,
                "Request completed"
            ),
        }
    }

    state.metrics.record(status, &route, &method, latency);

    response
}
