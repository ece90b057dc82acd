use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::AppState;

/// Request metrics exposed on `/metrics`.
pub struct RequestMetrics {
    registry: Registry,
    duration: HistogramVec,
    requests: IntCounterVec,
    slow_threshold: Duration,
}

impl RequestMetrics {
    pub fn new(namespace: &str, slow_threshold: Duration) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .namespace(namespace),
            &["method", "path", "status"],
        )?;
        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served").namespace(namespace),
            &["method", "path", "status"],
        )?;

        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(requests.clone()))?;

        Ok(Self {
            registry,
            duration,
            requests,
            slow_threshold,
        })
    }

    pub fn observe(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.requests.with_label_values(&labels).inc();
    }

    pub fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed >= self.slow_threshold
    }

    pub fn encode(&self) -> prometheus::Result<String> {
        prometheus::TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

pub async fn timing_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // route templates keep label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();
    let status = response.status().as_u16();

    if state.config.monitoring.metrics_enabled {
        state.metrics.observe(&method, &path, status, elapsed);
    }

    if state.metrics.is_slow(elapsed) {
        tracing::warn!(
            method = %method,
            path = %path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow request"
        );
    }

    response
}
