//! Prometheus metrics for the API server.
//!
//! Conversion metrics are recorded by `kobalt_converter::metrics`; this module
//! installs the recorder and adds the HTTP-level series.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "kobalt_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "kobalt_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "kobalt_http_requests_in_flight";

    pub const SSE_STREAMS_ACTIVE: &str = "kobalt_sse_streams_active";
    pub const DEADLINE_EXCEEDED_TOTAL: &str = "kobalt_convert_deadline_exceeded_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "kobalt_rate_limit_hits_total";
}

/// Known routes; anything else is labelled "other" to bound cardinality.
const KNOWN_PATHS: &[&str] = &["/api/v1/convert", "/health", "/healthz", "/ready", "/metrics"];

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn sse_stream_opened() {
    gauge!(names::SSE_STREAMS_ACTIVE).increment(1.0);
}

pub fn sse_stream_closed() {
    gauge!(names::SSE_STREAMS_ACTIVE).decrement(1.0);
}

pub fn record_deadline_exceeded() {
    counter!(names::DEADLINE_EXCEEDED_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn sanitize_path(path: &str) -> String {
    if KNOWN_PATHS.contains(&path) {
        path.to_string()
    } else {
        "other".to_string()
    }
}

/// Metrics middleware for HTTP requests.
///
/// For the event stream the duration covers the time to response headers,
/// not the lifetime of the stream.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
