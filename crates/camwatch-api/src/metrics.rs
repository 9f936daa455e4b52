//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "camwatch_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "camwatch_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "camwatch_http_requests_in_flight";

    // WebSocket metrics
    pub const WS_CONNECTIONS_TOTAL: &str = "camwatch_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "camwatch_ws_connections_active";
    pub const WS_MESSAGES_SENT: &str = "camwatch_ws_messages_sent_total";

    // Event metrics
    pub const EVENTS_TOTAL: &str = "camwatch_events_total";
    pub const EVENTS_DROPPED_TOTAL: &str = "camwatch_events_dropped_total";

    // Live view metrics
    pub const LIVE_VIEWERS_ACTIVE: &str = "camwatch_live_viewers_active";
}

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

/// Record WebSocket connection.
pub fn record_ws_connection(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::WS_CONNECTIONS_TOTAL, &labels).increment(1);
}

/// Update active WebSocket connections gauge.
pub fn set_ws_active_connections(count: i64) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record WebSocket message sent.
pub fn record_ws_message_sent(endpoint: &str, message_type: &str) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("type", message_type.to_string()),
    ];
    counter!(names::WS_MESSAGES_SENT, &labels).increment(1);
}

/// Record an event accepted by the hub.
pub fn record_event(label: &str) {
    let labels = [("label", label.to_string())];
    counter!(names::EVENTS_TOTAL, &labels).increment(1);
}

/// Record an event dropped for a lagging subscriber.
pub fn record_event_dropped() {
    counter!(names::EVENTS_DROPPED_TOTAL).increment(1);
}

pub fn live_viewer_connected() {
    gauge!(names::LIVE_VIEWERS_ACTIVE).increment(1.0);
}

pub fn live_viewer_disconnected() {
    gauge!(names::LIVE_VIEWERS_ACTIVE).decrement(1.0);
}

/// Label for paths that match no route.
const UNMATCHED_PATH: &str = "/:unmatched";

/// Map a request path to its route template so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let route = match segments.as_slice() {
        ["logs"] => "/logs",
        ["current-warning"] => "/current-warning",
        ["streams", "start"] => "/streams/start",
        ["ws"] => "/ws",
        ["health"] => "/health",
        ["metrics"] => "/metrics",
        ["stream", _] => "/stream/:cam",
        ["clear_warning", _] => "/clear_warning/:cam",
        ["analyze_velocity", _, _] => "/analyze_velocity/:cam/:mode",
        ["clips", ..] => "/clips/:clip",
        _ => UNMATCHED_PATH,
    };
    route.to_string()
}

/// Metrics middleware for HTTP requests.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/stream/cam1"), "/stream/:cam");
        assert_eq!(sanitize_path("/analyze_velocity/cam2/rgb"), "/analyze_velocity/:cam/:mode");
        assert_eq!(sanitize_path("/clips/cam1_rgb/20240501_120000_000001.mp4"), "/clips/:clip");
        assert_eq!(sanitize_path("/logs"), "/logs");
        assert_eq!(sanitize_path("/streams/start"), "/streams/start");
    }

    #[test]
    fn test_unknown_paths_share_one_label() {
        assert_eq!(sanitize_path("/wp-admin/setup.php"), UNMATCHED_PATH);
        assert_eq!(sanitize_path("/.env"), UNMATCHED_PATH);
        assert_eq!(sanitize_path("/stream/cam1/extra"), UNMATCHED_PATH);
        assert_eq!(sanitize_path("/logs/123"), UNMATCHED_PATH);
    }
}
