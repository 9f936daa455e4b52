//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::services::ServeDir;

use crate::error::hide_internal_details;
use crate::handlers::health;
use crate::handlers::logs::get_logs;
use crate::handlers::streams::{start_streams, stream_camera};
use crate::handlers::velocity::analyze_velocity;
use crate::handlers::warnings::{clear_warning, get_current_warning};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;
use crate::ws::ws_events;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    hide_internal_details(state.config.is_production());

    let event_routes = Router::new()
        .route("/logs", get(get_logs))
        .route("/current-warning", get(get_current_warning))
        .route("/clear_warning/:cam", post(clear_warning))
        .route("/analyze_velocity/:cam/:mode", get(analyze_velocity));

    let stream_routes = Router::new()
        .route("/streams/start", post(start_streams))
        .route("/stream/:cam", get(stream_camera));

    let ws_routes = Router::new().route("/ws", get(ws_events));

    let health_routes = Router::new().route("/health", get(health));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let clips = ServeDir::new(state.supervisor.config().clips_root());

    Router::new()
        .merge(event_routes)
        .merge(stream_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest_service("/clips", clips)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
