//! Axum HTTP/WS server for the camwatch replay pipeline.
//!
//! This crate provides:
//! - The event hub (recent-event ring buffer and WebSocket fan-out)
//! - Admin endpoints: start streams, logs, warnings, velocity analysis
//! - MJPEG live view and clip file serving
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use hub::EventHub;
pub use routes::create_router;
pub use state::AppState;
