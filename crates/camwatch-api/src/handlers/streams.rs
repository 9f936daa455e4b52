//! Stream control and MJPEG live view.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use camwatch_models::{Modality, StreamKey};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart boundary of the live view.
pub const MJPEG_BOUNDARY: &str = "frame";

#[derive(Serialize)]
pub struct StartResponse {
    pub status: &'static str,
    pub workers: usize,
}

/// Start every stream worker. Repeated calls are no-ops.
pub async fn start_streams(State(state): State<AppState>) -> Json<StartResponse> {
    if state.supervisor.is_started() {
        return Json(StartResponse {
            status: "already_running",
            workers: 0,
        });
    }

    let workers = state.supervisor.start_all().await;
    Json(StartResponse {
        status: "started",
        workers,
    })
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub mode: Option<String>,
}

/// One multipart part holding a JPEG frame.
pub fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let head = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", MJPEG_BOUNDARY);
    let mut part = Vec::with_capacity(head.len() + jpeg.len() + 2);
    part.extend_from_slice(head.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// Decrements the live-viewer gauge when the response stream is dropped.
struct ViewerGuard;

impl ViewerGuard {
    fn new() -> Self {
        metrics::live_viewer_connected();
        Self
    }
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        metrics::live_viewer_disconnected();
    }
}

/// MJPEG live view of a camera (`?mode=rgb|thermal`, default rgb).
pub async fn stream_camera(
    State(state): State<AppState>,
    Path(cam): Path<String>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let modality: Modality = query.mode.as_deref().unwrap_or("rgb").parse()?;
    let key = StreamKey::new(cam, modality);
    let receiver = state.supervisor.subscribe_live(&key)?;
    info!(stream = %key, "Live viewer connected");

    let frames = stream::unfold((receiver, ViewerGuard::new()), |(mut receiver, guard)| async move {
        loop {
            match receiver.recv().await {
                Ok(jpeg) => return Some((Ok::<_, Infallible>(mjpeg_part(&jpeg)), (receiver, guard))),
                Err(RecvError::Lagged(skipped)) => debug!("Live viewer skipped {} frames", skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .map_err(|e| ApiError::internal(e.to_string()))
}
