//! API error types.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use camwatch_detector::DetectorError;
use camwatch_models::ModelError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Whether internal error details are replaced by a generic message.
static HIDE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Hide internal error details from responses (production).
pub fn hide_internal_details(hide: bool) {
    HIDE_INTERNAL_DETAILS.store(hide, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Detector error: {0}")]
    Detector(DetectorError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Response detail, with internal errors masked when `hide_internal` is set.
    fn public_detail(&self, hide_internal: bool) -> String {
        match self {
            ApiError::Internal(_) | ApiError::Detector(_) if hide_internal => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Detector(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DetectorError> for ApiError {
    fn from(e: DetectorError) -> Self {
        match e {
            DetectorError::UnknownStream(key) => ApiError::not_found(format!("Unknown stream: {}", key)),
            other => ApiError::Detector(other),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.public_detail(HIDE_INTERNAL_DETAILS.load(Ordering::Relaxed));

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwatch_models::{Modality, StreamKey};

    #[test]
    fn test_detector_errors_map_to_status() {
        let err: ApiError = DetectorError::UnknownStream(StreamKey::new("cam9", Modality::Rgb)).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = DetectorError::clip_finalize_failed("exit 1").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_detail_is_masked() {
        let err = ApiError::internal("ffprobe exploded");
        assert_eq!(err.public_detail(false), "Internal error: ffprobe exploded");
        assert_eq!(err.public_detail(true), "An internal error occurred");

        let err = ApiError::bad_request("Unknown modality: xray");
        assert_eq!(err.public_detail(true), "Bad request: Unknown modality: xray");
    }
}
