//! Detector error types.

use thiserror::Error;

use camwatch_models::StreamKey;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Unknown stream: {0}")]
    UnknownStream(StreamKey),

    #[error("Clip finalize failed: {0}")]
    ClipFinalizeFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] camwatch_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub fn clip_finalize_failed(msg: impl Into<String>) -> Self {
        Self::ClipFinalizeFailed(msg.into())
    }
}
