//! Clip finalization.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;

use camwatch_media::{write_clip, ClipSettings, Frame};
use camwatch_models::StreamKey;

use crate::error::{DetectorError, DetectorResult};

/// Timestamp format of clip file names.
pub const CLIP_NAME_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Turns a window's buffered frames into a clip file.
#[async_trait]
pub trait ClipFinalizer: Send + Sync {
    /// Write `frames` as a clip of `stream` and return its path.
    async fn finalize(&self, stream: &StreamKey, frames: &[Frame], fps: f64) -> DetectorResult<PathBuf>;
}

/// Writes clips through FFmpeg under `<clips_root>/<stream>/<timestamp>.mp4`.
#[derive(Debug, Clone)]
pub struct FfmpegClipFinalizer {
    clips_root: PathBuf,
    settings: ClipSettings,
}

impl FfmpegClipFinalizer {
    pub fn new(clips_root: impl Into<PathBuf>, settings: ClipSettings) -> Self {
        Self {
            clips_root: clips_root.into(),
            settings,
        }
    }

    /// Path of a new clip for `stream`.
    pub fn clip_path(&self, stream: &StreamKey) -> PathBuf {
        let name = format!("{}.mp4", Local::now().format(CLIP_NAME_FORMAT));
        self.clips_root.join(stream.to_string()).join(name)
    }
}

#[async_trait]
impl ClipFinalizer for FfmpegClipFinalizer {
    async fn finalize(&self, stream: &StreamKey, frames: &[Frame], fps: f64) -> DetectorResult<PathBuf> {
        let path = self.clip_path(stream);
        write_clip(frames, fps, &path, &self.settings)
            .await
            .map_err(|e| DetectorError::clip_finalize_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwatch_models::Modality;

    #[test]
    fn test_clip_path_layout() {
        let finalizer = FfmpegClipFinalizer::new("static/clips", ClipSettings::default());
        let path = finalizer.clip_path(&StreamKey::new("cam3", Modality::Rgb));

        assert!(path.starts_with("static/clips/cam3_rgb"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".mp4"));
        // YYYYmmdd_HHMMSS_micros.mp4
        assert_eq!(name.len(), 8 + 1 + 6 + 1 + 6 + 4);
    }

    #[tokio::test]
    async fn test_empty_clip_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let finalizer = FfmpegClipFinalizer::new(dir.path(), ClipSettings::default());
        let result = finalizer
            .finalize(&StreamKey::new("cam1", Modality::Rgb), &[], 30.0)
            .await;
        assert!(matches!(result, Err(DetectorError::ClipFinalizeFailed(_))));
    }
}
