//! Clip writing: raw frames → temporary container → transcoded clip.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::command::{check_status, spawn_progress_reader, FfmpegCommand, FfmpegRunner, STDIN_INPUT};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Suffix of the intermediate container written before transcoding.
pub const TEMP_SUFFIX: &str = "_temp";

/// Encoding settings for finalized clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSettings {
    /// Codec of the intermediate container
    pub temp_codec: String,
    /// Codec of the final clip
    pub codec: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            temp_codec: "mpeg4".to_string(),
            codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 23,
        }
    }
}

/// Temporary path for a final clip path (`a/b.mp4` → `a/b_temp.mp4`).
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = final_path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string());
    final_path.with_file_name(format!("{}{}.{}", stem, TEMP_SUFFIX, ext))
}

/// Write `frames` to `final_path`.
///
/// Frames are piped into a temporary container at `fps`, the container is
/// transcoded into the final clip, and the temporary file is removed whether
/// or not the transcode succeeded.
pub async fn write_clip(
    frames: &[Frame],
    fps: f64,
    final_path: &Path,
    settings: &ClipSettings,
) -> MediaResult<PathBuf> {
    let first = frames
        .first()
        .ok_or_else(|| MediaError::clip_finalize_failed("no frames to write"))?;
    let (width, height) = (first.width(), first.height());

    if let Some(parent) = final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(final_path);

    let result = async {
        write_raw_container(frames, width, height, fps, &temp_path, settings).await?;
        transcode(&temp_path, final_path, settings).await
    }
    .await;

    cleanup_file(&temp_path).await;

    match result {
        Ok(()) => {
            info!(
                "[CLIP] Wrote {} frames ({}x{} @ {:.2}fps) to {}",
                frames.len(),
                width,
                height,
                fps,
                final_path.display()
            );
            Ok(final_path.to_path_buf())
        }
        Err(e) => Err(MediaError::clip_finalize_failed(format!(
            "{}: {}",
            final_path.display(),
            e
        ))),
    }
}

async fn write_raw_container(
    frames: &[Frame],
    width: u32,
    height: u32,
    fps: f64,
    temp_path: &Path,
    settings: &ClipSettings,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(STDIN_INPUT, temp_path)
        .raw_rgb_input(width, height, fps)
        .video_codec(settings.temp_codec.clone());

    let mut child = cmd.spawn(Stdio::piped())?;
    let progress_handle = spawn_progress_reader(&mut child, |_| {})?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture FFmpeg stdin", None, None))?;

    for frame in frames {
        if frame.width() != width || frame.height() != height {
            return Err(MediaError::invalid_frame(format!(
                "clip frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            )));
        }
        stdin.write_all(frame.data()).await?;
    }
    stdin.shutdown().await?;
    drop(stdin);

    let status = child.wait().await?;
    let _ = progress_handle.await;
    check_status(status)
}

async fn transcode(temp_path: &Path, final_path: &Path, settings: &ClipSettings) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(temp_path, final_path)
        .video_codec(settings.codec.clone())
        .preset(settings.preset.clone())
        .crf(settings.crf)
        .faststart();

    let target = final_path.display().to_string();
    FfmpegRunner::new()
        .run_with_progress(&cmd, move |p| {
            if p.is_complete {
                debug!("[CLIP] Transcode of {} finished at frame {}", target, p.frame);
            }
        })
        .await
}

/// Safely cleanup a file, logging any errors.
async fn cleanup_file(path: &Path) {
    if path.exists() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("[CLIP] Failed to cleanup {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_for() {
        let p = temp_path_for(Path::new("static/clips/cam1_rgb/20240101_120000_000001.mp4"));
        assert_eq!(
            p,
            PathBuf::from("static/clips/cam1_rgb/20240101_120000_000001_temp.mp4")
        );
    }

    #[tokio::test]
    async fn test_write_clip_rejects_empty_buffer() {
        let dir = TempDir::new().unwrap();
        let result = write_clip(&[], 30.0, &dir.path().join("x.mp4"), &ClipSettings::default()).await;
        assert!(matches!(result, Err(MediaError::ClipFinalizeFailed(_))));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_write_clip_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let frames: Vec<Frame> = (0..10)
            .map(|i| Frame::new(64, 48, vec![i * 20; Frame::byte_len(64, 48)]).unwrap())
            .collect();
        let final_path = dir.path().join("cam1_rgb").join("clip.mp4");

        let written = write_clip(&frames, 30.0, &final_path, &ClipSettings::default())
            .await
            .unwrap();

        assert_eq!(written, final_path);
        assert!(final_path.exists());
        assert!(!temp_path_for(&final_path).exists());
    }
}
