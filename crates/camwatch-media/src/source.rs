//! Looping frame sources.
//!
//! A [`FrameSource`] is infinite: when the underlying video is exhausted it
//! restarts from the first frame and the frame index wraps to 0. End of
//! stream is never surfaced to the consumer.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;
use crate::probe::{probe_video, VideoInfo};

/// A frame together with its playback index within the current loop.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub index: u32,
    pub frame: Frame,
}

/// An infinite, restartable source of decoded frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Source frame rate.
    fn fps(&self) -> f64;

    /// Next frame. Wraps to index 0 after the last frame of the video.
    async fn next_frame(&mut self) -> MediaResult<SourceFrame>;
}

/// Decodes a video file to rgb24 through an FFmpeg pipe, forever.
pub struct FfmpegLoopingSource {
    path: PathBuf,
    info: VideoInfo,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    next_index: u32,
    loops: u64,
}

impl FfmpegLoopingSource {
    /// Probe `path` and prepare a looping decoder for it.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe_video(&path).await?;
        check_ffmpeg()?;

        info!(
            "[SOURCE] Opened {} ({}x{} @ {:.2}fps)",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        Ok(Self {
            path,
            info,
            child: None,
            reader: None,
            next_index: 0,
            loops: 0,
        })
    }

    fn spawn_decoder(&mut self) -> MediaResult<()> {
        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;

        self.reader = Some(BufReader::with_capacity(
            Frame::byte_len(self.info.width, self.info.height),
            stdout,
        ));
        self.child = Some(child);
        Ok(())
    }

    async fn restart(&mut self) -> MediaResult<()> {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        self.next_index = 0;
        self.spawn_decoder()
    }

    /// Read one frame, `None` on end of stream (a trailing partial frame counts as end).
    async fn read_frame(&mut self) -> MediaResult<Option<Frame>> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let mut buf = vec![0u8; Frame::byte_len(self.info.width, self.info.height)];
        match reader.read_exact(&mut buf).await {
            Ok(_) => Ok(Some(Frame::new(self.info.width, self.info.height, buf)?)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegLoopingSource {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    async fn next_frame(&mut self) -> MediaResult<SourceFrame> {
        if self.reader.is_none() {
            self.spawn_decoder()?;
        }

        if let Some(frame) = self.read_frame().await? {
            let index = self.next_index;
            self.next_index += 1;
            return Ok(SourceFrame { index, frame });
        }

        // End of stream: seek back to the first frame.
        let decoded = self.next_index;
        self.loops += 1;
        debug!(
            "[SOURCE] {} exhausted after {} frames, looping (pass {})",
            self.path.display(),
            decoded,
            self.loops
        );
        self.restart().await?;

        match self.read_frame().await? {
            Some(frame) => {
                self.next_index = 1;
                Ok(SourceFrame { index: 0, frame })
            }
            None => Err(MediaError::InvalidVideo(format!(
                "{} produced no decodable frames",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_file() {
        let result = FfmpegLoopingSource::open("/nonexistent/cam1_rgb.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
