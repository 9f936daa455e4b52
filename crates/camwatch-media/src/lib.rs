//! FFmpeg CLI wrapper for the camwatch replay pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe stream information
//! - A looping raw-frame source over a video file
//! - Clip writing (raw frames → temporary container → transcoded clip)
//! - JPEG encoding of decoded frames

pub mod clip_writer;
pub mod command;
pub mod error;
pub mod frame;
pub mod probe;
pub mod progress;
pub mod source;

pub use clip_writer::{write_clip, ClipSettings};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame::Frame;
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use source::{FfmpegLoopingSource, FrameSource, SourceFrame};
