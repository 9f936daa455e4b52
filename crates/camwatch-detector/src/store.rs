//! Readers for the per-frame label and position files.
//!
//! Each stream has a label directory and a position directory holding one
//! `frame_NNNNN.txt` file per frame. Frames without a detection simply have
//! no file. Unreadable files and malformed lines are skipped, never fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use camwatch_models::{DetectionSample, PositionSample, Vec3};

use crate::error::DetectorResult;

/// Field holding the confidence in a label line.
const CONFIDENCE_FIELD: usize = 5;

/// File name of a frame's label or position file.
pub fn frame_file_name(frame: u32) -> String {
    format!("frame_{:05}.txt", frame)
}

/// Path of a frame's file inside `dir`.
pub fn frame_path(dir: &Path, frame: u32) -> PathBuf {
    dir.join(frame_file_name(frame))
}

/// Frame index encoded in a `frame_NNNNN.txt` file name.
pub fn parse_frame_index(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("frame_")?
        .strip_suffix(".txt")?
        .parse()
        .ok()
}

/// All frame files in `dir`, sorted by file name. A missing directory is empty.
pub async fn list_frame_files(dir: &Path) -> DetectorResult<Vec<(u32, PathBuf)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("[STORE] {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".txt") {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .filter_map(|name| match parse_frame_index(&name) {
            Some(frame) => Some((frame, dir.join(&name))),
            None => {
                debug!("[STORE] Skipping {} in {}", name, dir.display());
                None
            }
        })
        .collect())
}

/// Parse one label line: `class x y w h [confidence ...]`.
///
/// Lines with fewer than six fields get confidence 1.0.
pub fn parse_label_line(frame: u32, line: &str) -> Option<DetectionSample> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let class_id = parts.first()?;

    let confidence = match parts.get(CONFIDENCE_FIELD) {
        Some(raw) => raw.parse::<f64>().ok()?,
        None => 1.0,
    };

    Some(DetectionSample::new(frame, *class_id, confidence))
}

async fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("[STORE] Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Every detection sample in a label directory, in file-name order.
pub async fn parse_labels(dir: &Path) -> DetectorResult<Vec<DetectionSample>> {
    let mut samples = Vec::new();

    for (frame, path) in list_frame_files(dir).await? {
        let Some(content) = read_optional(&path).await else {
            continue;
        };
        for line in content.lines() {
            match parse_label_line(frame, line) {
                Some(sample) => samples.push(sample),
                None if line.trim().is_empty() => {}
                None => debug!("[STORE] Malformed label line in {}: {:?}", path.display(), line),
            }
        }
    }

    Ok(samples)
}

/// Summed confidence per class over `count` frames starting at `start`.
///
/// Only lines carrying an explicit confidence (six or more fields) count.
pub async fn label_confidence_sums(dir: &Path, start: u32, count: u32) -> HashMap<String, f64> {
    let mut sums: HashMap<String, f64> = HashMap::new();

    for frame in start..start.saturating_add(count) {
        let Some(content) = read_optional(&frame_path(dir, frame)).await else {
            continue;
        };
        for line in content.lines() {
            if line.split_whitespace().count() <= CONFIDENCE_FIELD {
                continue;
            }
            if let Some(sample) = parse_label_line(frame, line) {
                *sums.entry(sample.class_id).or_default() += sample.confidence;
            }
        }
    }

    sums
}

/// Layout of a position file line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFormat {
    /// `x,y,z`; read by spatial clustering.
    Comma,
    /// `x y z`; read by the velocity estimator. Comma-separated lines are
    /// accepted as well since tracker output has used both.
    Whitespace,
}

/// Parse a position file's content into a 3-vector.
pub fn parse_position(content: &str, format: PositionFormat) -> Option<Vec3> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    let values: Result<Vec<f64>, _> = match format {
        PositionFormat::Comma => content.split(',').map(|v| v.trim().parse::<f64>()).collect(),
        PositionFormat::Whitespace => content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|v| !v.is_empty())
            .map(str::parse::<f64>)
            .collect(),
    };

    Vec3::from_slice(&values.ok()?)
}

/// Position recorded for `frame`, if its file exists and parses.
pub async fn read_position(dir: &Path, frame: u32, format: PositionFormat) -> Option<Vec3> {
    let path = frame_path(dir, frame);
    let content = read_optional(&path).await?;
    let position = parse_position(&content, format);
    if position.is_none() {
        debug!("[STORE] Malformed position file {}", path.display());
    }
    position
}

/// Whether a position file exists for `frame`.
pub async fn position_exists(dir: &Path, frame: u32) -> bool {
    fs::try_exists(frame_path(dir, frame)).await.unwrap_or(false)
}

/// Frames whose position file exists and is non-empty, ascending.
pub async fn present_position_frames(dir: &Path) -> DetectorResult<Vec<u32>> {
    let mut frames = Vec::new();
    for (frame, path) in list_frame_files(dir).await? {
        if let Some(content) = read_optional(&path).await {
            if !content.trim().is_empty() {
                frames.push(frame);
            }
        }
    }
    frames.sort_unstable();
    Ok(frames)
}

/// Every parseable position sample in a directory, ascending by frame.
pub async fn read_positions(dir: &Path, format: PositionFormat) -> DetectorResult<Vec<PositionSample>> {
    let mut samples = Vec::new();
    for (frame_index, path) in list_frame_files(dir).await? {
        let Some(content) = read_optional(&path).await else {
            continue;
        };
        if let Some(position) = parse_position(&content, format) {
            samples.push(PositionSample {
                frame_index,
                position,
            });
        }
    }
    samples.sort_by_key(|s| s.frame_index);
    Ok(samples)
}
