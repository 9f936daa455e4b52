//! Detector metrics.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_DECODED_TOTAL: &str = "camwatch_frames_decoded_total";
    pub const SOURCE_LOOPS_TOTAL: &str = "camwatch_source_loops_total";
    pub const CLIPS_FINALIZED_TOTAL: &str = "camwatch_clips_finalized_total";
    pub const CLIPS_FAILED_TOTAL: &str = "camwatch_clips_failed_total";
    pub const CLIP_FINALIZE_DURATION_SECONDS: &str = "camwatch_clip_finalize_duration_seconds";
    pub const VELOCITY_NARRATIONS_TOTAL: &str = "camwatch_velocity_narrations_total";
    pub const WORKER_RESTARTS_TOTAL: &str = "camwatch_worker_restarts_total";
    pub const WORKERS_ACTIVE: &str = "camwatch_workers_active";
}

pub fn record_frame_decoded(stream: &str) {
    let labels = [("stream", stream.to_string())];
    counter!(names::FRAMES_DECODED_TOTAL, &labels).increment(1);
}

pub fn record_source_loop(stream: &str) {
    let labels = [("stream", stream.to_string())];
    counter!(names::SOURCE_LOOPS_TOTAL, &labels).increment(1);
}

/// Record a finalized clip and how long encoding took.
pub fn record_clip_finalized(stream: &str, duration_secs: f64) {
    let labels = [("stream", stream.to_string())];
    counter!(names::CLIPS_FINALIZED_TOTAL, &labels).increment(1);
    histogram!(names::CLIP_FINALIZE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_clip_failed(stream: &str) {
    let labels = [("stream", stream.to_string())];
    counter!(names::CLIPS_FAILED_TOTAL, &labels).increment(1);
}

/// `trigger` is `clip` or `on_demand`.
pub fn record_velocity_narration(stream: &str, trigger: &str) {
    let labels = [("stream", stream.to_string()), ("trigger", trigger.to_string())];
    counter!(names::VELOCITY_NARRATIONS_TOTAL, &labels).increment(1);
}

pub fn record_worker_restart(stream: &str) {
    let labels = [("stream", stream.to_string())];
    counter!(names::WORKER_RESTARTS_TOTAL, &labels).increment(1);
}

pub fn set_workers_active(count: usize) {
    gauge!(names::WORKERS_ACTIVE).set(count as f64);
}
