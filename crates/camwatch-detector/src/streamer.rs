//! The per-stream frame loop.
//!
//! A `Streamer` pulls frames from a looping source, runs them through the
//! stream's record windows, finalizes clips when windows close, narrates
//! velocity for the position cluster under each clip, and publishes every
//! frame as JPEG for live viewers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use camwatch_media::frame::DEFAULT_JPEG_QUALITY;
use camwatch_media::{Frame, FrameSource, SourceFrame};
use camwatch_models::{DetectionEvent, RecordTask, StreamKey};

use crate::config::DetectorConfig;
use crate::error::DetectorResult;
use crate::finalizer::ClipFinalizer;
use crate::metrics;
use crate::sink::EventSink;
use crate::state::{ClipFlush, StreamState, WindowAction, WindowKey};
use crate::velocity::{self, VelocityEstimator};
use crate::warning::{self, WarningBoard};

/// JPEG-encoded frame for live viewers.
pub type LiveFrame = Arc<Vec<u8>>;

/// Live frames buffered per viewer before the oldest are dropped.
pub const LIVE_CHANNEL_CAPACITY: usize = 8;

/// Pacing used when the source reports an unusable frame rate.
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Shared collaborators of every streamer.
#[derive(Clone)]
pub struct StreamerDeps {
    pub finalizer: Arc<dyn ClipFinalizer>,
    pub sink: Arc<dyn EventSink>,
    pub warnings: WarningBoard,
}

/// Frame loop of one (camera, modality) stream.
pub struct Streamer {
    key: StreamKey,
    tasks: Arc<Vec<RecordTask>>,
    state: StreamState<Frame>,
    deps: StreamerDeps,
    estimator: VelocityEstimator,
    label_dir: PathBuf,
    position_dir: PathBuf,
    judge_offset: u32,
    judge_window: u32,
    position_cluster_eps: f64,
    live: broadcast::Sender<LiveFrame>,
    pace: bool,
}

impl Streamer {
    pub fn new(
        key: StreamKey,
        tasks: Arc<Vec<RecordTask>>,
        config: &DetectorConfig,
        deps: StreamerDeps,
        live: broadcast::Sender<LiveFrame>,
    ) -> Self {
        Self {
            label_dir: config.label_dir(&key),
            position_dir: config.position_dir(&key),
            key,
            tasks,
            state: StreamState::new(),
            deps,
            estimator: VelocityEstimator::from_config(config),
            judge_offset: config.warning_judge_offset,
            judge_window: config.warning_judge_window,
            position_cluster_eps: config.position_cluster_eps,
            live,
            pace: true,
        }
    }

    /// Disable the one-frame sleep between frames.
    pub fn without_pacing(mut self) -> Self {
        self.pace = false;
        self
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    pub fn state(&self) -> &StreamState<Frame> {
        &self.state
    }

    /// Run until the source fails. State survives across calls, so a
    /// restarted run continues the same windows and dedupe keys.
    pub async fn run(&mut self, source: &mut dyn FrameSource) -> DetectorResult<()> {
        let fps = source.fps();
        let interval = Duration::try_from_secs_f64(1.0 / fps).unwrap_or(DEFAULT_FRAME_INTERVAL);
        info!(
            stream = %self.key,
            fps,
            windows = self.tasks.len(),
            "[STREAMER] Streaming {} at {:.2}fps",
            self.key,
            fps
        );

        loop {
            let frame = source.next_frame().await?;
            self.process_frame(frame, fps).await;

            if self.pace {
                tokio::time::sleep(interval).await;
            }
        }
    }

    /// Handle one decoded frame.
    pub async fn process_frame(&mut self, source_frame: SourceFrame, fps: f64) {
        let SourceFrame { index, frame } = source_frame;
        let stream = self.key.to_string();
        metrics::record_frame_decoded(&stream);

        if index == 0 && self.state.current_frame().is_some() {
            metrics::record_source_loop(&stream);
            debug!(stream = %self.key, "[STREAMER] Source looped");
        }

        let actions = self.state.advance(index, &frame, &self.tasks, self.judge_offset);
        for action in actions {
            match action {
                WindowAction::ShowWarning(window) => {
                    info!(stream = %self.key, frame = index, "[STREAMER] Warning raised for window {}~{}", window.start, window.end);
                }
                WindowAction::JudgeWarning(window) => self.judge_warning(window).await,
                WindowAction::Flush(flush) => {
                    if let Err(e) = self.handle_flush(flush, fps).await {
                        error!(stream = %self.key, "[CLIP] {}", e);
                    }
                }
            }
        }

        self.publish_live(frame).await;
    }

    async fn judge_warning(&self, window: WindowKey) {
        if self.key.modality.is_thermal() {
            return;
        }

        match warning::judge_warning_label(&self.label_dir, window.start, self.judge_window).await {
            Some(label) => {
                self.deps.warnings.set(&self.key.camera, label).await;
                info!(stream = %self.key, "[STREAMER] Warning for {} judged as {:?}", self.key.camera, label);
            }
            None => debug!(stream = %self.key, "[STREAMER] No labels to judge window {}~{}", window.start, window.end),
        }
    }

    /// Finalize a closed window's clip, emit it, then try velocity narration.
    ///
    /// Recording state is already cleared when this runs, so a failed
    /// finalize does not stall the window.
    async fn handle_flush(&mut self, flush: ClipFlush<Frame>, fps: f64) -> DetectorResult<()> {
        let ClipFlush { task, frames, range } = flush;
        let stream = self.key.to_string();
        let started = Instant::now();

        let result = self.deps.finalizer.finalize(&self.key, &frames, fps).await;
        match &result {
            Ok(path) => {
                metrics::record_clip_finalized(&stream, started.elapsed().as_secs_f64());
                info!(
                    stream = %self.key,
                    clip = %path.display(),
                    "[CLIP] Saved {} frames {}~{} ({} {})",
                    frames.len(),
                    range.0,
                    range.1,
                    task.event_label(),
                    task.confidence_message()
                );
                self.deps.sink.emit(DetectionEvent::clip(
                    self.key.clone(),
                    task.event_label(),
                    path.to_string_lossy(),
                    Some(task.confidence_message()),
                ));
            }
            Err(_) => metrics::record_clip_failed(&stream),
        }

        self.narrate_velocity(range).await;
        result.map(|_| ())
    }

    /// Narrate the position cluster overlapping `range`, once per cluster.
    async fn narrate_velocity(&mut self, range: (u32, u32)) {
        if self.key.modality.is_thermal() {
            return;
        }

        let clusters = match velocity::presence_clusters(&self.position_dir, self.position_cluster_eps).await {
            Ok(clusters) => clusters,
            Err(e) => {
                warn!(stream = %self.key, "[VELOCITY] Failed to read positions: {}", e);
                return;
            }
        };

        let Some(extent) = velocity::find_overlapping(&clusters, range) else {
            debug!(stream = %self.key, "[VELOCITY] No position cluster overlaps {}~{}", range.0, range.1);
            return;
        };

        if !self.state.mark_narrated(extent) {
            return;
        }

        let report = self.estimator.estimate(&self.position_dir, extent.0, extent.1).await;
        let narration = report.narration();
        info!(stream = %self.key, "[VELOCITY] {}~{}: {}", extent.0, extent.1, narration);
        metrics::record_velocity_narration(&self.key.to_string(), "clip");
        self.deps.sink.emit(DetectionEvent::velocity(self.key.clone(), narration));
    }

    /// Encode and broadcast the frame if anyone is watching.
    async fn publish_live(&self, frame: Frame) {
        if self.live.receiver_count() == 0 {
            return;
        }

        let encoded = tokio::task::spawn_blocking(move || frame.to_jpeg(DEFAULT_JPEG_QUALITY)).await;
        match encoded {
            Ok(Ok(jpeg)) => {
                // Viewers may disconnect between the count and the send.
                let _ = self.live.send(Arc::new(jpeg));
            }
            Ok(Err(e)) => warn!(stream = %self.key, "[STREAMER] JPEG encode failed: {}", e),
            Err(e) => warn!(stream = %self.key, "[STREAMER] JPEG task failed: {}", e),
        }
    }
}
