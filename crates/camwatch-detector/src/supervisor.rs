//! Runs one streamer per (camera, modality) and serves the admin operations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

use camwatch_media::FfmpegLoopingSource;
use camwatch_models::{DetectionEvent, StreamKey};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, DetectorResult};
use crate::finalizer::FfmpegClipFinalizer;
use crate::metrics;
use crate::planner::{plan_all, RecordPlan};
use crate::sink::EventSink;
use crate::streamer::{LiveFrame, Streamer, StreamerDeps, LIVE_CHANNEL_CAPACITY};
use crate::velocity::{self, VelocityEstimator};
use crate::warning::WarningBoard;

/// Owns the record plan, the shared collaborators and the stream workers.
pub struct StreamSupervisor {
    config: Arc<DetectorConfig>,
    plan: Arc<RecordPlan>,
    deps: StreamerDeps,
    live: HashMap<StreamKey, broadcast::Sender<LiveFrame>>,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl StreamSupervisor {
    /// Plan record tasks and prepare FFmpeg-backed workers.
    pub async fn new(config: DetectorConfig, sink: Arc<dyn EventSink>) -> DetectorResult<Self> {
        let plan = plan_all(&config).await?;
        let deps = StreamerDeps {
            finalizer: Arc::new(FfmpegClipFinalizer::new(config.clips_root(), config.clip.clone())),
            sink,
            warnings: WarningBoard::new(),
        };
        Ok(Self::with_parts(config, plan, deps))
    }

    /// Assemble a supervisor from an existing plan and collaborators.
    pub fn with_parts(config: DetectorConfig, plan: RecordPlan, deps: StreamerDeps) -> Self {
        let live = config
            .streams()
            .into_iter()
            .map(|key| (key, broadcast::channel(LIVE_CHANNEL_CAPACITY).0))
            .collect();

        Self {
            config: Arc::new(config),
            plan: Arc::new(plan),
            deps,
            live,
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn plan(&self) -> &RecordPlan {
        &self.plan
    }

    pub fn warnings(&self) -> &WarningBoard {
        &self.deps.warnings
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawn a worker for every stream with a source video.
    ///
    /// Only the first call starts anything; later calls return 0.
    pub async fn start_all(&self) -> usize {
        if self.started.swap(true, Ordering::SeqCst) {
            info!("[STREAMER] Streams already running");
            return 0;
        }

        let mut workers = self.workers.lock().await;
        for key in self.config.streams() {
            let video = self.config.video_path(&key);
            if !tokio::fs::try_exists(&video).await.unwrap_or(false) {
                warn!(stream = %key, "[STREAMER] No video at {}, skipping", video.display());
                continue;
            }
            let Some(live) = self.live.get(&key).cloned() else {
                continue;
            };

            let tasks = self.plan.get(&key).cloned().unwrap_or_default();
            let streamer = Streamer::new(key.clone(), tasks, &self.config, self.deps.clone(), live);
            let span = info_span!("stream", stream = %key);
            workers.push(tokio::spawn(
                run_worker(streamer, video, self.config.restart_backoff).instrument(span),
            ));
        }

        metrics::set_workers_active(workers.len());
        info!("[STREAMER] Started {} stream workers", workers.len());
        workers.len()
    }

    /// Abort every worker.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            handle.abort();
        }
        metrics::set_workers_active(0);
    }

    /// Receiver of a stream's live JPEG frames.
    pub fn subscribe_live(&self, key: &StreamKey) -> DetectorResult<broadcast::Receiver<LiveFrame>> {
        self.live
            .get(key)
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| DetectorError::UnknownStream(key.clone()))
    }

    /// Cluster all of a stream's positions spatially and narrate every cluster.
    ///
    /// Each narration is also emitted to the sink. Runs regardless of clip
    /// events and of the per-stream narration dedupe.
    pub async fn analyze_velocity(&self, key: &StreamKey) -> DetectorResult<Vec<String>> {
        if !self.config.has_stream(key) {
            return Err(DetectorError::UnknownStream(key.clone()));
        }

        let dir = self.config.position_dir(key);
        let clusters = velocity::spatial_clusters(&dir, self.config.spatial_eps, self.config.spatial_min_samples).await?;
        info!(stream = %key, "[VELOCITY] {} spatial clusters", clusters.len());

        let estimator = VelocityEstimator::from_config(&self.config);
        let mut narrations = Vec::with_capacity(clusters.len());
        for (start, end) in clusters {
            let narration = estimator.estimate(&dir, start, end).await.narration();
            info!(stream = %key, "[VELOCITY] {}~{}: {}", start, end, narration);
            metrics::record_velocity_narration(&key.to_string(), "on_demand");
            self.deps.sink.emit(DetectionEvent::velocity(key.clone(), narration.clone()));
            narrations.push(narration);
        }

        Ok(narrations)
    }
}

/// Keep a streamer running, reopening its source after failures.
async fn run_worker(mut streamer: Streamer, video: PathBuf, backoff: Duration) {
    loop {
        let result: DetectorResult<()> = async {
            let mut source = FfmpegLoopingSource::open(&video).await?;
            streamer.run(&mut source).await
        }
        .await;

        if let Err(e) = result {
            error!("[STREAMER] Worker failed: {}; restarting in {:?}", e, backoff);
            metrics::record_worker_restart(&streamer.key().to_string());
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use camwatch_models::Modality;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Collect(StdMutex<Vec<DetectionEvent>>);

    impl EventSink for Collect {
        fn emit(&self, event: DetectionEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn supervisor(root: &std::path::Path, sink: Arc<dyn EventSink>) -> StreamSupervisor {
        let config = DetectorConfig::default().with_static_root(root).with_cameras(["cam1"]);
        let deps = StreamerDeps {
            finalizer: Arc::new(FfmpegClipFinalizer::new(config.clips_root(), config.clip.clone())),
            sink,
            warnings: WarningBoard::new(),
        };
        StreamSupervisor::with_parts(config, RecordPlan::new(), deps)
    }

    #[tokio::test]
    async fn test_start_all_is_idempotent() {
        let root = TempDir::new().unwrap();
        let sup = supervisor(root.path(), Arc::new(NullSink));

        assert!(!sup.is_started());
        assert_eq!(sup.start_all().await, 0);
        assert!(sup.is_started());
        assert_eq!(sup.start_all().await, 0);
        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribe_live_unknown_stream() {
        let root = TempDir::new().unwrap();
        let sup = supervisor(root.path(), Arc::new(NullSink));

        assert!(sup.subscribe_live(&StreamKey::new("cam1", Modality::Thermal)).is_ok());
        assert!(matches!(
            sup.subscribe_live(&StreamKey::new("cam9", Modality::Rgb)),
            Err(DetectorError::UnknownStream(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_velocity_emits_each_cluster() {
        let root = TempDir::new().unwrap();
        let sink = Arc::new(Collect::default());
        let sup = supervisor(root.path(), sink.clone());
        let key = StreamKey::new("cam1", Modality::Rgb);

        let dir = sup.config().position_dir(&key);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for (frame, x) in [(10u32, 0.0), (11, 1.0), (12, 3.0)] {
            tokio::fs::write(crate::store::frame_path(&dir, frame), format!("{},0,0", x))
                .await
                .unwrap();
        }

        let narrations = sup.analyze_velocity(&key).await.unwrap();
        assert_eq!(narrations.len(), 1);
        assert!(narrations[0].starts_with("Moving east at 30.0 m/s"));

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_velocity());

        drop(events);
        assert!(matches!(
            sup.analyze_velocity(&StreamKey::new("nope", Modality::Rgb)).await,
            Err(DetectorError::UnknownStream(_))
        ));
    }
}
