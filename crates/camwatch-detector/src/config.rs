//! Detector configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use camwatch_media::ClipSettings;
use camwatch_models::{Modality, StreamKey};

/// Detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Storage root holding videos, labels, positions and clips
    pub static_root: PathBuf,
    /// Camera names; each camera has one stream per modality
    pub cameras: Vec<String>,
    /// Max frame gap merged into one detection event
    pub detection_eps: f64,
    /// DBSCAN min_samples for detection clustering
    pub detection_min_samples: usize,
    /// Max frame gap merged into one position cluster (by file presence)
    pub position_cluster_eps: f64,
    /// Spatial DBSCAN radius for on-demand velocity analysis
    pub spatial_eps: f64,
    /// Spatial DBSCAN min_samples for on-demand velocity analysis
    pub spatial_min_samples: usize,
    /// Frames after a window start at which the warning label is judged
    pub warning_judge_offset: u32,
    /// Frames, starting at the window start, scanned to judge the warning label
    pub warning_judge_window: u32,
    /// Frame rate assumed by the velocity estimator
    pub velocity_assumed_fps: f64,
    /// Frames ending at the cluster end that must all carry a position
    pub velocity_end_window: u32,
    /// Encoding of finalized clips
    pub clip: ClipSettings,
    /// Pause before restarting a failed stream worker
    pub restart_backoff: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            cameras: ["cam1", "cam2", "cam3", "cam4"].iter().map(|c| c.to_string()).collect(),
            detection_eps: 400.0,
            detection_min_samples: 1,
            position_cluster_eps: 400.0,
            spatial_eps: 20.0,
            spatial_min_samples: 3,
            warning_judge_offset: 150,
            warning_judge_window: 100,
            velocity_assumed_fps: 30.0,
            velocity_end_window: 3,
            clip: ClipSettings::default(),
            restart_backoff: Duration::from_secs(5),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cameras = std::env::var("CAMWATCH_CAMERAS")
            .map(|s| {
                s.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.cameras);

        Self {
            static_root: std::env::var("CAMWATCH_STATIC_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_root),
            cameras,
            detection_eps: env_or("DETECTION_EPS", defaults.detection_eps),
            detection_min_samples: env_or("DETECTION_MIN_SAMPLES", defaults.detection_min_samples),
            position_cluster_eps: env_or("POSITION_CLUSTER_EPS", defaults.position_cluster_eps),
            spatial_eps: env_or("SPATIAL_EPS", defaults.spatial_eps),
            spatial_min_samples: env_or("SPATIAL_MIN_SAMPLES", defaults.spatial_min_samples),
            warning_judge_offset: env_or("WARNING_JUDGE_OFFSET", defaults.warning_judge_offset),
            warning_judge_window: env_or("WARNING_JUDGE_WINDOW", defaults.warning_judge_window),
            velocity_assumed_fps: env_or("VELOCITY_ASSUMED_FPS", defaults.velocity_assumed_fps),
            velocity_end_window: env_or("VELOCITY_END_WINDOW", defaults.velocity_end_window).max(1),
            clip: ClipSettings {
                crf: env_or("CLIP_CRF", defaults.clip.crf),
                preset: std::env::var("CLIP_PRESET").unwrap_or(defaults.clip.preset),
                ..defaults.clip
            },
            restart_backoff: Duration::from_secs(env_or(
                "WORKER_RESTART_BACKOFF_SECS",
                defaults.restart_backoff.as_secs(),
            )),
        }
    }

    /// Use a different storage root.
    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = root.into();
        self
    }

    /// Use a different camera list.
    pub fn with_cameras<I, S>(mut self, cameras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cameras = cameras.into_iter().map(Into::into).collect();
        self
    }

    /// Every configured stream, camera-major.
    pub fn streams(&self) -> Vec<StreamKey> {
        self.cameras
            .iter()
            .flat_map(|cam| Modality::ALL.iter().map(move |m| StreamKey::new(cam.clone(), *m)))
            .collect()
    }

    /// Whether `key` belongs to a configured camera.
    pub fn has_stream(&self, key: &StreamKey) -> bool {
        self.cameras.iter().any(|c| c == &key.camera)
    }

    /// Source video of a stream: `<root>/videos/<cam>_<mod>.mp4`.
    pub fn video_path(&self, key: &StreamKey) -> PathBuf {
        self.static_root.join("videos").join(format!("{}.mp4", key))
    }

    /// Label directory of a stream: `<root>/labels/<cam>_<mod>`.
    pub fn label_dir(&self, key: &StreamKey) -> PathBuf {
        self.static_root.join("labels").join(key.to_string())
    }

    /// Position directory of a stream: `<root>/positions/<cam>_<mod>`.
    pub fn position_dir(&self, key: &StreamKey) -> PathBuf {
        self.static_root.join("positions").join(key.to_string())
    }

    /// Root of all clip directories: `<root>/clips`.
    pub fn clips_root(&self) -> PathBuf {
        self.static_root.join("clips")
    }

    /// Clip directory of a stream: `<root>/clips/<cam>_<mod>`.
    pub fn clip_dir(&self, key: &StreamKey) -> PathBuf {
        self.clips_root().join(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_streams() {
        let config = DetectorConfig::default();
        let streams = config.streams();
        assert_eq!(streams.len(), 8);
        assert_eq!(streams[0].to_string(), "cam1_rgb");
        assert_eq!(streams[1].to_string(), "cam1_thermal");
        assert_eq!(streams[7].to_string(), "cam4_thermal");
    }

    #[test]
    fn test_stream_paths() {
        let config = DetectorConfig::default().with_static_root("/data");
        let key = StreamKey::new("cam2", Modality::Thermal);

        assert_eq!(config.video_path(&key), PathBuf::from("/data/videos/cam2_thermal.mp4"));
        assert_eq!(config.label_dir(&key), PathBuf::from("/data/labels/cam2_thermal"));
        assert_eq!(config.position_dir(&key), PathBuf::from("/data/positions/cam2_thermal"));
        assert_eq!(config.clip_dir(&key), PathBuf::from("/data/clips/cam2_thermal"));
    }

    #[test]
    fn test_has_stream() {
        let config = DetectorConfig::default().with_cameras(["north"]);
        assert!(config.has_stream(&StreamKey::new("north", Modality::Rgb)));
        assert!(!config.has_stream(&StreamKey::new("cam1", Modality::Rgb)));
    }
}
