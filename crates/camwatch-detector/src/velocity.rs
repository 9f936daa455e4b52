//! Finite-difference velocity estimation over position clusters.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use camwatch_models::Vec3;

use crate::cluster::Dbscan;
use crate::config::DetectorConfig;
use crate::error::DetectorResult;
use crate::store::{self, PositionFormat};

/// Narration used when the positions needed for an estimate are missing.
pub const NO_DATA_NARRATION: &str = "No velocity data";

/// Outcome of a velocity estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum VelocityReport {
    Measured {
        /// Metres per second; x east, y up, z south
        velocity: Vec3,
        displacement: Vec3,
        /// Seconds
        duration: f64,
    },
    NoData { reason: String },
}

impl VelocityReport {
    pub fn is_measured(&self) -> bool {
        matches!(self, VelocityReport::Measured { .. })
    }

    /// Human-readable description of the motion.
    pub fn narration(&self) -> String {
        match self {
            VelocityReport::NoData { .. } => NO_DATA_NARRATION.to_string(),
            VelocityReport::Measured { velocity: v, .. } => {
                let east_west = if v.x > 0.0 { "east" } else { "west" };
                let north_south = if v.z > 0.0 { "south" } else { "north" };
                let vertical = if v.y > 0.0 { "rising" } else { "descending" };
                format!(
                    "Moving {} at {:.1} m/s and {} at {:.1} m/s, {} at {:.1} m/s",
                    east_west,
                    v.x.abs(),
                    north_south,
                    v.z.abs(),
                    vertical,
                    v.y.abs()
                )
            }
        }
    }
}

impl fmt::Display for VelocityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.narration())
    }
}

/// Estimates velocity from the positions at the edges of a frame range.
#[derive(Debug, Clone, Copy)]
pub struct VelocityEstimator {
    assumed_fps: f64,
    end_window: u32,
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new(30.0, 3)
    }
}

impl VelocityEstimator {
    pub fn new(assumed_fps: f64, end_window: u32) -> Self {
        Self {
            assumed_fps,
            end_window: end_window.max(1),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.velocity_assumed_fps, config.velocity_end_window)
    }

    /// Estimate velocity between `start` and `end` from the positions in `dir`.
    ///
    /// The start position is read at `start`. Every frame of the end window
    /// (the last `end_window` frames up to `end`) must have a position file,
    /// so a window reaching before frame 0 has no data. The end position is
    /// read at `end`.
    pub async fn estimate(&self, dir: &Path, start: u32, end: u32) -> VelocityReport {
        if end < start {
            return no_data(format!("empty range {}~{}", start, end));
        }

        let Some(p0) = store::read_position(dir, start, PositionFormat::Whitespace).await else {
            return no_data(format!("missing start position {}", store::frame_file_name(start)));
        };

        let Some(window_start) = end.checked_sub(self.end_window - 1) else {
            return no_data(format!("end window of {} frames does not fit before {}", self.end_window, end));
        };
        for frame in window_start..=end {
            if !store::position_exists(dir, frame).await {
                return no_data(format!("missing end position {}", store::frame_file_name(frame)));
            }
        }
        let Some(p1) = store::read_position(dir, end, PositionFormat::Whitespace).await else {
            return no_data(format!("unreadable end position {}", store::frame_file_name(end)));
        };

        let displacement = p1 - p0;
        let duration = (end - start + 1) as f64 / self.assumed_fps;
        let velocity = displacement / duration;

        debug!(
            "[VELOCITY] dx={:.2} dy={:.2} dz={:.2} duration={:.2}s",
            displacement.x, displacement.y, displacement.z, duration
        );

        VelocityReport::Measured {
            velocity,
            displacement,
            duration,
        }
    }
}

fn no_data(reason: String) -> VelocityReport {
    info!("[VELOCITY] No data: {}", reason);
    VelocityReport::NoData { reason }
}

/// Frame extents of the clusters of non-empty position files, by frame index.
pub async fn presence_clusters(dir: &Path, eps: f64) -> DetectorResult<Vec<(u32, u32)>> {
    let frames = store::present_position_frames(dir).await?;
    let values: Vec<f64> = frames.iter().map(|&f| f as f64).collect();

    Ok(Dbscan::new(eps, 1)
        .fit_1d(&values)
        .iter()
        .filter_map(|c| c.frame_extent(&frames))
        .collect())
}

/// Frame extents of the spatial clusters of all comma-format positions.
/// Noise points are left out.
pub async fn spatial_clusters(dir: &Path, eps: f64, min_samples: usize) -> DetectorResult<Vec<(u32, u32)>> {
    let samples = store::read_positions(dir, PositionFormat::Comma).await?;
    let frames: Vec<u32> = samples.iter().map(|s| s.frame_index).collect();
    let points: Vec<Vec3> = samples.iter().map(|s| s.position).collect();

    let mut extents: Vec<(u32, u32)> = Dbscan::new(eps, min_samples)
        .fit_3d(&points)
        .iter()
        .filter_map(|c| c.frame_extent(&frames))
        .collect();
    extents.sort_unstable();
    Ok(extents)
}

/// First cluster whose extent overlaps `range` (inclusive on both ends).
pub fn find_overlapping(clusters: &[(u32, u32)], range: (u32, u32)) -> Option<(u32, u32)> {
    clusters
        .iter()
        .copied()
        .find(|&(start, end)| start <= range.1 && end >= range.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(dir: &Path, frame: u32, content: &str) {
        tokio::fs::write(store::frame_path(dir, frame), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_eastward_motion() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), 10, "0,0,0").await;
        write(dir.path(), 11, "1,0,0").await;
        write(dir.path(), 12, "3,0,0").await;

        let report = VelocityEstimator::default().estimate(dir.path(), 10, 12).await;
        match &report {
            VelocityReport::Measured { velocity, duration, .. } => {
                assert!((velocity.x - 30.0).abs() < 1e-9);
                assert_eq!(velocity.y, 0.0);
                assert_eq!(velocity.z, 0.0);
                assert!((duration - 0.1).abs() < 1e-9);
            }
            other => panic!("expected a measurement, got {:?}", other),
        }
        assert_eq!(
            report.narration(),
            "Moving east at 30.0 m/s and north at 0.0 m/s, descending at 0.0 m/s"
        );
    }

    #[test]
    fn test_direction_words() {
        let report = VelocityReport::Measured {
            velocity: Vec3::new(-1.5, 2.0, 0.5),
            displacement: Vec3::default(),
            duration: 1.0,
        };
        assert_eq!(
            report.to_string(),
            "Moving west at 1.5 m/s and south at 0.5 m/s, rising at 2.0 m/s"
        );
    }

    #[tokio::test]
    async fn test_missing_positions_yield_no_data() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), 10, "0 0 0").await;
        write(dir.path(), 12, "3 0 0").await;

        let estimator = VelocityEstimator::default();
        let gap = estimator.estimate(dir.path(), 10, 12).await;
        assert!(!gap.is_measured());
        assert_eq!(gap.narration(), NO_DATA_NARRATION);

        let no_start = estimator.estimate(dir.path(), 9, 12).await;
        assert!(!no_start.is_measured());
    }

    #[tokio::test]
    async fn test_end_window_before_first_frame_yields_no_data() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), 0, "0 0 0").await;
        write(dir.path(), 1, "3 0 0").await;
        write(dir.path(), 2, "6 0 0").await;

        let estimator = VelocityEstimator::default();
        assert!(!estimator.estimate(dir.path(), 0, 1).await.is_measured());
        assert!(!estimator.estimate(dir.path(), 0, 0).await.is_measured());
        assert!(estimator.estimate(dir.path(), 0, 2).await.is_measured());
    }

    #[tokio::test]
    async fn test_presence_clusters_and_overlap() {
        let dir = TempDir::new().unwrap();
        for f in [10, 11, 12, 600, 601] {
            write(dir.path(), f, "1 2 3").await;
        }
        write(dir.path(), 300, "").await;

        let clusters = presence_clusters(dir.path(), 400.0).await.unwrap();
        assert_eq!(clusters, vec![(10, 12), (600, 601)]);
        assert_eq!(find_overlapping(&clusters, (0, 10)), Some((10, 12)));
        assert_eq!(find_overlapping(&clusters, (590, 700)), Some((600, 601)));
        assert_eq!(find_overlapping(&clusters, (13, 599)), None);
    }

    #[tokio::test]
    async fn test_spatial_clusters_drop_noise() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), 1, "0,0,0").await;
        write(dir.path(), 2, "5,0,0").await;
        write(dir.path(), 3, "10,0,0").await;
        write(dir.path(), 50, "900,0,0").await;
        write(dir.path(), 60, "0 0 0").await;

        let clusters = spatial_clusters(dir.path(), 20.0, 3).await.unwrap();
        assert_eq!(clusters, vec![(1, 3)]);
    }
}
