//! Record-task planning.
//!
//! Runs once before streaming: each stream's detections are clustered by
//! frame index and every cluster becomes one clip window.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use camwatch_models::{DetectionSample, RecordTask, StreamKey};

use crate::cluster::Dbscan;
use crate::config::DetectorConfig;
use crate::error::DetectorResult;
use crate::store;

/// Record tasks of every stream, fixed for the process lifetime.
pub type RecordPlan = HashMap<StreamKey, Arc<Vec<RecordTask>>>;

/// Reduce one cluster of detections to a record task.
///
/// The dominant label is the class with the highest summed confidence; ties
/// go to the class seen first.
pub fn summarize_cluster(samples: &[&DetectionSample]) -> Option<RecordTask> {
    let start_frame = samples.iter().map(|s| s.frame_index).min()?;
    let end_frame = samples.iter().map(|s| s.frame_index).max()?;

    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for s in samples {
        let entry = sums.entry(s.class_id.as_str()).or_insert_with(|| {
            order.push(s.class_id.as_str());
            (0.0, 0)
        });
        entry.0 += s.confidence;
        entry.1 += 1;
    }

    let mut dominant = *order.first()?;
    for &class in &order {
        if sums[class].0 > sums[dominant].0 {
            dominant = class;
        }
    }
    let (sum, count) = sums[dominant];

    Some(RecordTask {
        start_frame,
        end_frame,
        dominant_label: dominant.to_string(),
        average_confidence: sum / count as f64,
    })
}

/// Cluster a parsed label sequence into record tasks, ordered by start frame.
pub fn plan_samples(samples: &[DetectionSample], dbscan: &Dbscan) -> Vec<RecordTask> {
    let frames: Vec<f64> = samples.iter().map(|s| s.frame_index as f64).collect();

    dbscan
        .fit_1d(&frames)
        .iter()
        .filter_map(|cluster| {
            let members: Vec<&DetectionSample> = cluster.members().iter().map(|&i| &samples[i]).collect();
            summarize_cluster(&members)
        })
        .collect()
}

/// Plan record tasks for one label directory.
pub async fn plan_stream(label_dir: &Path, eps: f64, min_samples: usize) -> DetectorResult<Vec<RecordTask>> {
    let samples = store::parse_labels(label_dir).await?;
    debug!("[PLANNER] {} samples in {}", samples.len(), label_dir.display());
    Ok(plan_samples(&samples, &Dbscan::new(eps, min_samples)))
}

/// Plan every configured stream that has a label directory.
pub async fn plan_all(config: &DetectorConfig) -> DetectorResult<RecordPlan> {
    let mut plan = RecordPlan::new();

    for key in config.streams() {
        let label_dir = config.label_dir(&key);
        if !tokio::fs::try_exists(&label_dir).await.unwrap_or(false) {
            debug!("[PLANNER] No labels for {}", key);
            continue;
        }

        let tasks = plan_stream(&label_dir, config.detection_eps, config.detection_min_samples).await?;
        for task in &tasks {
            info!(
                stream = %key,
                start = task.start_frame,
                end = task.end_frame,
                label = %task.dominant_label,
                "[PLANNER] {} window {}~{} ({})",
                key,
                task.start_frame,
                task.end_frame,
                task.confidence_message()
            );
        }
        plan.insert(key, Arc::new(tasks));
    }

    info!(
        "[PLANNER] Planned {} windows across {} streams",
        plan.values().map(|t| t.len()).sum::<usize>(),
        plan.len()
    );
    Ok(plan)
}
