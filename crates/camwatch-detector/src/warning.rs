//! Per-camera warning board.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use camwatch_models::{WarningLabel, WarningState};

use crate::store;

/// Current warning of each camera. At most one entry per camera; a newer
/// judgement overwrites the older one.
#[derive(Debug, Clone, Default)]
pub struct WarningBoard {
    inner: Arc<RwLock<HashMap<String, WarningState>>>,
}

impl WarningBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, camera: &str, label: WarningLabel) {
        self.inner
            .write()
            .await
            .insert(camera.to_string(), WarningState { label });
    }

    pub async fn get(&self, camera: &str) -> Option<WarningState> {
        self.inner.read().await.get(camera).copied()
    }

    /// Snapshot of every live warning.
    pub async fn get_all(&self) -> HashMap<String, WarningState> {
        self.inner.read().await.clone()
    }

    /// Remove a camera's warning. Returns whether one was set.
    pub async fn clear(&self, camera: &str) -> bool {
        let removed = self.inner.write().await.remove(camera).is_some();
        if removed {
            info!("[WARNING] Cleared warning for {}", camera);
        }
        removed
    }
}

/// Classify the dominant label over `window` frames starting at `start`.
///
/// Returns `None` when no label line in the range carries a confidence.
pub async fn judge_warning_label(label_dir: &Path, start: u32, window: u32) -> Option<WarningLabel> {
    let sums = store::label_confidence_sums(label_dir, start, window).await;

    sums.into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(class_id, _)| WarningLabel::from_class_id(&class_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_board_overwrite_and_clear() {
        let board = WarningBoard::new();
        board.set("cam1", WarningLabel::Animal).await;
        board.set("cam1", WarningLabel::Person).await;
        board.set("cam2", WarningLabel::Animal).await;

        assert_eq!(board.get("cam1").await.map(|w| w.label), Some(WarningLabel::Person));
        assert_eq!(board.get_all().await.len(), 2);

        assert!(board.clear("cam1").await);
        assert!(!board.clear("cam1").await);
        assert!(board.get("cam1").await.is_none());
    }

    #[tokio::test]
    async fn test_judge_warning_label() {
        let dir = TempDir::new().unwrap();
        for f in 100..105 {
            tokio::fs::write(store::frame_path(dir.path(), f), "15 0 0 0 0 0.3\n0 0 0 0 0 0.2\n")
                .await
                .unwrap();
        }
        tokio::fs::write(store::frame_path(dir.path(), 250), "0 0 0 0 0 9.0\n").await.unwrap();

        assert_eq!(judge_warning_label(dir.path(), 100, 100).await, Some(WarningLabel::Animal));
        assert_eq!(judge_warning_label(dir.path(), 200, 100).await, Some(WarningLabel::Person));
        assert_eq!(judge_warning_label(dir.path(), 400, 100).await, None);
    }
}
