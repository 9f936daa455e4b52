//! Detection-driven clip extraction over looping camera replays.
//!
//! This crate provides:
//! - Readers for the per-frame label and position files of each stream
//! - DBSCAN clustering of frame indices and 3-D positions
//! - Record-task planning (one clip window per detection cluster)
//! - Finite-difference velocity narration
//! - The per-stream frame loop that records clips and raises warnings
//! - A supervisor running one worker per (camera, modality)

pub mod cluster;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod metrics;
pub mod planner;
pub mod sink;
pub mod state;
pub mod store;
pub mod streamer;
pub mod supervisor;
pub mod velocity;
pub mod warning;

pub use cluster::{Cluster, Dbscan};
pub use config::DetectorConfig;
pub use error::{DetectorError, DetectorResult};
pub use finalizer::{ClipFinalizer, FfmpegClipFinalizer};
pub use planner::{plan_all, plan_stream, RecordPlan};
pub use sink::{EventSink, NullSink};
pub use state::{ClipFlush, StreamState, WindowAction, WindowKey};
pub use store::PositionFormat;
pub use streamer::{LiveFrame, Streamer, StreamerDeps};
pub use supervisor::StreamSupervisor;
pub use velocity::{VelocityEstimator, VelocityReport};
pub use warning::WarningBoard;
