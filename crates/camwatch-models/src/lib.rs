//! Shared data models for the camwatch replay pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Camera streams and modalities
//! - Per-frame detection and position samples
//! - Planned record tasks (clip windows)
//! - Detection events, warnings and the WebSocket log schema

pub mod event;
pub mod record_task;
pub mod sample;
pub mod stream;
pub mod warning;
pub mod ws;

// Re-export common types
pub use event::{DetectionEvent, EventLabel};
pub use record_task::RecordTask;
pub use sample::{DetectionSample, PositionSample, Vec3};
pub use stream::{Modality, ModelError, StreamKey};
pub use warning::{WarningLabel, WarningState};
pub use ws::LogEntry;
