//! Planned clip windows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::EventLabel;

/// A contiguous frame range to be recorded as one clip.
///
/// Produced once per detection cluster at startup and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordTask {
    /// First frame of the window (inclusive)
    pub start_frame: u32,
    /// Last frame of the window (inclusive)
    pub end_frame: u32,
    /// Class with the highest summed confidence inside the window
    pub dominant_label: String,
    /// Mean confidence of the dominant class's samples
    pub average_confidence: f64,
}

impl RecordTask {
    /// Whether `frame` falls inside the window.
    pub fn contains(&self, frame: u32) -> bool {
        self.start_frame <= frame && frame <= self.end_frame
    }

    /// Event label derived from the dominant class.
    pub fn event_label(&self) -> EventLabel {
        EventLabel::from_class_id(&self.dominant_label)
    }

    /// Human-readable confidence note attached to clip events.
    pub fn confidence_message(&self) -> String {
        format!("avg conf {:.2}", self.average_confidence)
    }
}
