//! Event log entries pushed to WebSocket clients and served by `/logs`.

use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::{DetectionEvent, EventLabel};

/// Timestamp format used in log entries.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One entry of the recent-events ring buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
    pub time: String,
    /// Stream name (e.g. `cam1_rgb`)
    pub cam: String,
    pub label: EventLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Public URL of the clip, when the event carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<String>,
}

impl LogEntry {
    /// Build an entry from an event.
    ///
    /// Velocity narrations are carried in `message`; clip events get the
    /// already-rewritten public URL in `clip`.
    pub fn from_event(event: &DetectionEvent, clip_url: Option<String>, at: DateTime<Local>) -> Self {
        let message = if event.is_velocity() {
            Some(event.content.clone())
        } else {
            event.message.clone()
        };

        Self {
            time: at.format(LOG_TIME_FORMAT).to_string(),
            cam: event.stream.to_string(),
            label: event.label,
            message,
            clip: if event.is_velocity() { None } else { clip_url },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Modality, StreamKey};
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_clip_entry() {
        let event = DetectionEvent::clip(
            StreamKey::new("cam1", Modality::Rgb),
            EventLabel::Animal,
            "static/clips/cam1_rgb/a.mp4",
            Some("avg conf 0.75".to_string()),
        );
        let entry = LogEntry::from_event(&event, Some("/clips/cam1_rgb/a.mp4".to_string()), at());

        assert_eq!(entry.time, "2024-05-01 12:30:00");
        assert_eq!(entry.cam, "cam1_rgb");
        assert_eq!(entry.message.as_deref(), Some("avg conf 0.75"));
        assert_eq!(entry.clip.as_deref(), Some("/clips/cam1_rgb/a.mp4"));
    }

    #[test]
    fn test_velocity_entry_moves_narration_to_message() {
        let event = DetectionEvent::velocity(StreamKey::new("cam1", Modality::Rgb), "moving east");
        let entry = LogEntry::from_event(&event, Some("/ignored".to_string()), at());

        assert_eq!(entry.message.as_deref(), Some("moving east"));
        assert!(entry.clip.is_none());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["label"], "velocity");
        assert!(json.get("clip").is_none());
    }
}
