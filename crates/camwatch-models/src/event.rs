//! Events leaving the detector core.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stream::StreamKey;

/// Class id the detector uses for people.
pub const PERSON_CLASS_ID: &str = "0";

/// Label attached to every emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventLabel {
    Person,
    Animal,
    Velocity,
}

impl EventLabel {
    /// Class "0" is a person, every other class is an animal.
    pub fn from_class_id(class_id: &str) -> Self {
        if class_id == PERSON_CLASS_ID {
            EventLabel::Person
        } else {
            EventLabel::Animal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventLabel::Person => "person",
            EventLabel::Animal => "animal",
            EventLabel::Velocity => "velocity",
        }
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip or velocity event, as handed to the event sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionEvent {
    /// Emitting stream
    pub stream: StreamKey,
    pub label: EventLabel,
    /// Clip path for person/animal events, narration text for velocity events
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DetectionEvent {
    /// A finalized clip.
    pub fn clip(
        stream: StreamKey,
        label: EventLabel,
        clip_path: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            stream,
            label,
            content: clip_path.into(),
            message,
        }
    }

    /// A velocity narration.
    pub fn velocity(stream: StreamKey, narration: impl Into<String>) -> Self {
        Self {
            stream,
            label: EventLabel::Velocity,
            content: narration.into(),
            message: None,
        }
    }

    pub fn is_velocity(&self) -> bool {
        self.label == EventLabel::Velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Modality;

    #[test]
    fn test_label_from_class_id() {
        assert_eq!(EventLabel::from_class_id("0"), EventLabel::Person);
        assert_eq!(EventLabel::from_class_id("15"), EventLabel::Animal);
        assert_eq!(EventLabel::from_class_id(""), EventLabel::Animal);
    }

    #[test]
    fn test_velocity_event() {
        let event = DetectionEvent::velocity(StreamKey::new("cam2", Modality::Rgb), "east at 1.0 m/s");
        assert!(event.is_velocity());
        assert_eq!(event.label.to_string(), "velocity");
        assert!(event.message.is_none());
    }
}
