//! Per-camera warning banner state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::EventLabel;

/// What a judged warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WarningLabel {
    Person,
    Animal,
}

impl WarningLabel {
    pub fn from_class_id(class_id: &str) -> Self {
        match EventLabel::from_class_id(class_id) {
            EventLabel::Person => WarningLabel::Person,
            _ => WarningLabel::Animal,
        }
    }
}

/// The single live warning of a camera (`{"label": "person"}` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WarningState {
    pub label: WarningLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_wire_format() {
        let state = WarningState {
            label: WarningLabel::from_class_id("0"),
        };
        assert_eq!(serde_json::to_string(&state).unwrap(), r#"{"label":"person"}"#);
        assert_eq!(WarningLabel::from_class_id("3"), WarningLabel::Animal);
    }
}
