//! Camera stream identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing model identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown modality: {0}")]
    UnknownModality(String),
}

/// Imaging modality of a camera feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Rgb,
    Thermal,
}

impl Modality {
    /// All modalities, in planning order.
    pub const ALL: [Modality; 2] = [Modality::Rgb, Modality::Thermal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Rgb => "rgb",
            Modality::Thermal => "thermal",
        }
    }

    /// Thermal streams never judge warnings or narrate velocity.
    pub fn is_thermal(&self) -> bool {
        matches!(self, Modality::Thermal)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rgb" => Ok(Modality::Rgb),
            "thermal" => Ok(Modality::Thermal),
            other => Err(ModelError::UnknownModality(other.to_string())),
        }
    }
}

/// Identifies one (camera, modality) feed, rendered as `{camera}_{modality}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct StreamKey {
    pub camera: String,
    pub modality: Modality,
}

impl StreamKey {
    pub fn new(camera: impl Into<String>, modality: Modality) -> Self {
        Self {
            camera: camera.into(),
            modality,
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.camera, self.modality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key_display() {
        let key = StreamKey::new("cam1", Modality::Thermal);
        assert_eq!(key.to_string(), "cam1_thermal");
    }

    #[test]
    fn test_modality_parse() {
        assert_eq!(" RGB ".parse::<Modality>(), Ok(Modality::Rgb));
        assert_eq!(
            "infrared".parse::<Modality>(),
            Err(ModelError::UnknownModality("infrared".to_string()))
        );
    }

    #[test]
    fn test_modality_serde() {
        assert_eq!(serde_json::to_string(&Modality::Rgb).unwrap(), "\"rgb\"");
        let m: Modality = serde_json::from_str("\"thermal\"").unwrap();
        assert!(m.is_thermal());
    }
}
