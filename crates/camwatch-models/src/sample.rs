//! Per-frame samples produced by the offline detector and tracker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::{Div, Sub};

/// A 3-D vector (metres or metres/second depending on context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from a slice of exactly three components.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, z] => Some(Self::new(*x, *y, *z)),
            _ => None,
        }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let d = *self - *other;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// One detected object in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionSample {
    pub frame_index: u32,
    /// Detector class id ("0" is a person).
    pub class_id: String,
    /// Confidence in [0, 1]; 1.0 when the label line carries none.
    pub confidence: f64,
}

impl DetectionSample {
    pub fn new(frame_index: u32, class_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            frame_index,
            class_id: class_id.into(),
            confidence,
        }
    }
}

/// Tracked 3-D position of the target in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PositionSample {
    pub frame_index: u32,
    pub position: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3::new(3.0, 4.0, 0.0);
        let b = Vec3::default();
        assert_eq!(a - b, a);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
        assert_eq!(a / 2.0, Vec3::new(1.5, 2.0, 0.0));
    }

    #[test]
    fn test_vec3_from_slice() {
        assert_eq!(Vec3::from_slice(&[1.0, 2.0, 3.0]), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(Vec3::from_slice(&[1.0, 2.0]), None);
    }
}
