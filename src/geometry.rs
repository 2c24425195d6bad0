//! Shared value types for the pointing kernel.
//!
//! Kept deliberately small: poses and joint angles are exchanged between the controllers,
//! the coordinator and the external collaborators, and are discarded within one cycle.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A 3D position expressed in a named reference frame.
///
/// Internally uses [`nalgebra::Vector3<f64>`] for downstream math convenience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose3D {
    position: Vector3<f64>,
    frame: String,
    stamp: f64,
}

impl Pose3D {
    pub fn new(x: f64, y: f64, z: f64, frame: impl Into<String>, stamp: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            frame: frame.into(),
            stamp,
        }
    }

    /// The origin of `frame` at time `stamp`.
    pub fn origin_of(frame: impl Into<String>, stamp: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, frame, stamp)
    }

    pub fn from_vector(position: Vector3<f64>, frame: impl Into<String>, stamp: f64) -> Self {
        Self {
            position,
            frame: frame.into(),
            stamp,
        }
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Reference frame identifier.
    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Timestamp in seconds.
    pub fn stamp(&self) -> f64 {
        self.stamp
    }

    /// Distance from the frame origin in the x/y plane.
    pub fn planar_norm(&self) -> f64 {
        self.position.xy().norm()
    }
}

/// Inclusive mechanical range of a joint, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    pub min: f64,
    pub max: f64,
}

impl JointLimit {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn from_degrees(min_deg: f64, max_deg: f64) -> Self {
        Self::new(min_deg.to_radians(), max_deg.to_radians())
    }

    /// The same range reflected through zero (left/right arm mirroring).
    pub fn mirrored(&self) -> Self {
        Self::new(-self.max, -self.min)
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        if angle < self.min {
            self.min
        } else if angle > self.max {
            self.max
        } else {
            angle
        }
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// A commanded joint angle. The value is clamped on construction, so a `JointAngle`
/// always lies within its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointAngle {
    joint: String,
    value: f64,
    limit: JointLimit,
}

impl JointAngle {
    pub fn clamped(joint: impl Into<String>, value: f64, limit: JointLimit) -> Self {
        Self {
            joint: joint.into(),
            value: limit.clamp(value),
            limit,
        }
    }

    pub fn joint(&self) -> &str {
        &self.joint
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn limit(&self) -> JointLimit {
        self.limit
    }
}
