//! Runtime configuration consumed by the kernel.
//!
//! The kernel does not own parameter loading; an integrator builds a [`PointingConfig`]
//! (usually from JSON) and hands it to the [`crate::Coordinator`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::JointLimit;

/// Which arm points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

impl Handedness {
    fn prefix(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }

    /// Effector name used when enabling/disabling position control.
    pub fn effector(self) -> &'static str {
        match self {
            Self::Left => "LArm",
            Self::Right => "RArm",
        }
    }

    /// Default arm reference frame (the shoulder).
    pub fn shoulder_frame(self) -> &'static str {
        match self {
            Self::Left => "LShoulder",
            Self::Right => "RShoulder",
        }
    }
}

/// Arm joints driven by the kernel.
///
/// Limits are the right arm's; the left arm mirrors every joint except the shoulder pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmJoint {
    ShoulderPitch,
    ShoulderRoll,
    ElbowYaw,
    ElbowRoll,
    WristYaw,
}

impl ArmJoint {
    /// Joints moved by the scripted posture trajectories, in command order.
    pub const POSTURE: [ArmJoint; 5] = [
        ArmJoint::ShoulderPitch,
        ArmJoint::ShoulderRoll,
        ArmJoint::ElbowYaw,
        ArmJoint::ElbowRoll,
        ArmJoint::WristYaw,
    ];

    fn base_name(self) -> &'static str {
        match self {
            Self::ShoulderPitch => "ShoulderPitch",
            Self::ShoulderRoll => "ShoulderRoll",
            Self::ElbowYaw => "ElbowYaw",
            Self::ElbowRoll => "ElbowRoll",
            Self::WristYaw => "WristYaw",
        }
    }

    fn right_limit(self) -> JointLimit {
        match self {
            Self::ShoulderPitch => JointLimit::new(-2.0857, 2.0857),
            Self::ShoulderRoll => JointLimit::new(-1.3265, 0.3142),
            Self::ElbowYaw => JointLimit::new(-2.0857, 2.0857),
            Self::ElbowRoll => JointLimit::new(0.0349, 1.5446),
            Self::WristYaw => JointLimit::new(-1.8238, 1.8238),
        }
    }

    fn mirrors(self) -> bool {
        !matches!(self, Self::ShoulderPitch)
    }

    pub fn name(self, handedness: Handedness) -> String {
        format!("{}{}", handedness.prefix(), self.base_name())
    }

    pub fn limit(self, handedness: Handedness) -> JointLimit {
        match handedness {
            Handedness::Right => self.right_limit(),
            Handedness::Left if self.mirrors() => self.right_limit().mirrored(),
            Handedness::Left => self.right_limit(),
        }
    }

    /// Maps a right-arm angle onto `handedness`.
    pub fn mirror(self, handedness: Handedness, right_arm_angle: f64) -> f64 {
        if handedness == Handedness::Left && self.mirrors() {
            -right_arm_angle
        } else {
            right_arm_angle
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointingConfig {
    pub handedness: Handedness,
    /// Arm reference frame for the planar IK. Defaults to the pointing shoulder.
    pub arm_frame: Option<String>,
    pub head_frame: String,
    /// Frame tracked when no external pose arrives.
    pub fallback_frame: String,
    /// Upper-arm length `l1`, metres.
    pub upper_arm_length: f64,
    /// Forearm length `l2` (elbow to fingertip), metres.
    pub forearm_length: f64,
    /// Fraction of maximum speed for pointing commands.
    pub arm_speed: f64,
    /// Rate of the idle/tracking loop.
    pub tick_hz: f64,
    pub fidget_after_secs: f64,
    pub rest_after_secs: f64,
    /// Duration of a single idle fidget motion.
    pub fidget_duration_secs: f64,
}

impl Default for PointingConfig {
    fn default() -> Self {
        Self {
            handedness: Handedness::Right,
            arm_frame: None,
            head_frame: "Head".to_string(),
            fallback_frame: "sandtray".to_string(),
            upper_arm_length: 0.105,
            forearm_length: 0.1137,
            arm_speed: 0.2,
            tick_hz: 2.0,
            fidget_after_secs: 5.0,
            rest_after_secs: 30.0,
            fidget_duration_secs: 1.5,
        }
    }
}

impl PointingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.upper_arm_length > 0.0 && self.forearm_length > 0.0) {
            return Err(ConfigError::Invalid(
                "arm link lengths must be positive".to_string(),
            ));
        }
        if !(self.tick_hz > 0.0) {
            return Err(ConfigError::Invalid("tick_hz must be positive".to_string()));
        }
        if !(self.arm_speed > 0.0 && self.arm_speed <= 1.0) {
            return Err(ConfigError::Invalid(
                "arm_speed must be in (0, 1]".to_string(),
            ));
        }
        if !(self.fidget_after_secs >= 0.0 && self.fidget_after_secs < self.rest_after_secs) {
            return Err(ConfigError::Invalid(format!(
                "fidget_after_secs ({}) must be below rest_after_secs ({})",
                self.fidget_after_secs, self.rest_after_secs
            )));
        }
        if !(self.fidget_duration_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "fidget_duration_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn arm_frame(&self) -> &str {
        self.arm_frame
            .as_deref()
            .unwrap_or_else(|| self.handedness.shoulder_frame())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    pub fn fidget_after(&self) -> Duration {
        Duration::from_secs_f64(self.fidget_after_secs)
    }

    pub fn rest_after(&self) -> Duration {
        Duration::from_secs_f64(self.rest_after_secs)
    }
}
