//! Head pan/tilt toward a target.

use crate::config::PointingConfig;
use crate::error::PointingError;
use crate::geometry::{JointLimit, Pose3D};
use crate::interfaces::CoordinateTransformer;

pub const HEAD_YAW: &str = "HeadYaw";
pub const HEAD_PITCH: &str = "HeadPitch";

pub const PAN_LIMIT: JointLimit = JointLimit::new(-2.0857, 2.0857);
pub const TILT_LIMIT: JointLimit = JointLimit::new(-0.6720, 0.5149);

const DEADBAND: f64 = 0.01;
const MAX_SPEED: f64 = 0.1;
const MIN_SPEED: f64 = 0.005;

/// Head increments toward the target, with the speed fraction to move at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeCommand {
    pub pan: f64,
    /// Head pitch; positive pitches the head down, so this is the negated camera tilt.
    pub tilt: f64,
    pub speed: f64,
}

impl GazeCommand {
    pub fn joint_names() -> [String; 2] {
        [HEAD_YAW.to_string(), HEAD_PITCH.to_string()]
    }

    pub fn angles(&self) -> [f64; 2] {
        [self.pan, self.tilt]
    }
}

#[derive(Debug, Clone)]
pub struct GazeController {
    head_frame: String,
}

impl GazeController {
    pub fn new(config: &PointingConfig) -> Self {
        Self {
            head_frame: config.head_frame.clone(),
        }
    }

    /// `None` when the head is already aligned within the deadband.
    pub fn compute(
        &self,
        transformer: &dyn CoordinateTransformer,
        target: &Pose3D,
    ) -> Result<Option<GazeCommand>, PointingError> {
        let local = transformer.transform_pose(&self.head_frame, target)?;
        Ok(Self::aim(local.x(), local.y(), local.z()))
    }

    /// Pan/tilt for a target already expressed in the head frame.
    pub fn aim(x: f64, y: f64, z: f64) -> Option<GazeCommand> {
        let pan = PAN_LIMIT.clamp(y.atan2(x));
        let tilt = TILT_LIMIT.clamp(-z.atan2(x));

        if pan.abs() < DEADBAND && tilt.abs() < DEADBAND {
            return None;
        }

        // Slow down as the head closes in on the target.
        let speed = if pan.abs() > MAX_SPEED {
            MAX_SPEED
        } else {
            pan.abs().max(MIN_SPEED)
        };

        Some(GazeCommand { pan, tilt, speed })
    }
}
