//! Contracts of the external collaborators.
//!
//! The kernel never talks to a transport or to the robot SDK directly; integrators
//! implement these traits on top of whatever middleware delivers frames and executes
//! joint commands.

use async_trait::async_trait;

use crate::error::{ActuatorError, PointingError};
use crate::geometry::Pose3D;

/// Resolves poses between named reference frames.
pub trait CoordinateTransformer: Send + Sync {
    fn frame_exists(&self, frame: &str) -> bool;

    /// Most recent time (seconds) at which both frames are known, if any.
    fn latest_common_time(&self, frame_a: &str, frame_b: &str) -> Option<f64>;

    fn can_transform(&self, target_frame: &str, source_frame: &str, stamp: f64) -> bool;

    /// Expresses `pose` in `target_frame`.
    ///
    /// Fails with [`PointingError::TransformUnavailable`] when no path exists.
    fn transform_pose(&self, target_frame: &str, pose: &Pose3D) -> Result<Pose3D, PointingError>;
}

/// The robot's native motion API.
///
/// `angle_interpolation` is run-to-completion: the returned future resolves once the
/// trajectory has been executed. Dropping that future abandons the wait, not the motion;
/// callers follow up with [`MotionActuator::kill_all`] when they need the joints stopped.
#[async_trait]
pub trait MotionActuator: Send + Sync {
    /// Absolute, non-blocking joint targets at a fraction of maximum speed.
    async fn set_angles(
        &self,
        joints: &[String],
        angles: &[f64],
        speed_fraction: f64,
    ) -> Result<(), ActuatorError>;

    /// Blocking multi-waypoint interpolation. `angles[i]` and `times[i]` are the
    /// waypoints of `joints[i]`; times are seconds from the start of the motion.
    async fn angle_interpolation(
        &self,
        joints: &[String],
        angles: &[Vec<f64>],
        times: &[Vec<f64>],
        absolute: bool,
    ) -> Result<(), ActuatorError>;

    /// Relative, non-blocking, rate-limited joint increments.
    async fn change_angles(
        &self,
        joints: &[String],
        angles: &[f64],
        speed_fraction: f64,
    ) -> Result<(), ActuatorError>;

    /// Stops every running motion immediately.
    async fn kill_all(&self) -> Result<(), ActuatorError>;

    async fn enable_effector_control(
        &self,
        effector: &str,
        enabled: bool,
    ) -> Result<(), ActuatorError>;

    async fn wake_up(&self) -> Result<(), ActuatorError>;

    async fn rest(&self) -> Result<(), ActuatorError>;
}

/// Callback registered with the fall-event source. Invoked once per fall, with no payload.
pub trait FallObserver: Send + Sync {
    fn on_fall(&self);
}
