//! Pointing and gaze control kernel for a humanoid robot.
//!
//! This crate defines:
//! - [`ArmPointingController`]: closed-form two-link planar IK aiming one arm at a target.
//! - [`GazeController`]: head pan/tilt toward a target with adaptive speed and a deadband.
//! - [`PostureStateMachine`]: resting vs. ready-to-point, and the scripted motions between.
//! - [`FocusTracker`]: target source selection and the idle (fidget, then rest) policy.
//! - [`SafetyMonitor`]: the sticky fall latch.
//! - [`Coordinator`]: the single thread of control tying them together.
//!
//! Frame resolution and motion execution are external; see [`CoordinateTransformer`] and
//! [`MotionActuator`].

pub mod arm;
pub mod assessment;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod focus;
pub mod gaze;
pub mod geometry;
pub mod interfaces;
pub mod journal;
pub mod posture;
pub mod safety;

#[cfg(test)]
mod testing;

// Re-exported so integrators can build poses and open journals without declaring direct
// dependencies on `nalgebra` or `sled`.
pub use nalgebra;
pub use sled;

pub use arm::{ArmPointingController, ArmSolution};
pub use assessment::{AssessmentFrames, AssessmentSummary, FocusAssessment};
pub use config::{ArmJoint, Handedness, PointingConfig};
pub use coordinator::{Coordinator, CycleOutcome, InputHandles};
pub use error::{ActuatorError, ConfigError, Infeasibility, PointingError};
pub use focus::{
    pose_channel, Focus, FocusSource, FocusTracker, IdleAction, LivenessClock, PoseInbox,
    PoseSender,
};
pub use gaze::{GazeCommand, GazeController};
pub use geometry::{JointAngle, JointLimit, Pose3D};
pub use interfaces::{CoordinateTransformer, FallObserver, MotionActuator};
pub use journal::{Directive, JournalError, MotionFact, MotionJournal};
pub use posture::{PostureState, PostureStateMachine, Trajectory};
pub use safety::{fall_channel, FallSignal, SafetyMonitor};
