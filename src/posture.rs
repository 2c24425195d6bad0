//! Arm posture: resting vs. ready-to-point, and the scripted motions between them.
//!
//! Every operation here is run-to-completion: it owns the actuator until the awaited
//! interpolation returns. The state is written only after the motion completes, so an
//! interpolation abandoned mid-way (e.g. on a fall) leaves the previous state in place.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{ArmJoint, Handedness, PointingConfig};
use crate::error::PointingError;
use crate::interfaces::MotionActuator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostureState {
    #[default]
    Resting,
    ReadyToPoint,
}

/// Waypoint times shared by both scripted transitions, seconds.
const SCRIPT_TIMES: [f64; 3] = [1.5, 3.0, 4.5];

/// Right-arm waypoints per joint, in [`ArmJoint::POSTURE`] order.
const READY_SCRIPT: [[f64; 3]; 5] = [
    [1.0, 0.3, 0.0],    // shoulder pitch: raise to horizontal
    [-0.3, -0.5, -0.3], // shoulder roll
    [1.5, 1.6, 1.57],   // elbow yaw: turn the elbow into the pointing plane
    [0.8, 0.6, 0.5],    // elbow roll
    [0.5, 1.0, 1.2],    // wrist yaw
];

const REST_SCRIPT: [[f64; 3]; 5] = [
    [0.5, 1.2, 1.5],
    [-0.4, -0.2, -0.1],
    [1.5, 1.3, 1.2],
    [0.8, 0.6, 0.5],
    [0.8, 0.3, 0.0],
];

const FIDGET_SHOULDER_DEG: (f64, f64) = (-40.0, -30.0);
const FIDGET_ELBOW_DEG: (f64, f64) = (50.0, 70.0);

/// A multi-joint interpolation, ready to hand to [`MotionActuator::angle_interpolation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub joints: Vec<String>,
    pub angles: Vec<Vec<f64>>,
    pub times: Vec<Vec<f64>>,
}

impl Trajectory {
    fn scripted(handedness: Handedness, script: &[[f64; 3]; 5]) -> Self {
        let mut trajectory = Self {
            joints: Vec::with_capacity(script.len()),
            angles: Vec::with_capacity(script.len()),
            times: Vec::with_capacity(script.len()),
        };
        for (joint, waypoints) in ArmJoint::POSTURE.iter().zip(script) {
            let limit = joint.limit(handedness);
            trajectory.joints.push(joint.name(handedness));
            trajectory.angles.push(
                waypoints
                    .iter()
                    .map(|a| limit.clamp(joint.mirror(handedness, *a)))
                    .collect(),
            );
            trajectory.times.push(SCRIPT_TIMES.to_vec());
        }
        trajectory
    }

    pub fn ready(handedness: Handedness) -> Self {
        Self::scripted(handedness, &READY_SCRIPT)
    }

    pub fn rest(handedness: Handedness) -> Self {
        Self::scripted(handedness, &REST_SCRIPT)
    }

    async fn execute(&self, actuator: &dyn MotionActuator) -> Result<(), PointingError> {
        actuator
            .angle_interpolation(&self.joints, &self.angles, &self.times, true)
            .await?;
        Ok(())
    }
}

pub struct PostureStateMachine {
    handedness: Handedness,
    state: PostureState,
    fidget_duration: f64,
    rng: StdRng,
}

impl std::fmt::Debug for PostureStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostureStateMachine")
            .field("handedness", &self.handedness)
            .field("state", &self.state)
            .field("fidget_duration", &self.fidget_duration)
            .finish()
    }
}

impl PostureStateMachine {
    pub fn new(config: &PointingConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic fidgets, for replay and tests.
    pub fn with_seed(config: &PointingConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &PointingConfig, rng: StdRng) -> Self {
        Self {
            handedness: config.handedness,
            state: PostureState::Resting,
            fidget_duration: config.fidget_duration_secs,
            rng,
        }
    }

    pub fn state(&self) -> PostureState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PostureState::ReadyToPoint
    }

    /// Brings the arm into the pointing-ready configuration.
    ///
    /// Returns `Ok(false)` without moving if already ready.
    #[tracing::instrument(skip(self, actuator), fields(handedness = ?self.handedness))]
    pub async fn to_ready(
        &mut self,
        actuator: &dyn MotionActuator,
    ) -> Result<bool, PointingError> {
        if self.state == PostureState::ReadyToPoint {
            return Ok(false);
        }
        Trajectory::ready(self.handedness).execute(actuator).await?;
        self.state = PostureState::ReadyToPoint;
        info!("arm ready to point");
        Ok(true)
    }

    /// Lowers the arm back to rest. Returns `Ok(false)` without moving if already resting.
    #[tracing::instrument(skip(self, actuator), fields(handedness = ?self.handedness))]
    pub async fn to_resting(
        &mut self,
        actuator: &dyn MotionActuator,
    ) -> Result<bool, PointingError> {
        if self.state == PostureState::Resting {
            return Ok(false);
        }
        Trajectory::rest(self.handedness).execute(actuator).await?;
        self.state = PostureState::Resting;
        info!("arm resting");
        Ok(true)
    }

    /// A small random arm motion that keeps the robot looking alive without a target.
    ///
    /// Only legal while ready to point; otherwise returns `Ok(false)` without moving.
    #[tracing::instrument(skip(self, actuator))]
    pub async fn idle_fidget(
        &mut self,
        actuator: &dyn MotionActuator,
    ) -> Result<bool, PointingError> {
        if self.state != PostureState::ReadyToPoint {
            debug!("fidget requested while resting; ignored");
            return Ok(false);
        }
        self.fidget_trajectory().execute(actuator).await?;
        Ok(true)
    }

    fn fidget_trajectory(&mut self) -> Trajectory {
        let shoulder = self
            .rng
            .random_range(FIDGET_SHOULDER_DEG.0..=FIDGET_SHOULDER_DEG.1)
            .to_radians();
        let elbow = self
            .rng
            .random_range(FIDGET_ELBOW_DEG.0..=FIDGET_ELBOW_DEG.1)
            .to_radians();

        let h = self.handedness;
        let moves = [(ArmJoint::ShoulderRoll, shoulder), (ArmJoint::ElbowRoll, elbow)];
        Trajectory {
            joints: moves.iter().map(|(j, _)| j.name(h)).collect(),
            angles: moves
                .iter()
                .map(|(j, a)| vec![j.limit(h).clamp(j.mirror(h, *a))])
                .collect(),
            times: moves.iter().map(|_| vec![self.fidget_duration]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Command, RecordingActuator};

    fn machine() -> PostureStateMachine {
        PostureStateMachine::with_seed(&PointingConfig::default(), 7)
    }

    #[tokio::test]
    async fn to_ready_twice_runs_the_script_once() {
        let actuator = RecordingActuator::new();
        let mut posture = machine();

        assert!(posture.to_ready(&actuator).await.expect("ready"));
        assert!(!posture.to_ready(&actuator).await.expect("ready"));

        assert_eq!(posture.state(), PostureState::ReadyToPoint);
        assert_eq!(actuator.interpolation_count(), 1);
        assert_eq!(
            actuator.commands()[0],
            Command::Interpolate(
                Trajectory::ready(Handedness::Right).joints,
                Trajectory::ready(Handedness::Right).angles,
                Trajectory::ready(Handedness::Right).times,
            )
        );
    }

    #[tokio::test]
    async fn to_resting_is_a_no_op_from_rest() {
        let actuator = RecordingActuator::new();
        let mut posture = machine();

        assert!(!posture.to_resting(&actuator).await.expect("rest"));
        assert!(actuator.commands().is_empty());

        posture.to_ready(&actuator).await.expect("ready");
        assert!(posture.to_resting(&actuator).await.expect("rest"));
        assert_eq!(posture.state(), PostureState::Resting);
        assert_eq!(actuator.interpolation_count(), 2);
    }

    #[tokio::test]
    async fn fidget_requires_ready_posture() {
        let actuator = RecordingActuator::new();
        let mut posture = machine();

        assert!(!posture.idle_fidget(&actuator).await.expect("fidget"));
        assert!(actuator.commands().is_empty());
    }

    #[tokio::test]
    async fn fidget_angles_stay_in_their_sub_range() {
        let actuator = RecordingActuator::new();
        let mut posture = machine();
        posture.to_ready(&actuator).await.expect("ready");

        for _ in 0..50 {
            assert!(posture.idle_fidget(&actuator).await.expect("fidget"));
        }

        let fidgets: Vec<_> = actuator
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Interpolate(joints, angles, _) if joints.len() == 2 => Some(angles),
                _ => None,
            })
            .collect();
        assert_eq!(fidgets.len(), 50);

        for angles in fidgets {
            let (shoulder, elbow) = (angles[0][0].to_degrees(), angles[1][0].to_degrees());
            assert!((-40.0 - 1e-9..=-30.0 + 1e-9).contains(&shoulder), "shoulder {shoulder}");
            assert!((50.0 - 1e-9..=70.0 + 1e-9).contains(&elbow), "elbow {elbow}");
        }
    }

    #[test]
    fn scripted_waypoints_are_within_limits_for_both_arms() {
        for handedness in [Handedness::Left, Handedness::Right] {
            for trajectory in [Trajectory::ready(handedness), Trajectory::rest(handedness)] {
                for ((name, angles), joint) in trajectory
                    .joints
                    .iter()
                    .zip(&trajectory.angles)
                    .zip(ArmJoint::POSTURE)
                {
                    assert_eq!(name, &joint.name(handedness));
                    for angle in angles {
                        assert!(joint.limit(handedness).contains(*angle));
                    }
                }
            }
        }
    }

    #[test]
    fn left_arm_script_is_mirrored() {
        let right = Trajectory::ready(Handedness::Right);
        let left = Trajectory::ready(Handedness::Left);
        assert_eq!(left.joints[1], "LShoulderRoll");
        assert_eq!(left.angles[0], right.angles[0]);
        assert_eq!(left.angles[1][0], -right.angles[1][0]);
    }
}
