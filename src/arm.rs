//! Closed-form pointing for a two-link planar arm (upper arm + forearm).

use std::f64::consts::FRAC_PI_2;

use crate::config::{ArmJoint, Handedness, PointingConfig};
use crate::error::{Infeasibility, PointingError};
use crate::geometry::{JointAngle, JointLimit, Pose3D};
use crate::interfaces::CoordinateTransformer;

/// Result of the IK solve. There are no partial solutions.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmSolution {
    Reach {
        shoulder: JointAngle,
        elbow: JointAngle,
    },
    Infeasible(Infeasibility),
}

impl ArmSolution {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Reach { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ArmPointingController {
    handedness: Handedness,
    frame: String,
    upper_arm: f64,
    forearm: f64,
    /// Limits of the right arm, in which the planar solve is carried out.
    right_shoulder_limit: JointLimit,
    shoulder_limit: JointLimit,
    elbow_limit: JointLimit,
}

impl ArmPointingController {
    pub fn new(config: &PointingConfig) -> Self {
        let handedness = config.handedness;
        Self {
            handedness,
            frame: config.arm_frame().to_string(),
            upper_arm: config.upper_arm_length,
            forearm: config.forearm_length,
            right_shoulder_limit: ArmJoint::ShoulderRoll.limit(Handedness::Right),
            shoulder_limit: ArmJoint::ShoulderRoll.limit(handedness),
            elbow_limit: ArmJoint::ElbowRoll.limit(handedness),
        }
    }

    /// Joint names in the order of the `(shoulder, elbow)` pair.
    pub fn joint_names(&self) -> [String; 2] {
        [
            ArmJoint::ShoulderRoll.name(self.handedness),
            ArmJoint::ElbowRoll.name(self.handedness),
        ]
    }

    pub fn reference_frame(&self) -> &str {
        &self.frame
    }

    /// Solves for the shoulder/elbow pair aiming at `target`.
    ///
    /// A missing transform is an error (skip the cycle); an unreachable direction is an
    /// [`ArmSolution::Infeasible`] value.
    pub fn solve(
        &self,
        transformer: &dyn CoordinateTransformer,
        target: &Pose3D,
    ) -> Result<ArmSolution, PointingError> {
        let local = transformer.transform_pose(&self.frame, target)?;
        // The planar derivation uses a forward axis rotated a quarter turn from the
        // shoulder frame's x axis.
        Ok(self.solve_planar(-local.y(), local.x()))
    }

    /// Solves directly in the kinematic plane.
    ///
    /// The left arm is solved as the right arm on the mirrored target, then both angles
    /// are mirrored back.
    pub fn solve_planar(&self, x: f64, y: f64) -> ArmSolution {
        if x == 0.0 && y == 0.0 {
            return ArmSolution::Infeasible(Infeasibility::UndefinedDirection);
        }
        if y < 0.0 {
            return ArmSolution::Infeasible(Infeasibility::BehindRobot);
        }

        let x = match self.handedness {
            Handedness::Right => x,
            Handedness::Left => -x,
        };
        let (shoulder, elbow) = self.solve_right(x, y);

        let shoulder = ArmJoint::ShoulderRoll.mirror(self.handedness, shoulder);
        let elbow = ArmJoint::ElbowRoll.mirror(self.handedness, elbow);
        let [shoulder_name, elbow_name] = self.joint_names();
        ArmSolution::Reach {
            shoulder: JointAngle::clamped(shoulder_name, shoulder, self.shoulder_limit),
            elbow: JointAngle::clamped(elbow_name, elbow, self.elbow_limit),
        }
    }

    /// Unclamped right-arm `(shoulder, elbow)` for a target in front of the shoulder.
    fn solve_right(&self, x: f64, y: f64) -> (f64, f64) {
        let (l1, l2) = (self.upper_arm, self.forearm);
        let r = x.hypot(y);

        if r > l1 + l2 {
            self.overextended(x, y)
        } else {
            let elbow = clamped_acos((r * r - l1 * l1 - l2 * l2) / (2.0 * l1 * l2));
            let shoulder = -FRAC_PI_2 + clamped_asin(y / r) - clamped_asin(l2 * elbow.sin() / r);
            (shoulder, elbow)
        }
    }

    /// Target beyond full extension: straighten the arm along the target direction.
    ///
    /// When the shoulder would pass its upper limit the elbow is set to the shoulder
    /// angle. This mirrors the deployed controller; see DESIGN.md before changing it.
    fn overextended(&self, x: f64, y: f64) -> (f64, f64) {
        let shoulder = -FRAC_PI_2 + y.atan2(x);
        if shoulder > self.right_shoulder_limit.max {
            (shoulder, shoulder)
        } else {
            (shoulder, 0.0)
        }
    }
}

fn clamped_acos(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos()
}

fn clamped_asin(sin: f64) -> f64 {
    sin.clamp(-1.0, 1.0).asin()
}
