/// Why a target cannot be pointed at.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infeasibility {
    /// The target projects onto the shoulder itself; no direction is defined.
    #[error("undefined target direction")]
    UndefinedDirection,
    /// The target lies behind the robot; the arm never reaches backward.
    #[error("target behind robot")]
    BehindRobot,
}

/// Failure reported by a [`crate::MotionActuator`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ActuatorError(pub String);

#[derive(thiserror::Error, Debug)]
pub enum PointingError {
    #[error("no transform from {source_frame} to {target}: {reason}")]
    TransformUnavailable {
        target: String,
        source_frame: String,
        reason: String,
    },

    #[error("infeasible target: {0}")]
    Infeasible(Infeasibility),

    #[error("arm is not in the ready-to-point posture")]
    NotReady,

    #[error("fall detected; motion is latched off")]
    FallDetected,

    #[error("actuator error: {0}")]
    Actuator(#[from] ActuatorError),
}

impl PointingError {
    pub fn transform_unavailable(
        target: impl Into<String>,
        source_frame: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TransformUnavailable {
            target: target.into(),
            source_frame: source_frame.into(),
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_targets_read_naturally() {
        let err = PointingError::Infeasible(Infeasibility::BehindRobot);
        assert_eq!(Infeasibility::UndefinedDirection.to_string(), "undefined target direction");
        assert!(err.to_string().contains("target behind robot"));
    }
}
