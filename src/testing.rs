//! Test doubles shared by the module tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use nalgebra::Vector3;

use crate::error::{ActuatorError, PointingError};
use crate::geometry::Pose3D;
use crate::interfaces::{CoordinateTransformer, MotionActuator};

/// Frames that differ from a common root by a pure translation.
#[derive(Debug, Default)]
pub(crate) struct FrameTable {
    offsets: HashMap<String, Vector3<f64>>,
    stamp: f64,
}

impl FrameTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_frame(mut self, name: &str, origin: Vector3<f64>) -> Self {
        self.offsets.insert(name.to_string(), origin);
        self
    }

    pub(crate) fn set_frame(&mut self, name: &str, origin: Vector3<f64>) {
        self.offsets.insert(name.to_string(), origin);
    }

    pub(crate) fn remove_frame(&mut self, name: &str) {
        self.offsets.remove(name);
    }
}

impl CoordinateTransformer for FrameTable {
    fn frame_exists(&self, frame: &str) -> bool {
        self.offsets.contains_key(frame)
    }

    fn latest_common_time(&self, frame_a: &str, frame_b: &str) -> Option<f64> {
        (self.frame_exists(frame_a) && self.frame_exists(frame_b)).then_some(self.stamp)
    }

    fn can_transform(&self, target_frame: &str, source_frame: &str, _stamp: f64) -> bool {
        self.frame_exists(target_frame) && self.frame_exists(source_frame)
    }

    fn transform_pose(&self, target_frame: &str, pose: &Pose3D) -> Result<Pose3D, PointingError> {
        let (Some(to), Some(from)) =
            (self.offsets.get(target_frame), self.offsets.get(pose.frame()))
        else {
            return Err(PointingError::transform_unavailable(
                target_frame,
                pose.frame(),
                "frame not in table",
            ));
        };
        Ok(Pose3D::from_vector(
            pose.position() + from - to,
            target_frame,
            pose.stamp(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    SetAngles(Vec<String>, Vec<f64>, f64),
    Interpolate(Vec<String>, Vec<Vec<f64>>, Vec<Vec<f64>>),
    ChangeAngles(Vec<String>, Vec<f64>, f64),
    KillAll,
    EffectorControl(String, bool),
    WakeUp,
    Rest,
}

/// Records every command; interpolations can be made to hang until cancelled.
#[derive(Debug, Default)]
pub(crate) struct RecordingActuator {
    commands: Mutex<Vec<Command>>,
    hang_interpolations: bool,
}

impl RecordingActuator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn hanging() -> Self {
        Self {
            hang_interpolations: true,
            ..Self::default()
        }
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().expect("command log poisoned").clone()
    }

    pub(crate) fn interpolation_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, Command::Interpolate(..)))
            .count()
    }

    fn push(&self, command: Command) {
        self.commands.lock().expect("command log poisoned").push(command);
    }
}

#[async_trait]
impl MotionActuator for RecordingActuator {
    async fn set_angles(
        &self,
        joints: &[String],
        angles: &[f64],
        speed_fraction: f64,
    ) -> Result<(), ActuatorError> {
        self.push(Command::SetAngles(joints.to_vec(), angles.to_vec(), speed_fraction));
        Ok(())
    }

    async fn angle_interpolation(
        &self,
        joints: &[String],
        angles: &[Vec<f64>],
        times: &[Vec<f64>],
        _absolute: bool,
    ) -> Result<(), ActuatorError> {
        self.push(Command::Interpolate(joints.to_vec(), angles.to_vec(), times.to_vec()));
        if self.hang_interpolations {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn change_angles(
        &self,
        joints: &[String],
        angles: &[f64],
        speed_fraction: f64,
    ) -> Result<(), ActuatorError> {
        self.push(Command::ChangeAngles(joints.to_vec(), angles.to_vec(), speed_fraction));
        Ok(())
    }

    async fn kill_all(&self) -> Result<(), ActuatorError> {
        self.push(Command::KillAll);
        Ok(())
    }

    async fn enable_effector_control(
        &self,
        effector: &str,
        enabled: bool,
    ) -> Result<(), ActuatorError> {
        self.push(Command::EffectorControl(effector.to_string(), enabled));
        Ok(())
    }

    async fn wake_up(&self) -> Result<(), ActuatorError> {
        self.push(Command::WakeUp);
        Ok(())
    }

    async fn rest(&self) -> Result<(), ActuatorError> {
        self.push(Command::Rest);
        Ok(())
    }
}
