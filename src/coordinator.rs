//! The single thread of control.
//!
//! The [`Coordinator`] is the only writer of the posture state, the liveness clock and
//! the fall latch. Poses and fall events reach it through channels; everything else
//! happens inside [`Coordinator::cycle`] or the scripted posture operations, which are
//! raced against the fall signal so a fall always wins.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::arm::{ArmPointingController, ArmSolution};
use crate::config::PointingConfig;
use crate::error::{ConfigError, PointingError};
use crate::focus::{pose_channel, FocusSource, FocusTracker, IdleAction, PoseInbox, PoseSender};
use crate::gaze::{GazeCommand, GazeController};
use crate::geometry::{JointAngle, Pose3D};
use crate::interfaces::{CoordinateTransformer, MotionActuator};
use crate::journal::{Directive, MotionFact, MotionJournal};
use crate::posture::{PostureState, PostureStateMachine};
use crate::safety::{fall_channel, FallSignal, SafetyMonitor};

/// What a control cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fallen; nothing was issued.
    Suppressed,
    /// A fall arrived during this cycle and the stop-all was issued.
    FallStopped,
    /// No target from either source.
    Idle,
    /// The arm was brought to the ready posture; pointing starts next cycle.
    Readied,
    Tracked { pointed: bool, gazed: bool },
    Fidgeted,
    /// Idle window already fidgeted.
    Held,
    Rested,
    /// Recoverable failure (transform, actuator); retried next cycle.
    Skipped,
}

/// Input ends handed to the pose source and the fall-event source.
#[derive(Debug, Clone)]
pub struct InputHandles {
    pub poses: PoseSender,
    pub falls: FallSignal,
}

#[derive(Debug, Clone, Copy)]
enum Script {
    Ready,
    Resting,
    Fidget,
}

pub struct Coordinator {
    config: PointingConfig,
    transformer: Arc<dyn CoordinateTransformer>,
    actuator: Arc<dyn MotionActuator>,
    arm: ArmPointingController,
    gaze: GazeController,
    posture: PostureStateMachine,
    focus: FocusTracker,
    safety: SafetyMonitor,
    poses: PoseInbox,
    journal: Option<MotionJournal>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("handedness", &self.config.handedness)
            .field("posture", &self.posture.state())
            .field("liveness", &self.focus.clock().last())
            .field("fallen", &self.safety.has_fallen())
            .field("journal", &self.journal.is_some())
            .finish()
    }
}

impl Coordinator {
    pub fn new(
        config: PointingConfig,
        transformer: Arc<dyn CoordinateTransformer>,
        actuator: Arc<dyn MotionActuator>,
    ) -> Result<(Self, InputHandles), ConfigError> {
        config.validate()?;

        let (pose_tx, poses) = pose_channel();
        let (falls, safety) = fall_channel(config.handedness.effector());
        let coordinator = Self {
            arm: ArmPointingController::new(&config),
            gaze: GazeController::new(&config),
            posture: PostureStateMachine::new(&config),
            focus: FocusTracker::new(&config),
            config,
            transformer,
            actuator,
            safety,
            poses,
            journal: None,
        };
        Ok((
            coordinator,
            InputHandles {
                poses: pose_tx,
                falls,
            },
        ))
    }

    pub fn with_posture(mut self, posture: PostureStateMachine) -> Self {
        self.posture = posture;
        self
    }

    pub fn with_journal(mut self, journal: MotionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn posture_state(&self) -> PostureState {
        self.posture.state()
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn is_fallen(&self) -> bool {
        self.safety.has_fallen()
    }

    pub fn journal(&self) -> Option<&MotionJournal> {
        self.journal.as_ref()
    }

    /// Stiffens the robot and takes effector control.
    pub async fn start(&mut self) -> Result<(), PointingError> {
        self.ensure_upright().await?;
        self.actuator.wake_up().await?;
        self.actuator
            .enable_effector_control(self.config.handedness.effector(), true)
            .await?;
        info!(handedness = ?self.config.handedness, "pointing coordinator started");
        Ok(())
    }

    /// Runs one control cycle with whatever pose arrived since the last one.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let fresh = self.poses.try_take();
        self.cycle_with(fresh).await
    }

    async fn cycle_with(&mut self, fresh: Option<Pose3D>) -> CycleOutcome {
        match self.try_cycle(fresh).await {
            Ok(outcome) => outcome,
            Err(PointingError::FallDetected) => CycleOutcome::Suppressed,
            Err(e) => {
                warn!("control cycle skipped: {e}");
                CycleOutcome::Skipped
            }
        }
    }

    async fn try_cycle(&mut self, fresh: Option<Pose3D>) -> Result<CycleOutcome, PointingError> {
        if self.check_fall().await? {
            return Ok(CycleOutcome::Suppressed);
        }

        let now = Instant::now();
        let focus = self.focus.select(fresh, self.transformer.as_ref(), now);

        match self.focus.idle_action(now) {
            IdleAction::Track => {}
            IdleAction::Hold => return Ok(CycleOutcome::Held),
            IdleAction::Fidget => {
                return Ok(match self.scripted(Script::Fidget).await? {
                    None => CycleOutcome::FallStopped,
                    Some(true) => {
                        self.focus.mark_fidgeted();
                        CycleOutcome::Fidgeted
                    }
                    Some(false) => CycleOutcome::Held,
                });
            }
            IdleAction::Rest => {
                return Ok(match self.scripted(Script::Resting).await? {
                    None => CycleOutcome::FallStopped,
                    Some(_) => CycleOutcome::Rested,
                });
            }
        }

        let Some(target) = focus.target else {
            return Ok(CycleOutcome::Idle);
        };
        if focus.source == FocusSource::FallbackFrame {
            debug!(frame = target.frame(), "tracking fallback frame");
        }

        if !self.posture.is_ready() {
            return Ok(match self.scripted(Script::Ready).await? {
                None => CycleOutcome::FallStopped,
                Some(_) => CycleOutcome::Readied,
            });
        }

        self.track(&target).await
    }

    /// Points and gazes at `target`. Both transforms are resolved before anything is
    /// issued, so a missing transform skips the whole cycle.
    async fn track(&mut self, target: &Pose3D) -> Result<CycleOutcome, PointingError> {
        let solution = self.arm.solve(self.transformer.as_ref(), target)?;
        let gaze = self.gaze.compute(self.transformer.as_ref(), target)?;

        let pointed = match solution {
            ArmSolution::Reach { shoulder, elbow } => {
                self.issue_point(target, &shoulder, &elbow).await?;
                true
            }
            ArmSolution::Infeasible(why) => {
                debug!(%why, "not pointing this cycle");
                false
            }
        };

        let gazed = match gaze {
            Some(command) => {
                self.issue_gaze(target, &command).await?;
                true
            }
            None => false,
        };

        Ok(CycleOutcome::Tracked { pointed, gazed })
    }

    /// Points at `target` immediately. The arm must already be ready.
    pub async fn point_at(
        &mut self,
        target: &Pose3D,
    ) -> Result<(JointAngle, JointAngle), PointingError> {
        self.ensure_upright().await?;
        if !self.posture.is_ready() {
            return Err(PointingError::NotReady);
        }
        match self.arm.solve(self.transformer.as_ref(), target)? {
            ArmSolution::Reach { shoulder, elbow } => {
                self.issue_point(target, &shoulder, &elbow).await?;
                Ok((shoulder, elbow))
            }
            ArmSolution::Infeasible(why) => Err(PointingError::Infeasible(why)),
        }
    }

    /// Turns the head toward `target`. `Ok(None)` inside the deadband.
    pub async fn gaze_at(&mut self, target: &Pose3D) -> Result<Option<GazeCommand>, PointingError> {
        self.ensure_upright().await?;
        if !self.posture.is_ready() {
            return Err(PointingError::NotReady);
        }
        let command = self.gaze.compute(self.transformer.as_ref(), target)?;
        if let Some(command) = &command {
            self.issue_gaze(target, command).await?;
        }
        Ok(command)
    }

    pub async fn request_ready(&mut self) -> Result<bool, PointingError> {
        self.ensure_upright().await?;
        self.scripted(Script::Ready)
            .await?
            .ok_or(PointingError::FallDetected)
    }

    pub async fn request_fidget(&mut self) -> Result<bool, PointingError> {
        self.ensure_upright().await?;
        self.scripted(Script::Fidget)
            .await?
            .ok_or(PointingError::FallDetected)
    }

    pub async fn request_rest(&mut self) -> Result<bool, PointingError> {
        self.ensure_upright().await?;
        self.scripted(Script::Resting)
            .await?
            .ok_or(PointingError::FallDetected)
    }

    /// Drives the coordinator until `shutdown` resolves, then rests the arm and releases
    /// effector control.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), PointingError>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.cycle_period());
        // A scripted motion can take several periods; don't replay the ticks it ate.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(hz = self.config.tick_hz, "pointing coordinator running");
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.safety.fall_triggered(), if !self.safety.is_latched() => {
                    if let Err(e) = self.check_fall().await {
                        warn!("fall stop incomplete: {e}");
                    }
                }
                pose = self.poses.recv() => {
                    self.cycle_with(Some(pose)).await;
                }
                _ = ticker.tick() => {
                    self.cycle().await;
                }
            }
        }

        self.shutdown().await
    }

    /// Rests the arm (unless fallen) and releases effector control.
    pub async fn shutdown(&mut self) -> Result<(), PointingError> {
        info!("pointing coordinator shutting down");
        if self.check_fall().await? {
            // The fall latch already released the effector.
            return Ok(());
        }
        if self.scripted(Script::Resting).await?.is_none() {
            return Ok(());
        }
        self.actuator
            .enable_effector_control(self.config.handedness.effector(), false)
            .await?;
        self.record(MotionFact::now(Directive::Shutdown, "released"));
        Ok(())
    }

    async fn ensure_upright(&mut self) -> Result<(), PointingError> {
        if self.check_fall().await? {
            return Err(PointingError::FallDetected);
        }
        Ok(())
    }

    /// Latches a pending fall. Returns whether the robot is fallen.
    async fn check_fall(&mut self) -> Result<bool, PointingError> {
        let was_latched = self.safety.is_latched();
        let fallen = self.safety.check(self.actuator.as_ref()).await?;
        if fallen && !was_latched {
            self.record(MotionFact::now(Directive::FallStop, "stopped"));
        }
        Ok(fallen)
    }

    /// Runs a scripted posture motion to completion unless a fall interrupts it.
    ///
    /// `Ok(None)` means the fall won: the motion was abandoned and the stop issued.
    async fn scripted(&mut self, script: Script) -> Result<Option<bool>, PointingError> {
        let actuator = self.actuator.as_ref();
        let posture = &mut self.posture;
        let motion = async move {
            match script {
                Script::Ready => posture.to_ready(actuator).await,
                Script::Resting => posture.to_resting(actuator).await,
                Script::Fidget => posture.idle_fidget(actuator).await,
            }
        };

        let raced = tokio::select! {
            biased;
            _ = self.safety.fall_triggered() => None,
            moved = motion => Some(moved),
        };

        let Some(moved) = raced else {
            warn!(?script, "fall interrupted scripted motion");
            self.check_fall().await?;
            return Ok(None);
        };

        let moved = moved?;
        if moved {
            let directive = match script {
                Script::Ready => Directive::ToReady,
                Script::Resting => Directive::ToResting,
                Script::Fidget => Directive::Fidget,
            };
            self.record(MotionFact::now(directive, "completed"));
        }
        Ok(Some(moved))
    }

    async fn issue_point(
        &self,
        target: &Pose3D,
        shoulder: &JointAngle,
        elbow: &JointAngle,
    ) -> Result<(), PointingError> {
        let joints = [shoulder.joint().to_string(), elbow.joint().to_string()];
        let angles = [shoulder.value(), elbow.value()];
        self.actuator
            .set_angles(&joints, &angles, self.config.arm_speed)
            .await?;
        self.record(
            MotionFact::now(Directive::Point, "issued")
                .with_target([target.x(), target.y(), target.z()])
                .with_angles(&angles),
        );
        Ok(())
    }

    async fn issue_gaze(
        &self,
        target: &Pose3D,
        command: &GazeCommand,
    ) -> Result<(), PointingError> {
        self.actuator
            .change_angles(&GazeCommand::joint_names(), &command.angles(), command.speed)
            .await?;
        self.record(
            MotionFact::now(Directive::Gaze, "issued")
                .with_target([target.x(), target.y(), target.z()])
                .with_angles(&command.angles()),
        );
        Ok(())
    }

    fn record(&self, fact: MotionFact) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(&fact) {
                warn!("failed to journal {:?}: {e}", fact.directive);
            }
        }
    }
}
