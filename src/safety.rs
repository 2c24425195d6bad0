//! Fall latch.
//!
//! A fall event is sticky: once seen, every motion-issuing path in the coordinator is
//! short-circuited and nothing in this crate clears it again.

use tokio::sync::watch;
use tracing::{error, warn};

use crate::error::PointingError;
use crate::interfaces::{FallObserver, MotionActuator};

/// Creates the observer handed to the fall-event source and the monitor that consumes it.
pub fn fall_channel(effector: impl Into<String>) -> (FallSignal, SafetyMonitor) {
    let (tx, rx) = watch::channel(false);
    (
        FallSignal(tx),
        SafetyMonitor {
            rx,
            latched: false,
            effector: effector.into(),
        },
    )
}

#[derive(Debug, Clone)]
pub struct FallSignal(watch::Sender<bool>);

impl FallObserver for FallSignal {
    fn on_fall(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Debug)]
pub struct SafetyMonitor {
    rx: watch::Receiver<bool>,
    latched: bool,
    effector: String,
}

impl SafetyMonitor {
    /// True once the stop has been issued.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// True if a fall has been signalled, whether or not the stop went out yet.
    pub fn has_fallen(&self) -> bool {
        self.latched || *self.rx.borrow()
    }

    /// Resolves as soon as a fall has been signalled (immediately if it already was).
    pub async fn fall_triggered(&mut self) {
        let fired = self.rx.wait_for(|fallen| *fallen).await.is_ok();
        if !fired {
            // Signal dropped without a fall: it can never fire.
            std::future::pending::<()>().await;
        }
    }

    /// Latches the fall, stops every motion and releases the effector. Runs once.
    pub async fn latch(&mut self, actuator: &dyn MotionActuator) -> Result<(), PointingError> {
        if self.latched {
            return Ok(());
        }
        self.latched = true;
        error!(effector = %self.effector, "fall detected; stopping all motion");

        // Release the effector even if the stop-all was refused.
        let killed = actuator.kill_all().await;
        let released = actuator.enable_effector_control(&self.effector, false).await;
        if let Err(e) = &killed {
            warn!("stop-all after fall failed: {e}");
        }
        killed.and(released)?;
        Ok(())
    }

    /// Latches if a fall was signalled since the last check. Returns whether fallen.
    pub async fn check(&mut self, actuator: &dyn MotionActuator) -> Result<bool, PointingError> {
        let signalled = *self.rx.borrow_and_update();
        if signalled && !self.latched {
            self.latch(actuator).await?;
        }
        Ok(self.latched)
    }
}
