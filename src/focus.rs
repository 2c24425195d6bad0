//! Target selection and liveness.
//!
//! An explicitly delivered pose always wins; otherwise the fallback frame is tracked while
//! it can be resolved. Only explicit poses count as signs of life: the idle policy
//! (fidget, then rest) runs off the time since the last one.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::PointingConfig;
use crate::geometry::Pose3D;
use crate::interfaces::CoordinateTransformer;

/// Creates the depth-1 pose mailbox between a pose source and the coordinator.
pub fn pose_channel() -> (PoseSender, PoseInbox) {
    let (tx, rx) = watch::channel(None);
    (PoseSender(tx), PoseInbox(rx))
}

/// Handed to the pose source. A newer pose replaces any unprocessed older one.
#[derive(Debug, Clone)]
pub struct PoseSender(watch::Sender<Option<Pose3D>>);

impl PoseSender {
    pub fn publish(&self, pose: Pose3D) {
        self.0.send_replace(Some(pose));
    }
}

#[derive(Debug)]
pub struct PoseInbox(watch::Receiver<Option<Pose3D>>);

impl PoseInbox {
    /// The pose delivered since the last take, if any.
    pub fn try_take(&mut self) -> Option<Pose3D> {
        match self.0.has_changed() {
            Ok(true) => self.0.borrow_and_update().clone(),
            _ => None,
        }
    }

    /// Waits for the next delivered pose. Never resolves once every sender is gone.
    pub async fn recv(&mut self) -> Pose3D {
        loop {
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
            let latest = self.0.borrow_and_update().clone();
            if let Some(pose) = latest {
                return pose;
            }
        }
    }
}

/// Time of the last accepted external pose. `None` until the first one arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessClock {
    last: Option<Instant>,
}

impl LivenessClock {
    pub fn touch(&mut self, now: Instant) {
        self.last = Some(match self.last {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    pub fn last(&self) -> Option<Instant> {
        self.last
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last.map(|t| now.saturating_duration_since(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSource {
    ExternalPose,
    FallbackFrame,
    None,
}

/// The target chosen for one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub source: FocusSource,
    pub target: Option<Pose3D>,
}

impl Focus {
    fn none() -> Self {
        Self {
            source: FocusSource::None,
            target: None,
        }
    }
}

/// What the idle policy wants this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Recent enough (or never seen): point and gaze normally.
    Track,
    /// First cycle of a new idle window.
    Fidget,
    /// Idle window already fidgeted; do nothing.
    Hold,
    Rest,
}

#[derive(Debug)]
pub struct FocusTracker {
    head_frame: String,
    fallback_frame: String,
    fidget_after: Duration,
    rest_after: Duration,
    clock: LivenessClock,
    fidgeted_window: Option<Instant>,
}

impl FocusTracker {
    pub fn new(config: &PointingConfig) -> Self {
        Self {
            head_frame: config.head_frame.clone(),
            fallback_frame: config.fallback_frame.clone(),
            fidget_after: config.fidget_after(),
            rest_after: config.rest_after(),
            clock: LivenessClock::default(),
            fidgeted_window: None,
        }
    }

    pub fn clock(&self) -> &LivenessClock {
        &self.clock
    }

    /// Picks this cycle's target. `fresh` is the external pose delivered since the last
    /// cycle, if one was.
    pub fn select(
        &mut self,
        fresh: Option<Pose3D>,
        transformer: &dyn CoordinateTransformer,
        now: Instant,
    ) -> Focus {
        if let Some(pose) = fresh {
            self.clock.touch(now);
            return Focus {
                source: FocusSource::ExternalPose,
                target: Some(pose),
            };
        }

        match self.fallback_pose(transformer) {
            Some(pose) => Focus {
                source: FocusSource::FallbackFrame,
                target: Some(pose),
            },
            None => Focus::none(),
        }
    }

    fn fallback_pose(&self, transformer: &dyn CoordinateTransformer) -> Option<Pose3D> {
        if !transformer.frame_exists(&self.fallback_frame) {
            return None;
        }
        let stamp = transformer.latest_common_time(&self.head_frame, &self.fallback_frame)?;
        transformer
            .can_transform(&self.head_frame, &self.fallback_frame, stamp)
            .then(|| Pose3D::origin_of(self.fallback_frame.as_str(), stamp))
    }

    /// Records that the current idle window got its fidget.
    pub fn mark_fidgeted(&mut self) {
        self.fidgeted_window = self.clock.last();
    }

    /// `Fidget` repeats until [`FocusTracker::mark_fidgeted`] confirms the motion ran.
    pub fn idle_action(&self, now: Instant) -> IdleAction {
        let Some(last) = self.clock.last() else {
            return IdleAction::Track;
        };
        let elapsed = now.saturating_duration_since(last);

        if elapsed > self.rest_after {
            IdleAction::Rest
        } else if elapsed > self.fidget_after {
            if self.fidgeted_window == Some(last) {
                IdleAction::Hold
            } else {
                IdleAction::Fidget
            }
        } else {
            IdleAction::Track
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FrameTable;
    use nalgebra::Vector3;

    fn tracker() -> FocusTracker {
        FocusTracker::new(&PointingConfig::default())
    }

    fn frames() -> FrameTable {
        FrameTable::new()
            .with_frame("Head", Vector3::zeros())
            .with_frame("sandtray", Vector3::new(0.5, 0.0, -0.3))
    }

    #[test]
    fn external_pose_wins_over_fallback() {
        let mut focus = tracker();
        let now = Instant::now();
        let pose = Pose3D::new(1.0, 0.0, 0.0, "Head", 3.0);

        let chosen = focus.select(Some(pose.clone()), &frames(), now);
        assert_eq!(chosen.source, FocusSource::ExternalPose);
        assert_eq!(chosen.target, Some(pose));
        assert_eq!(focus.clock().last(), Some(now));
    }

    #[test]
    fn fallback_does_not_refresh_liveness() {
        let mut focus = tracker();
        let chosen = focus.select(None, &frames(), Instant::now());

        assert_eq!(chosen.source, FocusSource::FallbackFrame);
        assert_eq!(chosen.target.as_ref().map(Pose3D::frame), Some("sandtray"));
        assert_eq!(focus.clock().last(), None);
    }

    #[test]
    fn nothing_to_track_without_pose_or_fallback() {
        let mut focus = tracker();
        let mut table = frames();
        table.remove_frame("sandtray");

        let chosen = focus.select(None, &table, Instant::now());
        assert_eq!(chosen, Focus::none());
    }

    #[test]
    fn never_seen_is_not_stale() {
        let mut focus = tracker();
        assert_eq!(focus.idle_action(Instant::now()), IdleAction::Track);
    }

    #[test]
    fn one_fidget_per_idle_window_then_rest() {
        let mut focus = tracker();
        let start = Instant::now();
        focus.select(Some(Pose3D::origin_of("Head", 0.0)), &frames(), start);

        assert_eq!(focus.idle_action(start + Duration::from_secs(5)), IdleAction::Track);
        assert_eq!(
            focus.idle_action(start + Duration::from_millis(5100)),
            IdleAction::Fidget
        );
        focus.mark_fidgeted();
        for secs in [6, 10, 20, 30] {
            assert_eq!(
                focus.idle_action(start + Duration::from_secs(secs)),
                IdleAction::Hold
            );
        }
        assert_eq!(
            focus.idle_action(start + Duration::from_millis(30_100)),
            IdleAction::Rest
        );

        // A new pose opens a new window.
        let later = start + Duration::from_secs(40);
        focus.select(Some(Pose3D::origin_of("Head", 40.0)), &frames(), later);
        assert_eq!(focus.idle_action(later), IdleAction::Track);
        assert_eq!(
            focus.idle_action(later + Duration::from_millis(5100)),
            IdleAction::Fidget
        );
    }

    #[test]
    fn unconfirmed_fidget_is_offered_again() {
        let mut focus = tracker();
        let start = Instant::now();
        focus.select(Some(Pose3D::origin_of("Head", 0.0)), &frames(), start);

        let idle = start + Duration::from_secs(6);
        assert_eq!(focus.idle_action(idle), IdleAction::Fidget);
        assert_eq!(
            focus.idle_action(idle + Duration::from_millis(500)),
            IdleAction::Fidget
        );

        focus.mark_fidgeted();
        assert_eq!(focus.idle_action(idle + Duration::from_secs(1)), IdleAction::Hold);
    }

    #[test]
    fn liveness_clock_never_goes_backwards() {
        let mut clock = LivenessClock::default();
        let now = Instant::now();
        clock.touch(now + Duration::from_secs(2));
        clock.touch(now);
        assert_eq!(clock.last(), Some(now + Duration::from_secs(2)));
        assert_eq!(clock.elapsed(now), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn inbox_keeps_only_the_latest_pose() {
        let (tx, mut inbox) = pose_channel();
        assert_eq!(inbox.try_take(), None);

        tx.publish(Pose3D::new(1.0, 0.0, 0.0, "Head", 1.0));
        tx.publish(Pose3D::new(2.0, 0.0, 0.0, "Head", 2.0));

        assert_eq!(inbox.recv().await.stamp(), 2.0);
        assert_eq!(inbox.try_take(), None);

        tx.publish(Pose3D::new(3.0, 0.0, 0.0, "Head", 3.0));
        assert_eq!(inbox.try_take().map(|p| p.stamp()), Some(3.0));
    }
}
