//! Visual focus assessment.
//!
//! Measures how closely the estimated gaze follows a visual target, compared with a
//! baseline observer that always stares at the centre of the reference frame (the
//! target's starting position). Distances are planar (x, y), in metres.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PointingError;
use crate::geometry::Pose3D;
use crate::interfaces::CoordinateTransformer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentFrames {
    pub target_frame: String,
    pub gaze_frame: String,
    pub reference_frame: String,
}

impl Default for AssessmentFrames {
    fn default() -> Self {
        Self {
            target_frame: "visual_target".to_string(),
            gaze_frame: "gazepose_0".to_string(),
            reference_frame: "sandtray".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentSummary {
    pub samples: usize,
    pub total_distance: f64,
    pub mean_distance: f64,
    pub total_baseline_distance: f64,
    pub mean_baseline_distance: f64,
    /// Percentage by which the gaze beats the baseline; `None` if the baseline never moved.
    pub improvement_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    baseline: [f64; 2],
    samples: usize,
    total_distance: f64,
    total_baseline_distance: f64,
}

#[derive(Debug)]
pub struct FocusAssessment {
    frames: AssessmentFrames,
    run: Option<Run>,
}

impl FocusAssessment {
    pub fn new(frames: AssessmentFrames) -> Self {
        Self { frames, run: None }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Starts a run if idle, otherwise stops it and returns the summary.
    pub fn toggle(
        &mut self,
        transformer: &dyn CoordinateTransformer,
    ) -> Result<Option<AssessmentSummary>, PointingError> {
        if self.is_running() {
            return Ok(self.stop());
        }
        self.start(transformer)?;
        Ok(None)
    }

    /// Captures the baseline: where the reference centre sits relative to the target now.
    pub fn start(&mut self, transformer: &dyn CoordinateTransformer) -> Result<(), PointingError> {
        let reference = self.reference_in_target(transformer)?;
        info!(
            target_frame = %self.frames.target_frame,
            gaze_frame = %self.frames.gaze_frame,
            "starting visual focus assessment"
        );
        self.run = Some(Run {
            baseline: [reference.x(), reference.y()],
            samples: 0,
            total_distance: 0.0,
            total_baseline_distance: 0.0,
        });
        Ok(())
    }

    /// Accumulates one measurement. Does nothing when no run is active.
    pub fn sample(&mut self, transformer: &dyn CoordinateTransformer) -> Result<(), PointingError> {
        if self.run.is_none() {
            return Ok(());
        }

        let target_in_gaze = self.resolve(
            transformer,
            &self.frames.gaze_frame,
            &self.frames.target_frame,
        )?;
        let reference = self.reference_in_target(transformer)?;

        if let Some(run) = self.run.as_mut() {
            run.samples += 1;
            run.total_distance += target_in_gaze.planar_norm();
            run.total_baseline_distance += (reference.x() - run.baseline[0])
                .hypot(reference.y() - run.baseline[1]);
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Option<AssessmentSummary> {
        let run = self.run.take()?;
        let per_sample = |total: f64| {
            if run.samples == 0 {
                0.0
            } else {
                total / run.samples as f64
            }
        };
        let improvement_pct = (run.total_baseline_distance > 0.0).then(|| {
            ((run.total_baseline_distance - run.total_distance) / run.total_baseline_distance
                * 100.0)
                .ceil()
        });

        let summary = AssessmentSummary {
            samples: run.samples,
            total_distance: run.total_distance,
            mean_distance: per_sample(run.total_distance),
            total_baseline_distance: run.total_baseline_distance,
            mean_baseline_distance: per_sample(run.total_baseline_distance),
            improvement_pct,
        };
        info!(
            samples = summary.samples,
            mean_distance = summary.mean_distance,
            mean_baseline_distance = summary.mean_baseline_distance,
            improvement_pct = ?summary.improvement_pct,
            "visual focus assessment finished"
        );
        Some(summary)
    }

    fn reference_in_target(
        &self,
        transformer: &dyn CoordinateTransformer,
    ) -> Result<Pose3D, PointingError> {
        self.resolve(
            transformer,
            &self.frames.target_frame,
            &self.frames.reference_frame,
        )
    }

    /// The origin of `source` expressed in `target`, at their latest common time.
    fn resolve(
        &self,
        transformer: &dyn CoordinateTransformer,
        target: &str,
        source: &str,
    ) -> Result<Pose3D, PointingError> {
        let stamp = transformer
            .latest_common_time(target, source)
            .ok_or_else(|| PointingError::transform_unavailable(target, source, "no common time"))?;
        transformer.transform_pose(target, &Pose3D::origin_of(source, stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FrameTable;
    use nalgebra::Vector3;

    fn frames() -> FrameTable {
        FrameTable::new()
            .with_frame("sandtray", Vector3::zeros())
            .with_frame("visual_target", Vector3::new(0.3, 0.2, 0.0))
            .with_frame("gazepose_0", Vector3::new(0.3, 0.2, 0.0))
    }

    #[test]
    fn toggle_starts_then_summarises() {
        let mut table = frames();
        let mut assessment = FocusAssessment::new(AssessmentFrames::default());

        assert_eq!(assessment.toggle(&table).expect("start"), None);
        assert!(assessment.is_running());

        // Target moves 0.1 m; gaze lags 0.0333 m behind it.
        table.set_frame("visual_target", Vector3::new(0.4, 0.2, 0.0));
        table.set_frame("gazepose_0", Vector3::new(0.3667, 0.2, 0.0));
        assessment.sample(&table).expect("sample");
        assessment.sample(&table).expect("sample");

        let summary = assessment
            .toggle(&table)
            .expect("stop")
            .expect("summary on stop");
        assert_eq!(summary.samples, 2);
        assert!((summary.mean_distance - 0.0333).abs() < 1e-9);
        assert!((summary.mean_baseline_distance - 0.1).abs() < 1e-9);
        assert_eq!(summary.improvement_pct, Some(67.0));
        assert!(!assessment.is_running());
    }

    #[test]
    fn sampling_while_idle_is_ignored() {
        let mut assessment = FocusAssessment::new(AssessmentFrames::default());
        assessment.sample(&frames()).expect("sample");
        assert_eq!(assessment.stop(), None);
    }

    #[test]
    fn start_needs_the_frames() {
        let mut table = frames();
        table.remove_frame("visual_target");
        let mut assessment = FocusAssessment::new(AssessmentFrames::default());

        assert!(matches!(
            assessment.start(&table),
            Err(PointingError::TransformUnavailable { .. })
        ));
        assert!(!assessment.is_running());
    }

    #[test]
    fn static_target_has_no_improvement_figure() {
        let table = frames();
        let mut assessment = FocusAssessment::new(AssessmentFrames::default());
        assessment.start(&table).expect("start");
        assessment.sample(&table).expect("sample");

        let summary = assessment.stop().expect("summary");
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.mean_distance, 0.0);
        assert_eq!(summary.improvement_pct, None);
    }
}
