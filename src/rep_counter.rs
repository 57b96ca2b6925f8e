use crate::{calibration::CalibrationData, history::SessionHistory, pose::Arm};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum ArmStage {
    /// Curled past the contracted threshold.
    Up,
    /// Extended past the extended threshold.
    Down,
    /// Joints not visible this frame. Only ever reported, never stored.
    Lost,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Feedback {
    OverCurling,
    OverExtending,
    StraightenArm,
    CurlDeeper,
}

impl Feedback {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Feedback::OverCurling => "OVER-CURLING",
            Feedback::OverExtending => "OVER-EXTENDING",
            Feedback::StraightenArm => "STRAIGHTEN ARM",
            Feedback::CurlDeeper => "CURL DEEPER",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArmMetrics {
    pub(crate) rep_count: u32,
    /// Last hysteresis stage, `Up` or `Down`. Survives detection dropouts.
    pub(crate) stage: ArmStage,
    /// Whether the arm's joints passed the visibility gate on the last frame.
    pub(crate) visible: bool,
    pub(crate) angle: i32,
    pub(crate) rep_time: f64,
    /// Fastest completed rep, 0 until the first one.
    pub(crate) min_rep_time: f64,
    pub(crate) curr_rep_time: f64,
    pub(crate) feedback: Option<Feedback>,
    pub(crate) last_down_time: f64,
}

/// Serialized view of [`ArmMetrics`]; time fields rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct ArmSnapshot {
    pub(crate) rep_count: u32,
    pub(crate) stage: ArmStage,
    pub(crate) angle: i32,
    pub(crate) rep_time: f64,
    pub(crate) min_rep_time: f64,
    pub(crate) curr_rep_time: f64,
    pub(crate) feedback: &'static str,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ArmMetrics {
    pub(crate) fn new(now: f64) -> Self {
        Self {
            rep_count: 0,
            stage: ArmStage::Down,
            visible: true,
            angle: 0,
            rep_time: 0.0,
            min_rep_time: 0.0,
            curr_rep_time: 0.0,
            feedback: None,
            last_down_time: now,
        }
    }

    pub(crate) fn snapshot(&self) -> ArmSnapshot {
        ArmSnapshot {
            rep_count: self.rep_count,
            stage: if self.visible {
                self.stage
            } else {
                ArmStage::Lost
            },
            angle: self.angle,
            rep_time: round2(self.rep_time),
            min_rep_time: round2(self.min_rep_time),
            curr_rep_time: round2(self.curr_rep_time),
            feedback: self.feedback.map_or("", Feedback::as_str),
        }
    }
}

pub(crate) struct RepCounter {
    min_rep_duration: f64,
}

impl RepCounter {
    pub(crate) fn new(min_rep_duration: f64) -> Self {
        Self { min_rep_duration }
    }

    /// Advance `arm`'s stage machine with this frame's smoothed `angle`.
    ///
    /// A rep is counted on the UP to DOWN edge only, and only once at least
    /// `min_rep_duration` has passed since the previous one.
    pub(crate) fn process_rep(
        &self,
        arm: Arm,
        angle: i32,
        metrics: &mut ArmMetrics,
        calibration: &CalibrationData,
        now: f64,
        history: &mut SessionHistory,
    ) {
        metrics.curr_rep_time = now - metrics.last_down_time;
        metrics.visible = true;
        metrics.angle = angle;
        metrics.feedback = None;

        if angle < calibration.contracted_threshold {
            metrics.stage = ArmStage::Up;
        }

        if angle > calibration.extended_threshold {
            if metrics.stage == ArmStage::Up && metrics.curr_rep_time >= self.min_rep_duration {
                let rep_time = now - metrics.last_down_time;
                if metrics.rep_count == 0 || rep_time < metrics.min_rep_time {
                    metrics.min_rep_time = rep_time;
                }
                metrics.rep_count += 1;
                metrics.rep_time = rep_time;
                metrics.last_down_time = now;
                debug!(
                    message = "rep completed",
                    ?arm,
                    rep_count = metrics.rep_count,
                    rep_time,
                );
            }
            metrics.stage = ArmStage::Down;
        }

        metrics.feedback = if angle < calibration.safe_angle_min {
            history.record_feedback(arm);
            Some(Feedback::OverCurling)
        } else if angle > calibration.safe_angle_max {
            history.record_feedback(arm);
            Some(Feedback::OverExtending)
        } else if calibration.contracted_threshold < angle && angle < calibration.extended_threshold
        {
            match metrics.stage {
                ArmStage::Down => Some(Feedback::StraightenArm),
                ArmStage::Up => Some(Feedback::CurlDeeper),
                ArmStage::Lost => None,
            }
        } else {
            None
        };
    }

    /// `arm` had no usable angle this frame. Its stage and rep clock are kept
    /// so a brief dropout cannot cost the rep in progress.
    pub(crate) fn mark_lost(&self, arm: Arm, metrics: &mut ArmMetrics) {
        if metrics.visible {
            debug!(message = "arm lost", ?arm, stage = ?metrics.stage);
        }
        metrics.visible = false;
        metrics.feedback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Thresholds 50/160, safe range 30..=175.
    fn calibration() -> CalibrationData {
        CalibrationData::default()
    }

    fn run(counter: &RepCounter, samples: &[(f64, i32)]) -> (ArmMetrics, SessionHistory) {
        let calibration = calibration();
        let mut metrics = ArmMetrics::new(0.0);
        let mut history = SessionHistory::default();
        for &(now, angle) in samples {
            counter.process_rep(Arm::Right, angle, &mut metrics, &calibration, now, &mut history);
        }
        (metrics, history)
    }

    mod counting_tests {
        use super::{run, ArmStage, RepCounter};
        use assert_approx_eq::assert_approx_eq;

        #[test]
        fn one_full_cycle_counts_once() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 170), (1.0, 40), (2.0, 170)]);
            assert_eq!(metrics.rep_count, 1);
            assert_eq!(metrics.stage, ArmStage::Down);
            assert_approx_eq!(metrics.rep_time, 2.0);
            assert_approx_eq!(metrics.min_rep_time, 2.0);
            assert_approx_eq!(metrics.last_down_time, 2.0);
        }

        #[test]
        fn debounce_rejects_fast_cycle() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 170), (0.1, 40), (0.2, 170)]);
            assert_eq!(metrics.rep_count, 0);
            assert_eq!(metrics.stage, ArmStage::Down);
        }

        #[test]
        fn holding_extended_counts_once() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(
                &counter,
                &[(0.0, 170), (1.0, 40), (2.0, 170), (3.0, 170), (4.0, 175)],
            );
            assert_eq!(metrics.rep_count, 1);
        }

        #[test]
        fn mid_range_keeps_stage() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 40), (0.5, 100)]);
            assert_eq!(metrics.stage, ArmStage::Up);
        }

        #[test]
        fn fastest_rep_is_kept() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(
                &counter,
                &[
                    (1.0, 40),
                    (3.0, 170),
                    (4.0, 40),
                    (4.5, 170),
                    (6.0, 40),
                    (8.0, 170),
                ],
            );
            assert_eq!(metrics.rep_count, 3);
            assert_approx_eq!(metrics.min_rep_time, 1.5);
            assert_approx_eq!(metrics.rep_time, 3.5);
        }

        #[test]
        fn dropout_at_top_keeps_rep() {
            let counter = RepCounter::new(0.5);
            let calibration = super::calibration();
            let mut metrics = super::ArmMetrics::new(0.0);
            let mut history = super::SessionHistory::default();
            counter.process_rep(super::Arm::Left, 40, &mut metrics, &calibration, 1.0, &mut history);
            counter.mark_lost(super::Arm::Left, &mut metrics);
            assert_eq!(metrics.stage, ArmStage::Up);
            assert_eq!(metrics.snapshot().stage, ArmStage::Lost);
            assert_eq!(metrics.feedback, None);

            counter.process_rep(super::Arm::Left, 170, &mut metrics, &calibration, 2.0, &mut history);
            assert_eq!(metrics.rep_count, 1);
            assert!(metrics.visible);
            assert_eq!(metrics.snapshot().stage, ArmStage::Down);
        }

        #[test]
        fn curr_rep_time_tracks_clock() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 170), (1.25, 100)]);
            assert_approx_eq!(metrics.curr_rep_time, 1.25);
            assert_eq!(metrics.angle, 100);
        }
    }

    mod feedback_tests {
        use super::{run, ArmStage, Feedback, RepCounter};
        use crate::pose::PerArm;

        #[test]
        fn over_curling_any_stage() {
            let counter = RepCounter::new(0.5);
            let (metrics, history) = run(&counter, &[(0.0, 20)]);
            assert_eq!(metrics.feedback, Some(Feedback::OverCurling));
            assert_eq!(history.feedback_counts, PerArm { right: 1, left: 0 });

            let (metrics, history) = run(&counter, &[(0.0, 170), (1.0, 100), (2.0, 20)]);
            assert_eq!(metrics.feedback, Some(Feedback::OverCurling));
            assert_eq!(history.feedback_counts.right, 1);
        }

        #[test]
        fn over_extending() {
            let counter = RepCounter::new(0.5);
            let (metrics, history) = run(&counter, &[(0.0, 179)]);
            assert_eq!(metrics.feedback, Some(Feedback::OverExtending));
            assert_eq!(metrics.stage, ArmStage::Down);
            assert_eq!(history.feedback_counts.right, 1);
        }

        #[test]
        fn mid_range_guidance() {
            let counter = RepCounter::new(0.5);
            let (metrics, history) = run(&counter, &[(0.0, 170), (0.5, 100)]);
            assert_eq!(metrics.feedback, Some(Feedback::StraightenArm));
            assert_eq!(history.feedback_counts.right, 0);

            let (metrics, _) = run(&counter, &[(0.0, 40), (0.5, 100)]);
            assert_eq!(metrics.feedback, Some(Feedback::CurlDeeper));
        }

        #[test]
        fn complete_zones_are_quiet() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 40)]);
            assert_eq!(metrics.feedback, None);
            let (metrics, _) = run(&counter, &[(0.0, 165)]);
            assert_eq!(metrics.feedback, None);
            let (metrics, _) = run(&counter, &[(0.0, 160)]);
            assert_eq!(metrics.feedback, None);
        }

        #[test]
        fn feedback_is_cleared_each_frame() {
            let counter = RepCounter::new(0.5);
            let (metrics, _) = run(&counter, &[(0.0, 20), (0.5, 40)]);
            assert_eq!(metrics.feedback, None);
        }

        #[test]
        fn degenerate_calibration_does_not_panic() {
            let counter = RepCounter::new(0.5);
            let mut calibration = super::calibration();
            calibration.contracted_threshold = 0;
            calibration.extended_threshold = 0;
            calibration.safe_angle_min = 10;
            calibration.safe_angle_max = 10;
            let mut metrics = super::ArmMetrics::new(0.0);
            let mut history = super::SessionHistory::default();
            for (i, &angle) in [5, 90, 5, 90].iter().enumerate() {
                counter.process_rep(
                    super::Arm::Right,
                    angle,
                    &mut metrics,
                    &calibration,
                    i as f64,
                    &mut history,
                );
            }
            assert_eq!(metrics.rep_count, 0);
            assert_eq!(history.feedback_counts.right, 4);
        }
    }

    mod snapshot_tests {
        use super::{round2, ArmMetrics, Feedback};
        use assert_approx_eq::assert_approx_eq;

        #[test]
        fn rounding() {
            assert_approx_eq!(round2(1.23456), 1.23);
            assert_approx_eq!(round2(0.005_1), 0.01);
        }

        #[test]
        fn serialized_field_names() {
            let mut metrics = ArmMetrics::new(0.0);
            metrics.rep_time = 1.23456;
            metrics.feedback = Some(Feedback::CurlDeeper);
            let json = serde_json::to_value(metrics.snapshot()).unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "rep_count": 0,
                    "stage": "DOWN",
                    "angle": 0,
                    "rep_time": 1.23,
                    "min_rep_time": 0.0,
                    "curr_rep_time": 0.0,
                    "feedback": "CURL DEEPER",
                })
            );
        }

        #[test]
        fn empty_feedback_is_blank() {
            assert_eq!(ArmMetrics::new(0.0).snapshot().feedback, "");
        }
    }
}
