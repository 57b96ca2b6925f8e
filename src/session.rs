use crate::{
    angle::AngleCalculator,
    calibration::{CalibrationData, CalibrationManager, CalibrationSnapshot},
    error::Error,
    history::SessionHistory,
    pose::{Arm, PerArm, Pose},
    rep_counter::{round2, ArmMetrics, ArmSnapshot, RepCounter},
    settings::Settings,
};
use tracing::{info, trace};

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum WorkoutPhase {
    Inactive,
    Calibration,
    Countdown,
    Active,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct StateSnapshot {
    pub(crate) phase: WorkoutPhase,
    pub(crate) countdown_remaining: Option<f64>,
    pub(crate) calibration: CalibrationSnapshot,
    pub(crate) arms: PerArm<ArmSnapshot>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct ArmReport {
    pub(crate) rep_count: u32,
    pub(crate) min_rep_time: f64,
    pub(crate) feedback_count: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct SessionReport {
    pub(crate) duration: f64,
    pub(crate) total_reps: u32,
    pub(crate) calibration: CalibrationSnapshot,
    pub(crate) arms: PerArm<ArmReport>,
    pub(crate) history: SessionHistory,
}

/// Owns every piece of per-session state and drives it one frame at a time.
pub(crate) struct Session {
    settings: Settings,
    phase: WorkoutPhase,
    angles: AngleCalculator,
    calibrator: CalibrationManager,
    counter: RepCounter,
    calibration: CalibrationData,
    arms: PerArm<ArmMetrics>,
    history: SessionHistory,
    session_start: f64,
    countdown_start: f64,
    last_frame_time: f64,
}

impl Session {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            settings,
            phase: WorkoutPhase::Inactive,
            angles: AngleCalculator::new(settings.smoothing_window),
            calibrator: CalibrationManager::new(settings.hold_time, settings.safety_margin),
            counter: RepCounter::new(settings.min_rep_duration),
            calibration: CalibrationData::default(),
            arms: PerArm::from_fn(|_| ArmMetrics::new(0.0)),
            history: SessionHistory::default(),
            session_start: 0.0,
            countdown_start: 0.0,
            last_frame_time: 0.0,
        }
    }

    pub(crate) fn phase(&self) -> WorkoutPhase {
        self.phase
    }

    pub(crate) fn arms(&self) -> &PerArm<ArmMetrics> {
        &self.arms
    }

    /// Begin a fresh session at `now`, discarding any stopped one. A running
    /// session must be stopped first.
    pub(crate) fn start(&mut self, now: f64) -> Result<(), Error> {
        if self.phase != WorkoutPhase::Inactive {
            return Err(Error::SessionActive(self.phase));
        }

        self.history.reset();
        self.angles.reset_buffers();
        self.arms = PerArm::from_fn(|_| ArmMetrics::new(now));
        self.session_start = now;
        self.last_frame_time = now;
        self.calibrator.start(&mut self.calibration, now);
        self.phase = WorkoutPhase::Calibration;
        info!(message = "session started", start = now);
        Ok(())
    }

    /// Stop processing frames. Collected state stays available for reporting.
    pub(crate) fn stop(&mut self) {
        info!(
            message = "session stopped",
            phase = ?self.phase,
            right_reps = self.arms.right.rep_count,
            left_reps = self.arms.left.rep_count,
        );
        self.phase = WorkoutPhase::Inactive;
    }

    pub(crate) fn process_frame(&mut self, pose: Option<&Pose>, now: f64) -> Result<(), Error> {
        if self.phase == WorkoutPhase::Inactive {
            return Ok(());
        }
        self.last_frame_time = now;

        let min_visibility = self.settings.min_visibility;
        let angles = match pose {
            Some(pose) => Some(self.angles.arm_angles(pose, min_visibility)?),
            None => {
                trace!(message = "no body detected", now);
                None
            }
        };

        match self.phase {
            WorkoutPhase::Inactive => {}
            WorkoutPhase::Calibration => {
                if self
                    .calibrator
                    .process_frame(&mut self.calibration, angles.as_ref(), now)
                {
                    self.countdown_start = now;
                    self.phase = WorkoutPhase::Countdown;
                    info!(message = "countdown started", seconds = self.settings.countdown);
                }
            }
            WorkoutPhase::Countdown => {
                if now - self.countdown_start >= self.settings.countdown {
                    self.arms = PerArm::from_fn(|_| ArmMetrics::new(now));
                    self.phase = WorkoutPhase::Active;
                    info!(message = "workout started", now);
                }
            }
            WorkoutPhase::Active => {
                let angles = angles.unwrap_or_default();
                self.history.record(now - self.session_start, &angles);

                for &arm in Arm::ALL.iter() {
                    let metrics = &mut self.arms[arm];
                    match angles[arm] {
                        Some(angle) => self.counter.process_rep(
                            arm,
                            angle,
                            metrics,
                            &self.calibration,
                            now,
                            &mut self.history,
                        ),
                        None => self.counter.mark_lost(arm, metrics),
                    }
                }
            }
        }

        Ok(())
    }

    fn countdown_remaining(&self) -> Option<f64> {
        match self.phase {
            WorkoutPhase::Countdown => {
                let elapsed = self.last_frame_time - self.countdown_start;
                Some(round2((self.settings.countdown - elapsed).max(0.0)))
            }
            WorkoutPhase::Inactive | WorkoutPhase::Calibration | WorkoutPhase::Active => None,
        }
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            countdown_remaining: self.countdown_remaining(),
            calibration: self.calibration.snapshot(),
            arms: self.arms.map(|_, metrics| metrics.snapshot()),
        }
    }

    pub(crate) fn final_report(&self) -> SessionReport {
        let arms = self.arms.map(|arm, metrics| ArmReport {
            rep_count: metrics.rep_count,
            min_rep_time: round2(metrics.min_rep_time),
            feedback_count: self.history.feedback_counts[arm],
        });

        SessionReport {
            duration: round2(self.last_frame_time - self.session_start),
            total_reps: arms.right.rep_count + arms.left.rep_count,
            calibration: self.calibration.snapshot(),
            arms,
            history: self.history.clone(),
        }
    }
}
