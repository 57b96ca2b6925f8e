use crate::pose::{Arm, PerArm};
use tracing::{info, warn};

pub(crate) const DEFAULT_CONTRACTED_THRESHOLD: i32 = 50;
pub(crate) const DEFAULT_EXTENDED_THRESHOLD: i32 = 160;
pub(crate) const DEFAULT_SAFE_ANGLE_MIN: i32 = 30;
pub(crate) const DEFAULT_SAFE_ANGLE_MAX: i32 = 175;

const SAFE_ANGLE_FLOOR: i32 = 10;
const SAFE_ANGLE_CEILING: i32 = 180;

const EXTEND_MESSAGE: &str = "EXTEND BOTH ARMS FULLY - HOLD POSITION";
const CONTRACT_MESSAGE: &str = "CURL YOUR ARMS COMPLETELY - HOLD POSITION";
const NO_BODY_MESSAGE: &str = "STAND IN FRAME - BODY NOT DETECTED";

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum CalibrationPhase {
    Extend,
    Contract,
    Complete,
}

#[derive(Debug, Clone)]
pub(crate) struct CalibrationData {
    pub(crate) active: bool,
    /// `None` until calibration is first started.
    pub(crate) phase: Option<CalibrationPhase>,
    pub(crate) phase_start_time: f64,
    pub(crate) extended_angles: PerArm<Vec<i32>>,
    pub(crate) contracted_angles: PerArm<Vec<i32>>,
    pub(crate) message: String,
    pub(crate) progress: u8,
    pub(crate) contracted_threshold: i32,
    pub(crate) extended_threshold: i32,
    pub(crate) safe_angle_min: i32,
    pub(crate) safe_angle_max: i32,
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self {
            active: false,
            phase: None,
            phase_start_time: 0.0,
            extended_angles: PerArm::default(),
            contracted_angles: PerArm::default(),
            message: String::new(),
            progress: 0,
            contracted_threshold: DEFAULT_CONTRACTED_THRESHOLD,
            extended_threshold: DEFAULT_EXTENDED_THRESHOLD,
            safe_angle_min: DEFAULT_SAFE_ANGLE_MIN,
            safe_angle_max: DEFAULT_SAFE_ANGLE_MAX,
        }
    }
}

/// Serialized view of [`CalibrationData`] without the raw samples.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub(crate) struct CalibrationSnapshot {
    pub(crate) active: bool,
    pub(crate) phase: Option<CalibrationPhase>,
    pub(crate) message: String,
    pub(crate) progress: u8,
    pub(crate) contracted_threshold: i32,
    pub(crate) extended_threshold: i32,
    pub(crate) safe_angle_min: i32,
    pub(crate) safe_angle_max: i32,
}

impl CalibrationData {
    /// Drop collected samples and progress. Thresholds from an earlier
    /// calibration stay until the next one overwrites them.
    pub(crate) fn reset(&mut self) {
        self.extended_angles = PerArm::default();
        self.contracted_angles = PerArm::default();
        self.progress = 0;
    }

    pub(crate) fn snapshot(&self) -> CalibrationSnapshot {
        CalibrationSnapshot {
            active: self.active,
            phase: self.phase,
            message: self.message.clone(),
            progress: self.progress,
            contracted_threshold: self.contracted_threshold,
            extended_threshold: self.extended_threshold,
            safe_angle_min: self.safe_angle_min,
            safe_angle_max: self.safe_angle_max,
        }
    }
}

/// Linearly interpolated percentile of already sorted `sorted`, `q` in [0, 100].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of `values` after discarding points outside the 1.5 IQR fences.
///
/// Empty input averages to 0 and fewer than three samples fall back to the
/// plain mean, as does a filter that would discard everything.
pub(crate) fn robust_average(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
    if sorted.len() < 3 {
        return mean(&sorted);
    }
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    let filtered: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| (lower_bound..=upper_bound).contains(v))
        .collect();

    if filtered.is_empty() {
        mean(&sorted)
    } else {
        mean(&filtered)
    }
}

/// Two timed holds, arms extended then curled. The robust average of each hold
/// becomes a threshold, padded by `safety_margin` to form the acceptable range.
pub(crate) struct CalibrationManager {
    hold_time: f64,
    safety_margin: i32,
}

impl CalibrationManager {
    pub(crate) fn new(hold_time: f64, safety_margin: i32) -> Self {
        Self {
            hold_time,
            safety_margin,
        }
    }

    pub(crate) fn start(&self, data: &mut CalibrationData, now: f64) {
        data.reset();
        data.active = true;
        data.phase = Some(CalibrationPhase::Extend);
        data.phase_start_time = now;
        data.message = EXTEND_MESSAGE.to_string();
        info!(message = "calibration started", hold_time = self.hold_time);
    }

    /// Feed one frame of smoothed arm angles, `None` when no body was
    /// detected. Returns `true` once calibration has finished.
    ///
    /// A dropout does not pause the phase clock.
    pub(crate) fn process_frame(
        &self,
        data: &mut CalibrationData,
        angles: Option<&PerArm<Option<i32>>>,
        now: f64,
    ) -> bool {
        if !data.active {
            return true;
        }

        let angles = match angles {
            Some(angles) => angles,
            None => {
                data.message = NO_BODY_MESSAGE.to_string();
                return false;
            }
        };

        let elapsed = now - data.phase_start_time;
        data.progress = (elapsed / self.hold_time * 100.0).floor().clamp(0.0, 100.0) as u8;

        let samples = match data.phase {
            Some(CalibrationPhase::Extend) => Some(&mut data.extended_angles),
            Some(CalibrationPhase::Contract) => Some(&mut data.contracted_angles),
            Some(CalibrationPhase::Complete) | None => None,
        };
        if let Some(samples) = samples {
            for &arm in Arm::ALL.iter() {
                if let Some(angle) = angles[arm] {
                    samples[arm].push(angle);
                }
            }
        }

        if elapsed < self.hold_time {
            return false;
        }

        match data.phase {
            Some(CalibrationPhase::Extend) => {
                self.transition_to_contract(data, now);
                false
            }
            Some(CalibrationPhase::Contract) => {
                self.finalize(data);
                true
            }
            Some(CalibrationPhase::Complete) | None => false,
        }
    }

    fn transition_to_contract(&self, data: &mut CalibrationData, now: f64) {
        warn_if_empty(CalibrationPhase::Extend, &data.extended_angles);
        data.phase = Some(CalibrationPhase::Contract);
        data.phase_start_time = now;
        data.message = CONTRACT_MESSAGE.to_string();
        data.progress = 0;
        info!(
            message = "calibration phase complete",
            phase = ?CalibrationPhase::Extend,
            right_samples = data.extended_angles.right.len(),
            left_samples = data.extended_angles.left.len(),
        );
    }

    fn finalize(&self, data: &mut CalibrationData) {
        warn_if_empty(CalibrationPhase::Contract, &data.contracted_angles);

        let extended = data.extended_angles.map(|_, samples| robust_average(samples));
        let contracted = data
            .contracted_angles
            .map(|_, samples| robust_average(samples));

        data.extended_threshold = ((extended.right + extended.left) / 2.0).round() as i32;
        data.contracted_threshold = ((contracted.right + contracted.left) / 2.0).round() as i32;
        data.safe_angle_min = SAFE_ANGLE_FLOOR.max(data.contracted_threshold - self.safety_margin);
        data.safe_angle_max = SAFE_ANGLE_CEILING.min(data.extended_threshold + self.safety_margin);

        data.phase = Some(CalibrationPhase::Complete);
        data.message = format!(
            "CALIBRATION COMPLETE! Extended: {}° | Contracted: {}°",
            data.extended_threshold, data.contracted_threshold
        );
        data.active = false;

        info!(
            message = "calibration complete",
            extended_threshold = data.extended_threshold,
            contracted_threshold = data.contracted_threshold,
            safe_angle_min = data.safe_angle_min,
            safe_angle_max = data.safe_angle_max,
        );
    }
}

fn warn_if_empty(phase: CalibrationPhase, samples: &PerArm<Vec<i32>>) {
    for &arm in Arm::ALL.iter() {
        if samples[arm].is_empty() {
            warn!(message = "no calibration samples collected", ?phase, ?arm);
        }
    }
}
