use crate::pose::{Arm, PerArm};

/// Per-session angle time series and out-of-range feedback tallies.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub(crate) struct SessionHistory {
    /// Seconds since the session started.
    pub(crate) time: Vec<f64>,
    pub(crate) angles: PerArm<Vec<Option<i32>>>,
    pub(crate) feedback_counts: PerArm<u32>,
}

impl SessionHistory {
    pub(crate) fn record(&mut self, time: f64, angles: &PerArm<Option<i32>>) {
        self.time.push(time);
        for &arm in Arm::ALL.iter() {
            self.angles[arm].push(angles[arm]);
        }
    }

    pub(crate) fn record_feedback(&mut self, arm: Arm) {
        self.feedback_counts[arm] += 1;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.time.len()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::SessionHistory;
    use crate::pose::{Arm, PerArm};

    #[test]
    fn record_keeps_series_aligned() {
        let mut history = SessionHistory::default();
        history.record(
            0.0,
            &PerArm {
                right: Some(170),
                left: None,
            },
        );
        history.record(
            0.5,
            &PerArm {
                right: Some(90),
                left: Some(88),
            },
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history.angles.right, vec![Some(170), Some(90)]);
        assert_eq!(history.angles.left, vec![None, Some(88)]);
    }

    #[test]
    fn feedback_counts_per_arm() {
        let mut history = SessionHistory::default();
        history.record_feedback(Arm::Left);
        history.record_feedback(Arm::Left);
        assert_eq!(history.feedback_counts, PerArm { right: 0, left: 2 });
    }

    #[test]
    fn reset_clears_everything() {
        let mut history = SessionHistory::default();
        history.record(1.0, &PerArm::default());
        history.record_feedback(Arm::Right);
        history.reset();
        assert_eq!(history, SessionHistory::default());
    }
}
