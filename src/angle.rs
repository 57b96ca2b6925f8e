use crate::{
    error::Error,
    point::Point,
    pose::{Arm, PerArm, Pose},
};
use std::collections::VecDeque;

/// Interior angle at vertex `b` between `b→a` and `b→c`, in degrees.
///
/// Always lands in `[0, 180]` regardless of winding order. Coincident points
/// yield a direction of zero rather than an error.
pub(crate) fn calculate_angle(a: Point, b: Point, c: Point) -> f32 {
    let radians = (c - b).heading() - (a - b).heading();
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

/// Median of `values`, averaging the two middle samples for even lengths.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub(crate) struct AngleCalculator {
    capacity: usize,
    buffers: PerArm<VecDeque<f32>>,
    scratch: Vec<f32>,
}

impl AngleCalculator {
    pub(crate) fn new(smoothing_window: usize) -> Self {
        let capacity = smoothing_window.max(1);
        Self {
            capacity,
            buffers: PerArm::from_fn(|_| VecDeque::with_capacity(capacity)),
            scratch: Vec::with_capacity(capacity),
        }
    }

    /// Push `new_angle` into `arm`'s window and return the truncated median.
    ///
    /// An empty window is first filled with copies of `new_angle` so the
    /// median does not lag behind a half-empty buffer.
    pub(crate) fn get_smoothed_angle(&mut self, arm: Arm, new_angle: f32) -> i32 {
        let buffer = &mut self.buffers[arm];

        if buffer.is_empty() {
            buffer.extend(std::iter::repeat(new_angle).take(self.capacity));
        }

        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(new_angle);

        self.scratch.clear();
        self.scratch.extend(buffer.iter().copied());
        median(&mut self.scratch) as i32
    }

    pub(crate) fn reset_buffers(&mut self) {
        self.buffers.right.clear();
        self.buffers.left.clear();
    }

    /// Smoothed elbow angle of each arm whose joints pass the visibility gate.
    ///
    /// Lost arms leave their window untouched.
    pub(crate) fn arm_angles(
        &mut self,
        pose: &Pose,
        min_visibility: f32,
    ) -> Result<PerArm<Option<i32>>, Error> {
        let mut angles = PerArm::default();
        for &arm in Arm::ALL.iter() {
            if let Some([shoulder, elbow, wrist]) = pose.arm_joints(arm, min_visibility)? {
                let raw = calculate_angle(shoulder, elbow, wrist);
                angles[arm] = Some(self.get_smoothed_angle(arm, raw));
            }
        }
        Ok(angles)
    }
}
