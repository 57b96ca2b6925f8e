use crate::error::Error;
use ordered_float::NotNan;
use std::ops::Sub;

/// A 2D point in the pose estimator's normalized image space.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub(crate) struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub(crate) fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: NotNan::new(x)
                .map_err(|e| Error::ConstructNotNan(e, x))?
                .into_inner(),
            y: NotNan::new(y)
                .map_err(|e| Error::ConstructNotNan(e, y))?
                .into_inner(),
        })
    }

    /// Direction of the vector from the origin to this point, in radians.
    #[inline]
    pub(crate) fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[cfg(test)]
    pub(crate) fn x(self) -> f32 {
        self.x
    }

    #[cfg(test)]
    pub(crate) fn y(self) -> f32 {
        self.y
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
