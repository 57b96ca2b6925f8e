use crate::{error::Error, point::Point};
use num_traits::{FromPrimitive, ToPrimitive};
use ordered_float::NotNan;
use std::ops::{Index, IndexMut};

#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub(crate) enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::KeypointVariantToUSize(self))
    }
}

pub(crate) const NUM_KEYPOINTS: usize = 17;

#[derive(Debug, Copy, Clone)]
pub(crate) struct Keypoint {
    pub(crate) kind: KeypointKind,
    pub(crate) point: Point,
    /// Visibility/confidence reported by the estimator.
    pub(crate) score: f32,
}

/// A single detected body. A frame with no body detected is `None`.
#[derive(Debug, Clone)]
pub(crate) struct Pose {
    keypoints: Vec<Keypoint>,
}

pub(crate) type PoseResult = Option<Pose>;

impl Pose {
    /// Build a pose from `[x, y, score]` triples in `KeypointKind` order.
    pub(crate) fn from_triples(triples: &[[f32; 3]]) -> Result<Self, Error> {
        if triples.len() != NUM_KEYPOINTS {
            return Err(Error::KeypointCount(NUM_KEYPOINTS, triples.len()));
        }

        let keypoints = triples
            .iter()
            .enumerate()
            .map(|(i, &[x, y, score])| {
                Ok::<_, Error>(Keypoint {
                    kind: KeypointKind::from_usize(i)
                        .ok_or(Error::ConvertUSizeToKeypointKind(i))?,
                    point: Point::new(x, y)?,
                    score: NotNan::new(score)
                        .map_err(|e| Error::ConstructNotNan(e, score))?
                        .into_inner(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { keypoints })
    }

    pub(crate) fn keypoint(&self, kind: KeypointKind) -> Result<&Keypoint, Error> {
        let index = kind.idx()?;
        let keypoint = self
            .keypoints
            .get(index)
            .ok_or(Error::GetKeypoint(index, self.keypoints.len()))?;
        debug_assert_eq!(keypoint.kind, kind);
        Ok(keypoint)
    }

    /// Shoulder, elbow and wrist of `arm`, or `None` if any of them is below
    /// `min_visibility`.
    pub(crate) fn arm_joints(
        &self,
        arm: Arm,
        min_visibility: f32,
    ) -> Result<Option<[Point; 3]>, Error> {
        let [shoulder, elbow, wrist] = arm.joints();
        let shoulder = self.keypoint(shoulder)?;
        let elbow = self.keypoint(elbow)?;
        let wrist = self.keypoint(wrist)?;

        if [shoulder, elbow, wrist]
            .iter()
            .any(|keypoint| keypoint.score < min_visibility)
        {
            return Ok(None);
        }

        Ok(Some([shoulder.point, elbow.point, wrist.point]))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum Arm {
    Right,
    Left,
}

impl Arm {
    pub(crate) const ALL: [Arm; 2] = [Arm::Right, Arm::Left];

    /// Shoulder, elbow and wrist keypoints, elbow being the vertex.
    pub(crate) fn joints(self) -> [KeypointKind; 3] {
        match self {
            Arm::Right => [
                KeypointKind::RightShoulder,
                KeypointKind::RightElbow,
                KeypointKind::RightWrist,
            ],
            Arm::Left => [
                KeypointKind::LeftShoulder,
                KeypointKind::LeftElbow,
                KeypointKind::LeftWrist,
            ],
        }
    }
}

/// One value per arm.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub(crate) struct PerArm<T> {
    pub(crate) right: T,
    pub(crate) left: T,
}

impl<T> PerArm<T> {
    pub(crate) fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Arm) -> T,
    {
        Self {
            right: f(Arm::Right),
            left: f(Arm::Left),
        }
    }

    pub(crate) fn map<U, F>(&self, mut f: F) -> PerArm<U>
    where
        F: FnMut(Arm, &T) -> U,
    {
        PerArm {
            right: f(Arm::Right, &self.right),
            left: f(Arm::Left, &self.left),
        }
    }
}

impl<T> Index<Arm> for PerArm<T> {
    type Output = T;

    fn index(&self, arm: Arm) -> &Self::Output {
        match arm {
            Arm::Right => &self.right,
            Arm::Left => &self.left,
        }
    }
}

impl<T> IndexMut<Arm> for PerArm<T> {
    fn index_mut(&mut self, arm: Arm) -> &mut Self::Output {
        match arm {
            Arm::Right => &mut self.right,
            Arm::Left => &mut self.left,
        }
    }
}
