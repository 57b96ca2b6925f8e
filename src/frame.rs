use crate::{
    error::Error,
    pose::{Pose, PoseResult},
};

/// One line of the pose stream: a timestamp and either 17 `[x, y, score]`
/// keypoints or `null` when no body was detected.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct Frame {
    pub(crate) t: f64,
    #[serde(default)]
    keypoints: Option<Vec<[f32; 3]>>,
}

impl Frame {
    pub(crate) fn parse(line: &str, line_number: usize) -> Result<Self, Error> {
        serde_json::from_str(line).map_err(|e| Error::ParseFrame(e, line_number))
    }

    pub(crate) fn pose(&self) -> Result<PoseResult, Error> {
        self.keypoints
            .as_deref()
            .map(Pose::from_triples)
            .transpose()
    }
}
