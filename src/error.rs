#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("failed to convert usize value to keypoint kind: {0}")]
    ConvertUSizeToKeypointKind(usize),

    #[error("failed to convert keypoint variant to usize: {0:?}")]
    KeypointVariantToUSize(crate::pose::KeypointKind),

    #[error("expected {0} keypoints per pose, got {1}")]
    KeypointCount(usize, usize),

    #[error("keypoint at index {0} is out of bounds for pose with {1} keypoints")]
    GetKeypoint(usize, usize),

    #[error("failed to parse frame on line {1}")]
    ParseFrame(#[source] serde_json::Error, usize),

    #[error("failed to read frame")]
    ReadFrame(#[source] std::io::Error),

    #[error("failed to serialize snapshot")]
    SerializeSnapshot(#[source] serde_json::Error),

    #[error("failed to write snapshot")]
    WriteSnapshot(#[source] std::io::Error),

    #[error("session already running in phase {0:?}")]
    SessionActive(crate::session::WorkoutPhase),

    #[error("failed to parse setting value {0:?}")]
    ParseSetting(String),

    #[error("setting value {0} must be {1}")]
    InvalidSetting(String, &'static str),
}
