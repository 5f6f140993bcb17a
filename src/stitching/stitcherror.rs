use thiserror::Error;

use crate::segment::segmentstore::SegmentId;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("segment has {x_len} x samples but {y_len} y samples")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("x samples are not ascending at index {index} ({previous} followed by {current})")]
    NonMonotonic { index: usize, previous: f64, current: f64 },

    #[error("sample {index} is not finite")]
    NonFinite { index: usize },

    #[error("measurement error {value} at index {index} must be positive and finite")]
    InvalidError { index: usize, value: f64 },

    #[error("an empty segment cannot be used as a reference")]
    EmptySegment,

    #[error("lagrange interpolation requires distinct x samples, {value} appears twice")]
    DuplicateAbscissa { value: f64 },

    #[error("lockstep evaluation needs equal lengths, got {queries} queries, {x_offsets} x offsets and {y_offsets} y offsets")]
    LockstepLengthMismatch {
        queries: usize,
        x_offsets: usize,
        y_offsets: usize,
    },

    #[error("no pending segment with id {0}")]
    SegmentNotFound(SegmentId),

    #[error("invalid configuration value for '{name}': {value}")]
    InvalidConfiguration { name: &'static str, value: f64 },

    #[error("optimizer failed: {0}")]
    Optimizer(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    JsonParseError(#[from] serde_json::Error),
}

impl StitchError {
    pub fn invalid_configuration(name: &'static str, value: f64) -> StitchError {
        StitchError::InvalidConfiguration { name, value }
    }
}
