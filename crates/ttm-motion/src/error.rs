//! Error types for motion synthesis.

use thiserror::Error;
use ttm_models::CameraKindParseError;

/// Result type for motion synthesis.
pub type MotionResult<T> = Result<T, MotionError>;

/// Errors that can occur while building a motion signal.
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Invalid motion spec: {0}")]
    InvalidSpec(String),

    #[error("Unsupported camera movement: {0}")]
    UnsupportedMovement(String),
}

impl MotionError {
    /// Create an invalid spec error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec(message.into())
    }
}

impl From<CameraKindParseError> for MotionError {
    fn from(err: CameraKindParseError) -> Self {
        Self::UnsupportedMovement(err.0)
    }
}
