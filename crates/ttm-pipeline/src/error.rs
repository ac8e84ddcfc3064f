//! Pipeline client error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors returned by the generation pipeline or its transport.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid pipeline response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 | 502 | 503 | 504 => Self::ServiceUnavailable(format!("HTTP {}: {}", status, message)),
            _ => Self::InferenceFailed(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Check if the request may succeed when sent again.
    ///
    /// Only failures that happen before the pipeline starts working are
    /// retried; a read timeout mid-inference is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::ServiceUnavailable(_) => true,
            PipelineError::Network(e) => e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        let err = PipelineError::from_http_status(503, "warming up");
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
        assert!(err.is_retryable());

        let err = PipelineError::from_http_status(500, "CUDA out of memory");
        assert!(matches!(err, PipelineError::InferenceFailed(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("CUDA out of memory"));

        let err = PipelineError::from_http_status(422, "bad params");
        assert!(!err.is_retryable());
    }
}
