//! Worker error types.

use thiserror::Error;
use ttm_models::{JobId, JobStatus, ValidationError};

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failures inside a generation run. Their `Display` text becomes the
/// job's error message.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Job cancelled")]
    Cancelled,

    #[error(transparent)]
    Motion(#[from] ttm_motion::MotionError),

    #[error("Media error: {0}")]
    Media(#[from] ttm_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] ttm_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] ttm_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Whether the job record disappeared while the run was in flight.
    pub fn is_job_gone(&self) -> bool {
        matches!(self, WorkerError::Queue(e) if e.is_not_found())
    }
}

impl From<ttm_pipeline::PipelineError> for WorkerError {
    fn from(err: ttm_pipeline::PipelineError) -> Self {
        use ttm_pipeline::PipelineError;

        match err {
            PipelineError::InferenceFailed(msg) => Self::Inference(msg),
            other => Self::Inference(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors reported to callers of [`crate::GenerationService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Job not found")]
    NotFound(JobId),

    #[error("Video not ready")]
    NotReady { job_id: JobId, status: JobStatus },

    #[error("Video file not found")]
    ArtifactMissing(JobId),

    #[error("Job already {status}")]
    AlreadyFinished { job_id: JobId, status: JobStatus },

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<ttm_queue::QueueError> for ServiceError {
    fn from(err: ttm_queue::QueueError) -> Self {
        use ttm_queue::QueueError;

        match err {
            QueueError::NotFound(job_id) => Self::NotFound(job_id),
            QueueError::Terminal { job_id, status } => Self::AlreadyFinished { job_id, status },
            QueueError::QueueFull(_) => Self::Unavailable(
                "Too many jobs in progress, please retry later".to_string(),
            ),
            QueueError::Closed => Self::Unavailable("Service is shutting down".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_message_preserved() {
        let err: WorkerError =
            ttm_pipeline::PipelineError::inference_failed("CUDA out of memory").into();
        assert_eq!(err.to_string(), "Inference error: CUDA out of memory");
    }

    #[test]
    fn test_motion_message_passthrough() {
        let err: WorkerError =
            ttm_motion::MotionError::UnsupportedMovement("dolly".to_string()).into();
        assert_eq!(err.to_string(), "Unsupported camera movement: dolly");
    }

    #[test]
    fn test_queue_full_maps_to_unavailable() {
        let err: ServiceError = ttm_queue::QueueError::QueueFull(4).into();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[test]
    fn test_job_gone() {
        let err = WorkerError::Queue(ttm_queue::QueueError::NotFound(JobId::from_string("x")));
        assert!(err.is_job_gone());
        assert!(!WorkerError::Cancelled.is_job_gone());
    }
}
