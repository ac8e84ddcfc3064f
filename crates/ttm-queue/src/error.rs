//! Queue and job store error types.

use thiserror::Error;
use ttm_models::{JobId, JobStatus};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job {job_id} is already {status}")]
    Terminal { job_id: JobId, status: JobStatus },

    #[error("Invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Invalid progress value: {0}")]
    InvalidProgress(f64),

    #[error("Progress cannot go backwards: {current} -> {requested}")]
    ProgressRegression { current: f64, requested: f64 },

    #[error("Job queue is full (capacity {0})")]
    QueueFull(usize),

    #[error("Job queue is closed")]
    Closed,
}

impl QueueError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::NotFound(_))
    }

    /// The job already reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueError::Terminal { .. })
    }
}
