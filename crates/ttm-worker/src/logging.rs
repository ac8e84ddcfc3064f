//! Structured job logging.

use std::time::{Duration, Instant};

use tracing::{error, info, warn, Span};
use ttm_models::{JobId, JobStatus, MotionType};

/// Logs a generation job's lifecycle with consistent fields.
///
/// The logger starts its clock on creation, so every terminal event carries
/// the time spent since the job was picked up.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    operation: &'static str,
    started: Instant,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.clone(),
            operation,
            started: Instant::now(),
        }
    }

    pub fn log_start(&self, motion_type: MotionType, num_frames: u32) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            motion_type = motion_type.as_str(),
            num_frames,
            "Generation started"
        );
    }

    /// A checkpoint was reached and recorded in the store.
    pub fn log_progress(&self, progress: f64, stage: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            progress,
            stage,
            "Generation progress"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            "{}", message
        );
    }

    pub fn log_failure(&self, reason: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            elapsed_secs = self.elapsed().as_secs_f64(),
            "Generation failed: {}", reason
        );
    }

    /// Terminal state was recorded.
    pub fn log_finished(&self, status: JobStatus, video: Option<&str>) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            status = %status,
            video = video.unwrap_or_default(),
            elapsed_secs = self.elapsed().as_secs_f64(),
            "Generation finished"
        );
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span wrapping everything a worker does for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "ttm_job",
            job_id = %self.job_id,
            operation = self.operation
        )
    }
}
