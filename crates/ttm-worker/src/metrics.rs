//! Worker metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that renders them.

use metrics::{counter, gauge, histogram};
use ttm_models::JobStatus;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_TOTAL: &str = "ttm_jobs_total";
    pub const GENERATION_SECONDS: &str = "ttm_generation_seconds";
    pub const INFERENCE_SECONDS: &str = "ttm_inference_seconds";
    pub const QUEUE_DEPTH: &str = "ttm_queue_depth";
    pub const UPLOAD_FAILURES_TOTAL: &str = "ttm_upload_failures_total";
}

/// Count an accepted job.
pub fn record_job_accepted() {
    counter!(names::JOBS_TOTAL, "status" => "accepted").increment(1);
}

/// Count a request refused after validation (queue full, shutting down).
pub fn record_job_rejected() {
    counter!(names::JOBS_TOTAL, "status" => "rejected").increment(1);
}

/// Count a finished job and record its wall-clock duration.
pub fn record_job_finished(status: JobStatus, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "status" => status.as_str()).increment(1);
    histogram!(names::GENERATION_SECONDS, "status" => status.as_str()).record(duration_secs);
}

pub fn record_inference(duration_secs: f64) {
    histogram!(names::INFERENCE_SECONDS).record(duration_secs);
}

pub fn set_queue_depth(depth: usize) {
    gauge!(names::QUEUE_DEPTH).set(depth as f64);
}

pub fn record_upload_failure() {
    counter!(names::UPLOAD_FAILURES_TOTAL).increment(1);
}
