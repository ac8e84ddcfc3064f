//! Queued generation work.

use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use ttm_models::{GenerationRequest, JobId};

/// A validated request waiting for a worker.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub job_id: JobId,
    pub request: GenerationRequest,
    /// Decoded source image
    pub image: Arc<RgbImage>,
    /// When the job was accepted; queue wait counts against the job timeout
    pub accepted_at: Instant,
}

impl GenerationTask {
    pub fn new(job_id: JobId, request: GenerationRequest, image: RgbImage) -> Self {
        Self {
            job_id,
            request,
            image: Arc::new(image),
            accepted_at: Instant::now(),
        }
    }
}
