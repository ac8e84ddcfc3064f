//! Job service: the operations behind the HTTP routes.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use tracing::{info, warn};
use ttm_models::defaults::MAX_IMAGE_BYTES;
use ttm_models::{
    is_remote_locator, GenerationPayload, GenerationRequest, GenerationResult, Job, JobId,
    JobStatus,
};
use ttm_pipeline::InferencePipeline;
use ttm_queue::{JobCounts, JobQueue, JobStore};

use crate::cancel::CancelRegistry;
use crate::config::WorkerConfig;
use crate::error::{ServiceError, ServiceResult, WorkerError};
use crate::executor::JobExecutor;
use crate::metrics;
use crate::orchestrator::{GenerationDeps, GenerationOrchestrator};
use crate::task::GenerationTask;
use crate::workspace::{remove_workspace, ArtifactPaths};

/// Where a finished clip can be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// File on this host
    Local(PathBuf),
    /// Uploaded object URL
    Remote(String),
}

/// Snapshot for readiness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub pipeline_ready: bool,
    pub jobs: JobCounts,
    pub queue_depth: usize,
    pub queue_capacity: usize,
}

/// Accepts generation requests and answers job queries.
///
/// Cheap to clone. Built together with the [`JobExecutor`] that consumes
/// its queue.
#[derive(Clone)]
pub struct GenerationService {
    config: WorkerConfig,
    store: JobStore,
    queue: JobQueue<GenerationTask>,
    cancels: CancelRegistry,
    pipeline: Arc<dyn InferencePipeline>,
}

impl GenerationService {
    pub fn new(config: WorkerConfig, deps: GenerationDeps) -> (Self, JobExecutor) {
        let store = JobStore::new();
        let cancels = CancelRegistry::new();
        let (queue, receiver) = JobQueue::new(&config.queue);
        let pipeline = Arc::clone(&deps.pipeline);

        let orchestrator = Arc::new(GenerationOrchestrator::new(
            config.clone(),
            store.clone(),
            deps,
        ));
        let executor = JobExecutor::new(config.clone(), orchestrator, cancels.clone(), receiver);

        let service = Self {
            config,
            store,
            queue,
            cancels,
            pipeline,
        };
        (service, executor)
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Accept a request in its wire form.
    pub async fn accept(
        &self,
        image_bytes: Vec<u8>,
        payload: GenerationPayload,
    ) -> ServiceResult<Job> {
        let request = payload.into_request()?;
        self.accept_request(image_bytes, request).await
    }

    /// Validate, create a pending job and queue it. Never waits for
    /// inference.
    pub async fn accept_request(
        &self,
        image_bytes: Vec<u8>,
        request: GenerationRequest,
    ) -> ServiceResult<Job> {
        let request = request.validated()?;

        if !self.pipeline.is_ready().await {
            return Err(ServiceError::unavailable("Model not loaded"));
        }

        let image = decode_image(image_bytes).await?;

        let job_id = self.store.create().await;
        self.cancels.register(&job_id);

        let motion_type = request.motion_type();
        if let Err(e) = self
            .queue
            .enqueue(GenerationTask::new(job_id.clone(), request, image))
        {
            self.cancels.remove(&job_id);
            if let Err(e) = self.store.delete(&job_id).await {
                warn!(job_id = %job_id, "Failed to drop rejected job: {}", e);
            }
            metrics::record_job_rejected();
            return Err(e.into());
        }

        metrics::record_job_accepted();
        metrics::set_queue_depth(self.queue.depth());
        info!(
            job_id = %job_id,
            motion_type = motion_type.as_str(),
            "Accepted generation job"
        );

        Ok(self.store.get(&job_id).await?)
    }

    /// Current state of a job.
    pub async fn poll(&self, job_id: &JobId) -> ServiceResult<Job> {
        Ok(self.store.get(job_id).await?)
    }

    /// Locate the finished video of a completed job.
    pub async fn fetch_artifact(&self, job_id: &JobId) -> ServiceResult<Artifact> {
        let job = self.poll(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(ServiceError::NotReady {
                job_id: job_id.clone(),
                status: job.status,
            });
        }

        let locator = job
            .result
            .and_then(|r| r.video_url)
            .ok_or_else(|| ServiceError::ArtifactMissing(job_id.clone()))?;
        if is_remote_locator(&locator) {
            return Ok(Artifact::Remote(locator));
        }

        let path = PathBuf::from(locator);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ServiceError::ArtifactMissing(job_id.clone()));
        }
        Ok(Artifact::Local(path))
    }

    /// Remove a job, stop its run and release its files.
    pub async fn delete(&self, job_id: &JobId) -> ServiceResult<()> {
        let job = self.store.delete(job_id).await?;

        self.cancels.cancel(job_id);
        self.cancels.remove(job_id);
        ArtifactPaths::new(&self.config.output_dir, job_id)
            .remove()
            .await;
        remove_workspace(&self.config.work_dir, job_id).await;

        info!(job_id = %job_id, status = %job.status, "Deleted job");
        Ok(())
    }

    /// Stop a job without deleting it.
    ///
    /// A pending job fails immediately. A processing job is signalled and
    /// fails once its run unwinds; the returned snapshot may still read
    /// `processing`.
    pub async fn cancel(&self, job_id: &JobId) -> ServiceResult<Job> {
        let job = self.store.get(job_id).await?;
        if job.is_terminal() {
            return Err(ServiceError::AlreadyFinished {
                job_id: job_id.clone(),
                status: job.status,
            });
        }

        self.cancels.cancel(job_id);
        if job.status == JobStatus::Pending {
            let message = WorkerError::Cancelled.to_string();
            let job = self
                .store
                .finish(job_id, GenerationResult::failed(message))
                .await?;
            metrics::record_job_finished(JobStatus::Failed, 0.0);
            info!(job_id = %job_id, "Cancelled queued job");
            return Ok(job);
        }

        info!(job_id = %job_id, "Cancellation requested");
        Ok(self.store.get(job_id).await?)
    }

    pub async fn readiness(&self) -> Readiness {
        Readiness {
            pipeline_ready: self.pipeline.is_ready().await,
            jobs: self.store.counts().await,
            queue_depth: self.queue.depth(),
            queue_capacity: self.queue.capacity(),
        }
    }
}

async fn decode_image(bytes: Vec<u8>) -> ServiceResult<RgbImage> {
    if bytes.is_empty() {
        return Err(ServiceError::InvalidImage("image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ServiceError::InvalidImage(format!(
            "image exceeds {} MB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|img| img.to_rgb8()))
        .await
        .map_err(|e| ServiceError::internal(format!("image decoder panicked: {}", e)))?
        .map_err(|e| ServiceError::InvalidImage(e.to_string()))
}
