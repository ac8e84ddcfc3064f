//! Generation orchestrator.
//!
//! Runs one accepted job end to end: motion synthesis, signal encoding,
//! pipeline inference, output assembly and optional upload. Progress is
//! reported to the [`JobStore`] at fixed checkpoints and the terminal result
//! is recorded exactly once.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tokio::sync::{watch, Semaphore};
use ttm_media::{write_thumbnail, FrameEncoder};
use ttm_models::{is_remote_locator, GenerationResult, JobId, JobStatus};
use ttm_motion::Synthesizer;
use ttm_pipeline::{compute_hw_from_area, resize_exact, InferencePipeline, InferenceRequest};
use ttm_queue::JobStore;
use ttm_storage::{thumbnail_key, video_key, ArtifactStore};

use crate::cancel::cancelled;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::task::GenerationTask;
use crate::workspace::{ArtifactPaths, JobWorkspace};

/// Operation name attached to job logs and spans.
pub const GENERATION_OPERATION: &str = "ttm_generation";

/// External collaborators of a generation run.
#[derive(Clone)]
pub struct GenerationDeps {
    pub pipeline: Arc<dyn InferencePipeline>,
    pub encoder: Arc<dyn FrameEncoder>,
    /// Remote store for finished clips; local paths are used when absent
    pub artifacts: Option<Arc<dyn ArtifactStore>>,
}

pub struct GenerationOrchestrator {
    config: WorkerConfig,
    store: JobStore,
    pipeline: Arc<dyn InferencePipeline>,
    encoder: Arc<dyn FrameEncoder>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    /// One permit per pipeline instance
    inference_permits: Arc<Semaphore>,
}

impl GenerationOrchestrator {
    pub fn new(config: WorkerConfig, store: JobStore, deps: GenerationDeps) -> Self {
        let inference_permits = Arc::new(Semaphore::new(config.pipeline_instances.max(1)));
        Self {
            config,
            store,
            pipeline: deps.pipeline,
            encoder: deps.encoder,
            artifacts: deps.artifacts,
            inference_permits,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Run a job and record its outcome.
    ///
    /// Returns the recorded result. An `Err` means nothing was recorded:
    /// the job was deleted, already finished (cancelled while queued), or
    /// the store rejected the update.
    pub async fn run(
        &self,
        task: GenerationTask,
        mut cancel: watch::Receiver<bool>,
    ) -> WorkerResult<GenerationResult> {
        let job_id = task.job_id.clone();
        let logger = JobLogger::new(&job_id, GENERATION_OPERATION);
        let outputs = ArtifactPaths::new(&self.config.output_dir, &job_id);
        let started = Instant::now();

        let timeout = self.config.job_timeout;
        let waited = task.accepted_at.elapsed();
        if waited >= timeout {
            logger.log_failure("timed out while waiting in the queue");
            let result = GenerationResult::failed(WorkerError::Timeout(timeout.as_secs()).to_string());
            return self
                .record(&task, result, started, &logger, &outputs)
                .await;
        }

        self.store.set_status(&job_id, JobStatus::Processing).await?;
        logger.log_start(task.request.motion_type(), task.request.num_frames);

        let outcome = tokio::select! {
            result = self.generate(&task, &logger, started) => result,
            _ = cancelled(&mut cancel) => Err(WorkerError::Cancelled),
            _ = tokio::time::sleep(timeout - waited) => Err(WorkerError::Timeout(timeout.as_secs())),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                logger.log_failure(&e.to_string());
                outputs.remove().await;
                GenerationResult::failed(e.to_string())
            }
        };

        self.record(&task, result, started, &logger, &outputs).await
    }

    async fn record(
        &self,
        task: &GenerationTask,
        result: GenerationResult,
        started: Instant,
        logger: &JobLogger,
        outputs: &ArtifactPaths,
    ) -> WorkerResult<GenerationResult> {
        let job_id = &task.job_id;
        let status = result.status;
        match self.store.finish(job_id, result.clone()).await {
            Ok(_) => {
                metrics::record_job_finished(status, started.elapsed().as_secs_f64());
                logger.log_finished(status, result.video_url.as_deref());
                Ok(result)
            }
            Err(e) => {
                if e.is_not_found() || e.is_terminal() {
                    logger.log_warning(&format!("Result not recorded, discarding outputs: {}", e));
                    self.discard(task, &result, outputs, logger).await;
                } else {
                    logger.log_warning(&format!("Result not recorded: {}", e));
                }
                Err(e.into())
            }
        }
    }

    async fn generate(
        &self,
        task: &GenerationTask,
        logger: &JobLogger,
        started: Instant,
    ) -> WorkerResult<GenerationResult> {
        self.checkpoint(&task.job_id, logger, 0.1, "Preparing workspace")
            .await?;
        let workspace = JobWorkspace::create(&self.config.work_dir, &task.job_id).await?;

        let outcome = self.generate_in(task, &workspace, logger, started).await;
        workspace.cleanup().await;
        outcome
    }

    async fn generate_in(
        &self,
        task: &GenerationTask,
        workspace: &JobWorkspace,
        logger: &JobLogger,
        started: Instant,
    ) -> WorkerResult<GenerationResult> {
        let job_id = &task.job_id;
        let request = &task.request;
        let fps = self.config.fps;
        let indices = request.resolved_indices();

        // Motion signals
        let options = self.config.synthesizer;
        let image = Arc::clone(&task.image);
        let motion = request.motion.clone();
        let num_frames = request.num_frames;
        let signal = tokio::task::spawn_blocking(move || {
            Synthesizer::new(options).synthesize(&image, &motion, num_frames)
        })
        .await
        .map_err(|e| WorkerError::job_failed(format!("motion synthesis panicked: {}", e)))??;
        self.checkpoint(job_id, logger, 0.3, "Motion signals synthesized")
            .await?;

        let (cue, mask) = signal.into_parts();
        let motion_signal_path = workspace.motion_signal_path();
        let mask_path = workspace.mask_path();
        self.encoder
            .encode(
                cue.into_iter().map(DynamicImage::ImageRgb8).collect(),
                fps,
                &motion_signal_path,
            )
            .await?;
        self.encoder
            .encode(
                mask.into_iter().map(DynamicImage::ImageLuma8).collect(),
                fps,
                &mask_path,
            )
            .await?;
        self.checkpoint(job_id, logger, 0.4, "Motion signals saved")
            .await?;

        // Pipeline input
        let (src_w, src_h) = task.image.dimensions();
        let (height, width) = compute_hw_from_area(
            src_h,
            src_w,
            self.config.max_area,
            self.pipeline.spatial_modulus(),
        );
        let image = Arc::clone(&task.image);
        let resized = tokio::task::spawn_blocking(move || resize_exact(&image, height, width))
            .await
            .map_err(|e| WorkerError::job_failed(format!("resize panicked: {}", e)))?;
        self.checkpoint(
            job_id,
            logger,
            0.5,
            &format!("Running inference at {}x{}", width, height),
        )
        .await?;

        let inference = InferenceRequest {
            image: resized,
            prompt: request.prompt.clone(),
            negative_prompt: self.config.negative_prompt.clone(),
            height,
            width,
            num_frames,
            guidance_scale: request.guidance_scale,
            num_inference_steps: self.config.num_inference_steps,
            seed: request.seed,
            motion_signal_path,
            mask_path,
            tweak_index: indices.tweak_index,
            tstrong_index: indices.tstrong_index,
        };

        let frames = {
            let _permit = self
                .inference_permits
                .acquire()
                .await
                .map_err(|_| WorkerError::job_failed("inference slots closed"))?;
            let inference_started = Instant::now();
            let frames = self.pipeline.infer(inference).await?;
            metrics::record_inference(inference_started.elapsed().as_secs_f64());
            frames
        };
        let Some(first) = frames.first() else {
            return Err(WorkerError::Inference("pipeline returned no frames".to_string()));
        };
        let frame_count = frames.len() as u32;
        self.checkpoint(
            job_id,
            logger,
            0.8,
            &format!("Generated {} frames", frame_count),
        )
        .await?;

        // Outputs
        let outputs = ArtifactPaths::new(&self.config.output_dir, job_id);
        write_thumbnail(first, &outputs.thumbnail).await?;
        self.encoder
            .encode(
                frames.into_iter().map(DynamicImage::ImageRgb8).collect(),
                fps,
                &outputs.video,
            )
            .await?;
        self.checkpoint(job_id, logger, 0.9, "Video assembled")
            .await?;

        let (video_url, thumbnail_url) = self
            .publish(job_id, request.project_id.as_deref(), &outputs, logger)
            .await;

        Ok(GenerationResult::completed(
            video_url,
            thumbnail_url,
            frame_count,
            fps,
            started.elapsed().as_secs_f64(),
        ))
    }

    async fn checkpoint(
        &self,
        job_id: &JobId,
        logger: &JobLogger,
        progress: f64,
        message: &str,
    ) -> WorkerResult<()> {
        self.store.set_progress(job_id, progress).await?;
        logger.log_progress(progress, message);
        Ok(())
    }

    /// Remove local outputs and any objects uploaded for `result`.
    async fn discard(
        &self,
        task: &GenerationTask,
        result: &GenerationResult,
        outputs: &ArtifactPaths,
        logger: &JobLogger,
    ) {
        outputs.remove().await;

        if !result.video_url.as_deref().is_some_and(is_remote_locator) {
            return;
        }
        let (Some(store), Some(project_id)) =
            (self.artifacts.as_deref(), task.request.project_id.as_deref())
        else {
            return;
        };

        for key in [
            video_key(project_id, &task.job_id),
            thumbnail_key(project_id, &task.job_id),
        ] {
            let removed = match key {
                Ok(key) => store.delete(&key).await,
                Err(e) => Err(e),
            };
            if let Err(e) = removed {
                logger.log_warning(&format!("Failed to delete uploaded artifact: {}", e));
            }
        }
    }

    /// Locators for the finished clip: uploaded URLs when a store is
    /// configured and the request names a project, local paths otherwise.
    async fn publish(
        &self,
        job_id: &JobId,
        project_id: Option<&str>,
        outputs: &ArtifactPaths,
        logger: &JobLogger,
    ) -> (String, String) {
        let local = (
            outputs.video.display().to_string(),
            outputs.thumbnail.display().to_string(),
        );
        let (Some(store), Some(project_id)) = (self.artifacts.as_deref(), project_id) else {
            return local;
        };

        match upload(store, project_id, job_id, outputs).await {
            Ok(urls) => urls,
            Err(e) => {
                metrics::record_upload_failure();
                logger.log_warning(&format!("Upload failed, keeping local artifacts: {}", e));
                local
            }
        }
    }
}

async fn upload(
    store: &dyn ArtifactStore,
    project_id: &str,
    job_id: &JobId,
    outputs: &ArtifactPaths,
) -> WorkerResult<(String, String)> {
    let video_key = video_key(project_id, job_id)?;
    let thumb_key = thumbnail_key(project_id, job_id)?;

    let video = tokio::fs::read(&outputs.video).await?;
    let video_url = store.upload(&video_key, video, "video/mp4").await?;

    let thumbnail = tokio::fs::read(&outputs.thumbnail).await?;
    let thumbnail_url = store.upload(&thumb_key, thumbnail, "image/jpeg").await?;

    Ok((video_url, thumbnail_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::never_cancelled;
    use crate::testing::{test_config, test_image, FakeEncoder, FakePipeline, FakeStore};
    use std::time::Duration;
    use ttm_models::{GenerationRequest, MotionSpec, Point};

    fn object_request(num_frames: u32) -> GenerationRequest {
        let mut request = GenerationRequest::new(
            MotionSpec::object(vec![Point::new(0.1, 0.1), Point::new(0.9, 0.9)]),
            "a ball rolling",
        );
        request.num_frames = num_frames;
        request
    }

    async fn orchestrator(
        config: WorkerConfig,
        pipeline: Arc<FakePipeline>,
        encoder: Arc<FakeEncoder>,
    ) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            config,
            JobStore::new(),
            GenerationDeps {
                pipeline,
                encoder,
                artifacts: None,
            },
        )
    }

    #[tokio::test]
    async fn test_run_sends_resized_input_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(FakePipeline::with_frames(16));
        let encoder = Arc::new(FakeEncoder::default());
        let orch = orchestrator(test_config(dir.path()), pipeline.clone(), encoder.clone()).await;

        let job_id = orch.store().create().await;
        let task = GenerationTask::new(job_id.clone(), object_request(16), test_image(64, 48));
        let result = orch.run(task, never_cancelled()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.frames, Some(16));
        assert_eq!(result.duration_seconds, Some(1.0));

        let seen = pipeline.last_request().unwrap();
        assert_eq!(seen.height % 16, 0);
        assert_eq!(seen.width % 16, 0);
        assert!(seen.width > seen.height);
        assert_eq!((seen.tweak_index, seen.tstrong_index), (3, 7));
        assert_eq!(seen.num_inference_steps, 50);

        // Cue, mask and final video.
        let encoded = encoder.calls();
        assert_eq!(encoded.len(), 3);
        assert!(encoded[0].0.ends_with("motion_signal.mp4"));
        assert!(encoded[1].0.ends_with("mask.mp4"));
        assert_eq!(encoded[0].1, 16);
        assert_eq!(encoded[2].2, 16);

        assert!(!dir.path().join("work").join(job_id.as_str()).exists());
        let job = orch.store().get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
    }

    #[tokio::test]
    async fn test_queue_wait_counts_against_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.job_timeout = Duration::from_millis(10);
        let pipeline = Arc::new(FakePipeline::with_frames(16));
        let orch = orchestrator(config, pipeline.clone(), Arc::new(FakeEncoder::default())).await;

        let job_id = orch.store().create().await;
        let task = GenerationTask::new(job_id.clone(), object_request(16), test_image(32, 32));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = orch.run(task, never_cancelled()).await.unwrap();
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("timed out"));
        assert!(pipeline.last_request().is_none());
    }

    #[tokio::test]
    async fn test_finished_job_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(FakePipeline::with_frames(16));
        let orch = orchestrator(
            test_config(dir.path()),
            pipeline.clone(),
            Arc::new(FakeEncoder::default()),
        )
        .await;

        let job_id = orch.store().create().await;
        orch.store()
            .finish(&job_id, GenerationResult::failed("Job cancelled"))
            .await
            .unwrap();

        let task = GenerationTask::new(job_id, object_request(16), test_image(32, 32));
        assert!(orch.run(task, never_cancelled()).await.is_err());
        assert!(pipeline.last_request().is_none());
    }

    #[tokio::test]
    async fn test_outputs_discarded_when_job_already_finished() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let artifacts = Arc::new(FakeStore::default());
        let orch = GenerationOrchestrator::new(
            config.clone(),
            JobStore::new(),
            GenerationDeps {
                pipeline: Arc::new(FakePipeline::with_frames(16)),
                encoder: Arc::new(FakeEncoder::default()),
                artifacts: Some(artifacts.clone()),
            },
        );

        let job_id = orch.store().create().await;
        orch.store()
            .set_status(&job_id, JobStatus::Processing)
            .await
            .unwrap();
        // Cancelled while the result was being assembled.
        orch.store()
            .finish(&job_id, GenerationResult::failed("Job cancelled"))
            .await
            .unwrap();

        let outputs = ArtifactPaths::new(&config.output_dir, &job_id);
        tokio::fs::create_dir_all(&config.output_dir).await.unwrap();
        tokio::fs::write(&outputs.video, b"mp4").await.unwrap();
        tokio::fs::write(&outputs.thumbnail, b"jpg").await.unwrap();

        let mut request = object_request(16);
        request.project_id = Some("proj".to_string());
        let task = GenerationTask::new(job_id.clone(), request, test_image(32, 32));

        let video_key = video_key("proj", &job_id).unwrap();
        let thumb_key = thumbnail_key("proj", &job_id).unwrap();
        let result = GenerationResult::completed(
            artifacts.public_url(&video_key),
            artifacts.public_url(&thumb_key),
            16,
            16,
            1.0,
        );
        let logger = JobLogger::new(&job_id, GENERATION_OPERATION);

        let err = orch
            .record(&task, result, Instant::now(), &logger, &outputs)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Queue(ref e) if e.is_terminal()));

        assert!(!outputs.video.exists());
        assert!(!outputs.thumbnail.exists());
        assert_eq!(artifacts.deletes(), vec![video_key, thumb_key]);

        let job = orch.store().get(&job_id).await.unwrap();
        assert_eq!(job.result.unwrap().error.as_deref(), Some("Job cancelled"));
    }
}
