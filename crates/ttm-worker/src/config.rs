//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use ttm_models::defaults::{DEFAULT_FPS, DEFAULT_MAX_AREA, DEFAULT_NUM_INFERENCE_STEPS};
use ttm_motion::{SynthesizerOptions, TrajectoryPolicy, DEFAULT_CIRCLE_RADIUS};
use ttm_queue::QueueConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Number of pipeline instances; inference calls beyond this wait
    pub pipeline_instances: usize,
    /// Job timeout, also applied to time spent waiting in the queue
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Per-job temporary files live under `{work_dir}/{job_id}`
    pub work_dir: PathBuf,
    /// Finished videos and thumbnails
    pub output_dir: PathBuf,
    /// Frame rate of signals and outputs
    pub fps: u32,
    /// Pixel-area budget for the pipeline input
    pub max_area: u32,
    /// Denoising steps passed to the pipeline
    pub num_inference_steps: u32,
    /// Negative prompt sent with every request
    pub negative_prompt: String,
    /// Motion synthesizer tuning
    pub synthesizer: SynthesizerOptions,
    /// Task queue sizing
    pub queue: QueueConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            pipeline_instances: 1,
            job_timeout: Duration::from_secs(600),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/ttm_workspace"),
            output_dir: PathBuf::from("/tmp/ttm_outputs"),
            fps: DEFAULT_FPS,
            max_area: DEFAULT_MAX_AREA,
            num_inference_steps: DEFAULT_NUM_INFERENCE_STEPS,
            negative_prompt: String::new(),
            synthesizer: SynthesizerOptions::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("TTM_MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1),
            pipeline_instances: std::env::var("TTM_PIPELINE_INSTANCES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1),
            job_timeout: Duration::from_secs(
                std::env::var("TTM_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("TTM_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("TTM_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/ttm_workspace")),
            output_dir: std::env::var("TTM_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/ttm_outputs")),
            fps: std::env::var("TTM_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(DEFAULT_FPS),
            max_area: std::env::var("TTM_MAX_AREA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_AREA),
            num_inference_steps: std::env::var("TTM_NUM_INFERENCE_STEPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NUM_INFERENCE_STEPS),
            negative_prompt: std::env::var("TTM_NEGATIVE_PROMPT").unwrap_or_default(),
            synthesizer: SynthesizerOptions {
                circle_radius: std::env::var("TTM_CIRCLE_RADIUS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CIRCLE_RADIUS),
                trajectory_policy: std::env::var("TTM_TRAJECTORY_POLICY")
                    .ok()
                    .and_then(|s| TrajectoryPolicy::parse(&s))
                    .unwrap_or_default(),
            },
            queue: QueueConfig::from_env(),
        }
    }
}
