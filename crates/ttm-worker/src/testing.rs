//! In-process fakes for worker tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use ttm_media::{FrameEncoder, MediaResult};
use ttm_pipeline::{InferenceParams, InferencePipeline, InferenceRequest, PipelineError, PipelineResult};
use ttm_storage::{ArtifactStore, StorageError, StorageResult};

use crate::config::WorkerConfig;

pub(crate) fn test_config(root: &Path) -> WorkerConfig {
    WorkerConfig {
        work_dir: root.join("work"),
        output_dir: root.join("out"),
        max_area: 128 * 96,
        job_timeout: Duration::from_secs(30),
        shutdown_timeout: Duration::from_secs(5),
        ..WorkerConfig::default()
    }
}

pub(crate) fn test_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    test_image(width, height)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[derive(Debug, Clone)]
pub(crate) enum PipelineBehavior {
    Frames(usize),
    Fail(String),
    Hang,
}

pub(crate) struct FakePipeline {
    ready: AtomicBool,
    behavior: PipelineBehavior,
    requests: Mutex<Vec<InferenceParams>>,
}

impl FakePipeline {
    pub fn new(behavior: PipelineBehavior) -> Self {
        Self {
            ready: AtomicBool::new(true),
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_frames(count: usize) -> Self {
        Self::new(PipelineBehavior::Frames(count))
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<InferenceParams> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl InferencePipeline for FakePipeline {
    fn spatial_modulus(&self) -> u32 {
        16
    }

    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn infer(&self, request: InferenceRequest) -> PipelineResult<Vec<RgbImage>> {
        assert!(request.motion_signal_path.exists());
        assert!(request.mask_path.exists());
        self.requests.lock().unwrap().push(request.params());

        match &self.behavior {
            PipelineBehavior::Frames(count) => Ok((0..*count)
                .map(|i| RgbImage::from_pixel(request.width, request.height, Rgb([i as u8, 0, 0])))
                .collect()),
            PipelineBehavior::Fail(msg) => Err(PipelineError::inference_failed(msg.clone())),
            PipelineBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }
}

/// Encoder that writes a placeholder file and records each call.
#[derive(Default)]
pub(crate) struct FakeEncoder {
    calls: Mutex<Vec<(PathBuf, usize, u32)>>,
}

impl FakeEncoder {
    pub fn calls(&self) -> Vec<(PathBuf, usize, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameEncoder for FakeEncoder {
    async fn encode(&self, frames: Vec<DynamicImage>, fps: u32, output: &Path) -> MediaResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, format!("{} frames", frames.len())).await?;
        self.calls
            .lock()
            .unwrap()
            .push((output.to_path_buf(), frames.len(), fps));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub fail: bool,
    uploads: Mutex<Vec<(String, String)>>,
    deletes: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Uploaded `(key, content_type)` pairs.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn upload(&self, key: &str, _data: Vec<u8>, content_type: &str) -> StorageResult<String> {
        if self.fail {
            return Err(StorageError::upload_failed("bucket unreachable"));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail {
            return Err(StorageError::delete_failed("bucket unreachable"));
        }
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}
