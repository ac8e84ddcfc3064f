//! HTTP client for a remote generation pipeline.

use std::io::Cursor;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::RgbImage;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::PipelineClientConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::InferencePipeline;
use crate::retry::with_retry;
use crate::types::{ErrorBody, InferenceRequest, InferenceResponse};

/// Longest error body echoed back in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Pipeline reached over HTTP.
///
/// `POST {base_url}/infer` takes a multipart form with a `params` JSON part
/// and `image`, `motion_signal`, `mask` file parts, and answers with
/// `{"frames": [<base64 PNG>, ...]}`. `GET {base_url}/health` reports
/// readiness.
#[derive(Clone)]
pub struct HttpPipelineClient {
    client: Client,
    config: PipelineClientConfig,
}

/// Payload read once and re-sent on every attempt.
struct PreparedRequest {
    params: String,
    image_png: Vec<u8>,
    motion_signal: Vec<u8>,
    mask: Vec<u8>,
}

impl HttpPipelineClient {
    /// Create a new client.
    pub fn new(config: PipelineClientConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Self::new(PipelineClientConfig::from_env())
    }

    pub fn config(&self) -> &PipelineClientConfig {
        &self.config
    }

    async fn prepare(&self, request: &InferenceRequest) -> PipelineResult<PreparedRequest> {
        let params = serde_json::to_string(&request.params())?;

        let image = request.image.clone();
        let image_png = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| PipelineError::invalid_response(format!("PNG encoder panicked: {}", e)))??;

        let motion_signal = tokio::fs::read(&request.motion_signal_path).await?;
        let mask = tokio::fs::read(&request.mask_path).await?;

        Ok(PreparedRequest {
            params,
            image_png,
            motion_signal,
            mask,
        })
    }

    async fn send_infer(&self, prepared: &PreparedRequest) -> PipelineResult<InferenceResponse> {
        let form = Form::new()
            .text("params", prepared.params.clone())
            .part(
                "image",
                Part::bytes(prepared.image_png.clone())
                    .file_name("image.png")
                    .mime_str("image/png")?,
            )
            .part(
                "motion_signal",
                Part::bytes(prepared.motion_signal.clone())
                    .file_name("motion_signal.mp4")
                    .mime_str("video/mp4")?,
            )
            .part(
                "mask",
                Part::bytes(prepared.mask.clone())
                    .file_name("mask.mp4")
                    .mime_str("video/mp4")?,
            );

        let url = format!("{}/infer", self.config.base_url);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::from_http_status(
                status.as_u16(),
                error_message(&body),
            ));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl InferencePipeline for HttpPipelineClient {
    fn spatial_modulus(&self) -> u32 {
        self.config.spatial_modulus
    }

    async fn is_ready(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Pipeline health check failed: {}", e);
                false
            }
        }
    }

    async fn infer(&self, request: InferenceRequest) -> PipelineResult<Vec<RgbImage>> {
        let expected_frames = request.num_frames as usize;
        let prepared = self.prepare(&request).await?;

        info!(
            height = request.height,
            width = request.width,
            num_frames = request.num_frames,
            "Sending inference request"
        );

        let response = with_retry(&self.config.retry, "infer", || self.send_infer(&prepared)).await?;

        if response.frames.is_empty() {
            return Err(PipelineError::invalid_response("pipeline returned no frames"));
        }
        if response.frames.len() != expected_frames {
            warn!(
                expected = expected_frames,
                received = response.frames.len(),
                "Pipeline returned an unexpected frame count"
            );
        }

        tokio::task::spawn_blocking(move || decode_frames(&response.frames))
            .await
            .map_err(|e| PipelineError::invalid_response(format!("frame decoder panicked: {}", e)))?
    }
}

fn encode_png(image: &RgbImage) -> PipelineResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn decode_frames(frames: &[String]) -> PipelineResult<Vec<RgbImage>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, encoded)| {
            let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                PipelineError::invalid_response(format!("frame {} is not valid base64: {}", i, e))
            })?;
            Ok(image::load_from_memory(&bytes)?.to_rgb8())
        })
        .collect()
}

/// Extract a readable message from an error body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.detail.or(parsed.error) {
            return msg;
        }
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}
