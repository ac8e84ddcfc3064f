//! Pipeline request types.

use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// One generation call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Source image, already resized to `width x height`
    pub image: RgbImage,
    pub prompt: String,
    pub negative_prompt: String,
    pub height: u32,
    pub width: u32,
    pub num_frames: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub seed: Option<u64>,
    /// Cue video produced by the synthesizer
    pub motion_signal_path: PathBuf,
    /// Mask video produced by the synthesizer
    pub mask_path: PathBuf,
    pub tweak_index: u32,
    pub tstrong_index: u32,
}

impl InferenceRequest {
    /// Scalar parameters sent alongside the media parts.
    pub fn params(&self) -> InferenceParams {
        InferenceParams {
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            height: self.height,
            width: self.width,
            num_frames: self.num_frames,
            guidance_scale: self.guidance_scale,
            num_inference_steps: self.num_inference_steps,
            seed: self.seed,
            tweak_index: self.tweak_index,
            tstrong_index: self.tstrong_index,
        }
    }
}

/// JSON `params` part of an inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub height: u32,
    pub width: u32,
    pub num_frames: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub tweak_index: u32,
    pub tstrong_index: u32,
}

/// Inference response body: generated frames as base64 PNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub frames: Vec<String>,
}

/// Error body returned by the pipeline service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
