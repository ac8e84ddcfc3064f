//! The generation pipeline seam.

use async_trait::async_trait;
use image::RgbImage;

use crate::error::PipelineResult;
use crate::types::InferenceRequest;

/// External motion-guided video generation model.
///
/// Implementations must be safe to share across worker tasks; callers
/// serialize `infer` when the backend can only run one generation at a time.
#[async_trait]
pub trait InferencePipeline: Send + Sync {
    /// Both output sides must be multiples of this value
    /// (VAE spatial scale factor times transformer patch size).
    fn spatial_modulus(&self) -> u32;

    /// Whether the pipeline can accept work right now.
    async fn is_ready(&self) -> bool;

    /// Generate frames for `request`.
    async fn infer(&self, request: InferenceRequest) -> PipelineResult<Vec<RgbImage>>;
}
