//! External generation pipeline interface.
//!
//! The denoising model runs outside this service. This crate defines the
//! narrow seam the worker talks to ([`InferencePipeline`]), an HTTP
//! implementation of it, and the input-dimension rules the model imposes.

pub mod client;
pub mod config;
pub mod dims;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use client::HttpPipelineClient;
pub use config::{PipelineClientConfig, RetryConfig};
pub use dims::{compute_hw_from_area, resize_exact};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::InferencePipeline;
pub use types::{InferenceParams, InferenceRequest, InferenceResponse};
