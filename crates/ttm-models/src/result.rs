//! Terminal job results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// Outcome recorded when a job reaches a terminal state.
///
/// Built through [`GenerationResult::completed`] or
/// [`GenerationResult::failed`], so either the success fields or `error`
/// are populated, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationResult {
    /// `completed` or `failed`
    pub status: JobStatus,

    /// Video locator: remote URL or local path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Thumbnail locator: remote URL or local path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Clip length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Number of frames in the clip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,

    /// Wall-clock generation time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    /// Successful result. `duration_seconds` is derived from `frames / fps`.
    pub fn completed(
        video_url: impl Into<String>,
        thumbnail_url: impl Into<String>,
        frames: u32,
        fps: u32,
        generation_time: f64,
    ) -> Self {
        let duration = if fps == 0 {
            0.0
        } else {
            frames as f64 / fps as f64
        };

        Self {
            status: JobStatus::Completed,
            video_url: Some(video_url.into()),
            thumbnail_url: Some(thumbnail_url.into()),
            duration_seconds: Some(duration),
            frames: Some(frames),
            generation_time: Some(generation_time),
            error: None,
        }
    }

    /// Failed result carrying a human readable message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            video_url: None,
            thumbnail_url: None,
            duration_seconds: None,
            frames: None,
            generation_time: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Whether a locator points at remote storage rather than the local disk.
pub fn is_remote_locator(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}
