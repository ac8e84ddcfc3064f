//! Artifact storage for generated clips.
//!
//! Provides the [`ArtifactStore`] seam, an R2/S3 implementation and the
//! object key layout (`projects/{project_id}/ttm/...`).

pub mod client;
pub mod error;
pub mod keys;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{thumbnail_key, video_key};
pub use store::ArtifactStore;
