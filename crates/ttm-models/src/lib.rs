//! Shared data models for the TTM generation service.
//!
//! This crate provides Serde-serializable types for:
//! - Motion specifications (object trajectories, camera movements)
//! - Generation requests, validation and index defaulting
//! - Job records, statuses and terminal results

pub mod defaults;
pub mod job;
pub mod motion;
pub mod request;
pub mod result;

// Re-export common types
pub use job::{Job, JobId, JobStatus};
pub use motion::{CameraKind, CameraKindParseError, CameraMovement, MotionSpec, MotionType, Point};
pub use request::{GenerationPayload, GenerationRequest, ResolvedIndices, ValidationError};
pub use result::{is_remote_locator, GenerationResult};
