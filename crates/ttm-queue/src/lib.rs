//! Job management for the TTM service.
//!
//! This crate provides:
//! - [`JobStore`], the authoritative in-memory job table
//! - [`JobQueue`], a bounded queue feeding the worker pool

pub mod error;
pub mod queue;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, JobReceiver, QueueConfig};
pub use store::{JobCounts, JobStore};
