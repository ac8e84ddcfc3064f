//! Generation worker for the TTM service.
//!
//! This crate runs accepted jobs end to end:
//! - [`GenerationService`]: accept, poll, fetch, delete and cancel operations
//! - [`JobExecutor`]: bounded worker pool draining the task queue
//! - [`GenerationOrchestrator`]: synthesis, inference, assembly and upload
//! - Per-job workspaces, cancellation signals, structured logging and metrics

pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod service;
pub mod task;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use cancel::CancelRegistry;
pub use config::WorkerConfig;
pub use error::{ServiceError, ServiceResult, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{GenerationDeps, GenerationOrchestrator, GENERATION_OPERATION};
pub use service::{Artifact, GenerationService, Readiness};
pub use task::GenerationTask;
