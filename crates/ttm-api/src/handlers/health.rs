//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub model_loaded: bool,
    pub jobs: JobCountsResponse,
    pub queue: QueueResponse,
}

#[derive(Serialize)]
pub struct JobCountsResponse {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub depth: usize,
    pub capacity: usize,
}

/// Readiness check endpoint (readiness).
/// Ready once the generation pipeline answers its health check.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let readiness = state.service.readiness().await;

    let response = ReadinessResponse {
        status: if readiness.pipeline_ready {
            "ready"
        } else {
            "degraded"
        }
        .to_string(),
        model_loaded: readiness.pipeline_ready,
        jobs: JobCountsResponse {
            pending: readiness.jobs.pending,
            processing: readiness.jobs.processing,
            completed: readiness.jobs.completed,
            failed: readiness.jobs.failed,
        },
        queue: QueueResponse {
            depth: readiness.queue_depth,
            capacity: readiness.queue_capacity,
        },
    };

    if readiness.pipeline_ready {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
