//! Generation job handlers.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::warn;
use ttm_models::{GenerationPayload, Job, JobId, JobStatus};
use ttm_worker::Artifact;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response to an accepted generation request.
#[derive(Serialize)]
pub struct GenerateResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: f64,
}

impl From<Job> for GenerateResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            progress: job.progress,
        }
    }
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub job_id: JobId,
}

#[derive(Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

/// Submit a generation job.
///
/// Multipart fields: `image` (the source picture) and `request_json`
/// (a JSON-encoded [`GenerationPayload`]).
pub async fn generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<GenerateResponse>> {
    let mut image: Option<Vec<u8>> = None;
    let mut payload: Option<GenerationPayload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let is_image = field
                    .content_type()
                    .map_or(true, |ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(ApiError::bad_request("File must be an image"));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?;
                image = Some(bytes.to_vec());
            }
            Some("request_json") => {
                let text = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read request_json: {}", e))
                })?;
                payload = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| ApiError::bad_request(format!("Invalid request_json: {}", e)))?,
                );
            }
            other => {
                warn!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    let image = image.ok_or_else(|| ApiError::bad_request("image is required"))?;
    let payload = payload.ok_or_else(|| ApiError::bad_request("request_json is required"))?;

    let job = state.service.accept(image, payload).await?;
    Ok(Json(job.into()))
}

/// Poll a job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.service.poll(&JobId::from_string(job_id)).await?;
    Ok(Json(job))
}

/// Download the finished video, or get its URL when it was uploaded.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::from_string(job_id);

    match state.service.fetch_artifact(&job_id).await? {
        Artifact::Remote(url) => Ok(Json(DownloadUrlResponse { url }).into_response()),
        Artifact::Local(path) => {
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ApiError::not_found("Video file not found")
                } else {
                    ApiError::internal(format!("Failed to open video: {}", e))
                }
            })?;
            let len = file
                .metadata()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to read video metadata: {}", e)))?
                .len();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(header::CONTENT_LENGTH, len)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"ttm_{}.mp4\"", job_id),
                )
                .body(Body::from_stream(ReaderStream::new(file)))
                .map_err(|e| ApiError::internal(e.to_string()))
        }
    }
}

/// Delete a job and its files.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let job_id = JobId::from_string(job_id);
    state.service.delete(&job_id).await?;
    Ok(Json(DeleteResponse {
        status: "deleted",
        job_id,
    }))
}

/// Cancel a job without deleting it.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.service.cancel(&JobId::from_string(job_id)).await?;
    Ok(Json(job))
}
