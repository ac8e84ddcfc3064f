//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{cancel_job, delete_job, download, generate, get_status, health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, redact_internal_errors, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let ttm_routes = Router::new()
        .route("/generate", post(generate))
        .route("/status/:job_id", get(get_status))
        .route("/download/:job_id", get(download))
        .route("/job/:job_id", delete(delete_job))
        .route("/job/:job_id/cancel", post(cancel_job));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api/ttm", ttm_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            redact_internal_errors,
        ))
        // Uploads are bounded by the configured limit instead of axum's 2 MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use image::{DynamicImage, RgbImage};
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;
    use ttm_media::{FrameEncoder, MediaResult};
    use ttm_models::{GenerationResult, JobId, JobStatus};
    use ttm_pipeline::{InferencePipeline, InferenceRequest, PipelineError, PipelineResult};
    use ttm_worker::{GenerationDeps, GenerationService, JobExecutor, WorkerConfig};

    const BOUNDARY: &str = "ttm-test-boundary";

    struct StubPipeline {
        ready: bool,
    }

    #[async_trait]
    impl InferencePipeline for StubPipeline {
        fn spatial_modulus(&self) -> u32 {
            16
        }

        async fn is_ready(&self) -> bool {
            self.ready
        }

        async fn infer(&self, _request: InferenceRequest) -> PipelineResult<Vec<RgbImage>> {
            Err(PipelineError::unavailable("stub"))
        }
    }

    struct NoopEncoder;

    #[async_trait]
    impl FrameEncoder for NoopEncoder {
        async fn encode(&self, _frames: Vec<DynamicImage>, _fps: u32, _output: &Path) -> MediaResult<()> {
            Ok(())
        }
    }

    /// Router whose executor is never started, so accepted jobs stay pending.
    /// The executor is returned to keep the queue open.
    fn app(ready: bool) -> (Router, (tempfile::TempDir, JobExecutor)) {
        let (router, _, guard) = app_with_service(ready);
        (router, guard)
    }

    fn app_with_service(
        ready: bool,
    ) -> (Router, GenerationService, (tempfile::TempDir, JobExecutor)) {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            work_dir: dir.path().join("work"),
            output_dir: dir.path().join("out"),
            ..WorkerConfig::default()
        };
        let deps = GenerationDeps {
            pipeline: Arc::new(StubPipeline { ready }),
            encoder: Arc::new(NoopEncoder),
            artifacts: None,
        };
        let (service, executor) = GenerationService::new(config, deps);
        let state = AppState::new(ApiConfig::default(), service.clone());
        (create_router(state, None), service, (dir, executor))
    }

    fn png() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        RgbImage::new(32, 32)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart(image_type: &str, request_json: Option<&str>) -> Body {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"in.png\"\r\nContent-Type: {t}\r\n\r\n",
                b = BOUNDARY,
                t = image_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&png());
        body.extend_from_slice(b"\r\n");
        if let Some(json) = request_json {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"request_json\"\r\n\r\n{j}\r\n",
                    b = BOUNDARY,
                    j = json
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Body::from(body)
    }

    fn generate_request(image_type: &str, request_json: Option<&str>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ttm/generate")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(multipart(image_type, request_json))
            .unwrap()
    }

    fn simple(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const OBJECT_JSON: &str = r#"{"motion_type":"object","prompt":"a ball rolling","trajectory":[{"x":0.1,"y":0.5},{"x":0.9,"y":0.5}]}"#;

    async fn accept(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(generate_request("image/png", Some(OBJECT_JSON)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["progress"], 0.0);
        body["job_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _guard) = app(true);
        let response = app.oneshot(simple("GET", "/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_unloaded_model() {
        let (app, _guard) = app(false);
        let response = app.oneshot(simple("GET", "/ready")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["model_loaded"], false);
    }

    #[tokio::test]
    async fn test_generate_then_poll() {
        let (app, _guard) = app(true);
        let job_id = accept(&app).await;

        let response = app
            .oneshot(simple("GET", &format!("/api/ttm/status/{}", job_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["job_id"], job_id.as_str());
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_input() {
        let (app, _guard) = app(true);

        let missing = app
            .clone()
            .oneshot(generate_request("image/png", None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(missing).await["detail"], "request_json is required");

        let not_image = app
            .clone()
            .oneshot(generate_request("text/plain", Some(OBJECT_JSON)))
            .await
            .unwrap();
        assert_eq!(not_image.status(), StatusCode::BAD_REQUEST);

        let out_of_range = r#"{"motion_type":"object","prompt":"x","trajectory":[{"x":0.1,"y":0.1}],"tweak_index":75}"#;
        let invalid = app
            .oneshot(generate_request("image/png", Some(out_of_range)))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(invalid).await["detail"],
            "tweak_index must be between 0 and 50"
        );
    }

    #[tokio::test]
    async fn test_generate_unavailable_when_model_not_loaded() {
        let (app, _guard) = app(false);
        let response = app
            .oneshot(generate_request("image/png", Some(OBJECT_JSON)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["detail"], "Model not loaded");
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let (app, _guard) = app(true);

        for (method, uri) in [
            ("GET", "/api/ttm/status/nope"),
            ("GET", "/api/ttm/download/nope"),
            ("DELETE", "/api/ttm/job/nope"),
        ] {
            let response = app.clone().oneshot(simple(method, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
            assert_eq!(json(response).await["detail"], "Job not found");
        }
    }

    #[tokio::test]
    async fn test_download_before_completion() {
        let (app, _guard) = app(true);
        let job_id = accept(&app).await;

        let response = app
            .oneshot(simple("GET", &format!("/api/ttm/download/{}", job_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["detail"], "Video not ready");
    }

    #[tokio::test]
    async fn test_download_streams_local_video() {
        let (app, service, guard) = app_with_service(true);
        let job_id = JobId::from_string(accept(&app).await);

        let video = guard.0.path().join("out").join(format!("{}.mp4", job_id));
        tokio::fs::create_dir_all(video.parent().unwrap()).await.unwrap();
        let contents: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&video, &contents).await.unwrap();

        let store = service.store();
        store.set_status(&job_id, JobStatus::Processing).await.unwrap();
        store
            .finish(
                &job_id,
                GenerationResult::completed(video.display().to_string(), "", 16, 16, 1.0),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(simple("GET", &format!("/api/ttm/download/{}", job_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "video/mp4");
        assert_eq!(
            response.headers().get("content-length").unwrap(),
            contents.len().to_string().as_str()
        );
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            format!("attachment; filename=\"ttm_{}.mp4\"", job_id).as_str()
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), contents.as_slice());
    }

    #[tokio::test]
    async fn test_delete_job() {
        let (app, _guard) = app(true);
        let job_id = accept(&app).await;
        let uri = format!("/api/ttm/job/{}", job_id);

        let response = app.clone().oneshot(simple("DELETE", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "deleted");

        let again = app.oneshot(simple("DELETE", &uri)).await.unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_pending_job() {
        let (app, _guard) = app(true);
        let job_id = accept(&app).await;
        let uri = format!("/api/ttm/job/{}/cancel", job_id);

        let response = app.clone().oneshot(simple("POST", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["result"]["error"], "Job cancelled");

        let again = app.oneshot(simple("POST", &uri)).await.unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }
}
