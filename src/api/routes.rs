//! API route definitions

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use super::state::ApiStateHandle;
use super::types::*;
use crate::core::uploads::{decode_video_payload, TempVideo};
use crate::models::pipeline::PipelineOutcome;

/// Multipart field carrying the video
pub const VIDEO_FIELD: &str = "video";

/// Create the API router with all endpoints
pub fn create_router(state: ApiStateHandle) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/process_video", post(process_video_handler))
        .route("/runsync", post(runsync_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn status_handler(State(state): State<ApiStateHandle>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        busy: state.is_busy(),
        estimator: state.pipeline.estimator().model_info(),
    })
}

fn bad_request(message: &str) -> (StatusCode, Json<PipelineOutcome>) {
    (StatusCode::BAD_REQUEST, Json(PipelineOutcome::error(message)))
}

async fn process_video_handler(
    State(state): State<ApiStateHandle>,
    mut multipart: Multipart,
) -> (StatusCode, Json<PipelineOutcome>) {
    let mut upload: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(&format!("Invalid multipart body: {}", e)),
        };
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((file_name, bytes));
                break;
            }
            Err(e) => return bad_request(&format!("Failed to read upload: {}", e)),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return bad_request("No video file part");
    };
    if file_name.is_empty() {
        return bad_request("No selected file");
    }

    tracing::info!(file_name = %file_name, bytes = bytes.len(), "Video upload received");

    let outcome = run_uploaded(&state, file_name, bytes).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome))
}

/// Always answers 200 with a status envelope, including for bodies that are
/// not a JSON job request
async fn runsync_handler(
    State(state): State<ApiStateHandle>,
    request: Result<Json<JobRequest>, JsonRejection>,
) -> Json<JobResponse> {
    let job = match request {
        Ok(Json(job)) => job,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected job request");
            return Json(JobResponse::error(format!(
                "Invalid job request: {}",
                rejection.body_text()
            )));
        }
    };

    let job_id = job.id.unwrap_or_else(|| "-".to_string());
    tracing::info!(job_id = %job_id, "Job received");

    let payload = match decode_video_payload(&job.input) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Rejected job input");
            return Json(JobResponse::error(e.to_string()));
        }
    };

    let outcome = run_uploaded(&state, payload.file_name, Bytes::from(payload.bytes)).await;
    Json(outcome.into())
}

/// Store the upload, run the pipeline under a job slot and drop the upload
async fn run_uploaded(state: &ApiStateHandle, file_name: String, bytes: Bytes) -> PipelineOutcome {
    let upload_dir = state.upload_dir.clone();
    let stored = tokio::task::spawn_blocking(move || TempVideo::write(&upload_dir, &file_name, &bytes)).await;

    let video = match stored {
        Ok(Ok(video)) => video,
        Ok(Err(e)) => return PipelineOutcome::error(e.to_string()),
        Err(e) => return PipelineOutcome::error(format!("Upload task failed: {}", e)),
    };

    let _permit = match state.job_slots.acquire().await {
        Ok(permit) => permit,
        Err(e) => return PipelineOutcome::error(format!("Job queue closed: {}", e)),
    };

    state.pipeline.run_full_pipeline(video.path()).await
}
