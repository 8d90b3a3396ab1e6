//! v1 queue handlers: enqueue a job and poll for its reply.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::api::v1::dto::{EnqueueJobResponse, JobStatusResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::error::OcrGateError;
use crate::models::{JobReply, JobRequest};
use crate::queue;

/// `POST /api/v1/jobs`
///
/// Publishes the job on the input queue. Returns 202 with the `jobId` to poll.
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    operation_id = "jobs.create",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Job queued", body = EnqueueJobResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResponse<EnqueueJobResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return OcrGateError::from(rejection).into(),
    };

    match queue::enqueue(state.db.as_ref(), &state.config.queue, &request).await {
        Ok(job_id) => ApiResponse::accepted(EnqueueJobResponse { job_id }),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/jobs/{jobId}`
///
/// Looks for a reply on the response queue first, then for the job itself on
/// the input queue.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{jobId}",
    tag = "jobs",
    operation_id = "jobs.get",
    params(("jobId" = String, Path, description = "Id returned by POST /api/v1/jobs")),
    responses(
        (status = 200, description = "Job status, with the result once completed", body = JobStatusResponse),
        (status = 404, description = "Unknown job", body = ApiError),
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResponse<JobStatusResponse> {
    let queues = &state.config.queue;

    match state
        .db
        .find_by_correlation(&queues.response_queue, &job_id)
        .await
    {
        Ok(Some(message)) => {
            return match serde_json::from_str::<JobReply>(&message.body) {
                Ok(reply) => ApiResponse::success(reply.into()),
                Err(e) => OcrGateError::Internal(format!(
                    "Unreadable reply {} for job {job_id}: {e}",
                    message.id
                ))
                .into(),
            };
        }
        Ok(None) => {}
        Err(e) => return e.into(),
    }

    match state.db.get_message(&job_id).await {
        Ok(Some(message)) if message.queue == queues.input_queue => {
            ApiResponse::success(JobStatusResponse::waiting(job_id, message.status))
        }
        Ok(_) => ApiResponse::error(ErrorCode::NotFound, format!("Job {job_id} not found")),
        Err(e) => e.into(),
    }
}
