use serde::{Deserialize, Serialize};

use crate::models::{JobReply, JobResponse, MessageStatus};

/// Response body for `POST /v1/jobs`.
///
/// ```json
/// { "jobId": "V1StGXR8_Z5jdHi6B-myT" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueJobResponse {
    pub job_id: String,
}

/// Wire format: `"pending"`, `"processing"`, `"completed"` or `"failed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Waiting on the input queue.
    Pending,
    /// Claimed by a consumer, no reply yet.
    Processing,
    Completed,
    Failed,
}

impl From<MessageStatus> for JobStatus {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Ready => JobStatus::Pending,
            MessageStatus::InFlight => JobStatus::Processing,
        }
    }
}

/// Response body for `GET /v1/jobs/{jobId}`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    /// Present once the job completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Terminal failure state, e.g. `decode_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl JobStatusResponse {
    pub fn waiting(job_id: String, status: MessageStatus) -> Self {
        Self {
            job_id,
            status: status.into(),
            result: None,
            error: None,
            state: None,
        }
    }
}

impl From<JobReply> for JobStatusResponse {
    fn from(reply: JobReply) -> Self {
        match reply {
            JobReply::Completed { job_id, response } => Self {
                job_id,
                status: JobStatus::Completed,
                result: Some(response),
                error: None,
                state: None,
            },
            JobReply::Failed {
                job_id,
                error,
                state,
            } => Self {
                job_id,
                status: JobStatus::Failed,
                result: None,
                error: Some(error),
                state: state.map(|s| s.to_string()),
            },
        }
    }
}
