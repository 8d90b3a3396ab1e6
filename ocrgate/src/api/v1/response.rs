//! # V1 response envelope
//!
//! Every v1 endpoint answers with an [`ApiResponse<T>`]:
//!
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "nextCursor": "...", "total": 42 },
//!   "error": { "code": "inference_failed", "message": "..." }
//! }
//! ```
//!
//! `data` and `error` are mutually exclusive. `meta` only appears on list
//! endpoints. Cursors are opaque; an invalid one returns `400 invalid_request`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::OcrGateError;

/// Machine-readable error code, serialized in snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Validation failure or an image that cannot be decoded. HTTP 400.
    InvalidRequest,
    /// Missing or unknown bearer token. HTTP 401.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// Details are never sent to the client. HTTP 500.
    InternalError,
    /// The OCR engine returned an error or timed out. HTTP 502.
    InferenceFailed,
    /// No OCR engine is configured. HTTP 503.
    EngineUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InferenceFailed => StatusCode::BAD_GATEWAY,
            Self::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::InternalError => write!(f, "internal_error"),
            Self::InferenceFailed => write!(f, "inference_failed"),
            Self::EngineUnavailable => write!(f, "engine_unavailable"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to end users.
    pub message: String,
}

/// Pagination metadata for list responses (`nextCursor`, `total`).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CursorPagination {
    /// Clamped to `1..=100`, defaults to 20.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor from a previous `meta.nextCursor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

fn default_limit() -> u32 {
    20
}

impl Default for CursorPagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            cursor: None,
        }
    }
}

impl CursorPagination {
    pub fn validate(mut self) -> Self {
        self.limit = self.limit.clamp(1, 100);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// HTTP 200.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::OK,
        }
    }

    /// HTTP 200 with pagination metadata.
    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self {
            data: Some(data),
            meta: Some(meta),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// HTTP 202, used when a job has been queued but not processed yet.
    pub fn accepted(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::ACCEPTED,
        }
    }

    /// HTTP status follows the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize v1 response");
                let body = serde_json::json!({
                    "error": {
                        "code": ErrorCode::InternalError,
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<OcrGateError> for ApiResponse<T> {
    /// Internal details are logged, never returned.
    fn from(err: OcrGateError) -> Self {
        match err {
            OcrGateError::Validation(msg) | OcrGateError::Decode(msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg)
            }

            OcrGateError::Json(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            OcrGateError::NotFound(msg) => ApiResponse::error(ErrorCode::NotFound, msg),

            OcrGateError::Inference(msg) => ApiResponse::error(ErrorCode::InferenceFailed, msg),

            OcrGateError::Http(e) => {
                tracing::warn!(error = %e, "OCR engine request failed");
                ApiResponse::error(ErrorCode::InferenceFailed, "OCR engine request failed")
            }

            OcrGateError::InferenceUnavailable(msg) => {
                ApiResponse::error(ErrorCode::EngineUnavailable, msg)
            }

            internal @ (OcrGateError::Delivery(_)
            | OcrGateError::Database(_)
            | OcrGateError::Io(_)
            | OcrGateError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
