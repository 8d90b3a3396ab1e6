use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrGateError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot decode image: {0}")]
    Decode(String),

    #[error("OCR inference failed: {0}")]
    Inference(String),

    #[error("OCR engine unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Terminal failure state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    DecodeFailed,
    InferenceFailed,
    DeliveryFailed,
}

impl std::fmt::Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeFailed => write!(f, "decode_failed"),
            Self::InferenceFailed => write!(f, "inference_failed"),
            Self::DeliveryFailed => write!(f, "delivery_failed"),
        }
    }
}

impl OcrGateError {
    /// Job state this error terminates in, if it is one of the job failures.
    pub fn terminal_state(&self) -> Option<TerminalState> {
        match self {
            OcrGateError::Validation(_) | OcrGateError::Decode(_) => {
                Some(TerminalState::DecodeFailed)
            }
            OcrGateError::Inference(_) | OcrGateError::InferenceUnavailable(_) => {
                Some(TerminalState::InferenceFailed)
            }
            OcrGateError::Delivery(_) => Some(TerminalState::DeliveryFailed),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OcrGateError::Validation(_) => StatusCode::BAD_REQUEST,
            OcrGateError::Decode(_) => StatusCode::BAD_REQUEST,
            OcrGateError::Json(_) => StatusCode::BAD_REQUEST,
            OcrGateError::NotFound(_) => StatusCode::NOT_FOUND,
            OcrGateError::Inference(_) => StatusCode::BAD_GATEWAY,
            OcrGateError::Http(_) => StatusCode::BAD_GATEWAY,
            OcrGateError::InferenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OcrGateError::Delivery(_)
            | OcrGateError::Database(_)
            | OcrGateError::Io(_)
            | OcrGateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OcrGateError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            OcrGateError::Validation(msg)
            | OcrGateError::Decode(msg)
            | OcrGateError::Inference(msg)
            | OcrGateError::InferenceUnavailable(msg)
            | OcrGateError::NotFound(msg) => msg.clone(),
            OcrGateError::Json(e) => e.to_string(),
            OcrGateError::Http(e) => e.to_string(),
            internal => {
                tracing::error!(error = %internal, "Internal error");
                "An internal error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OcrGateError>;
