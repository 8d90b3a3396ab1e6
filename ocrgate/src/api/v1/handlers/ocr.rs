//! v1 OCR handlers.
//!
//! Both endpoints run a job synchronously and return the job response in the
//! v1 envelope. Artifact persistence is best-effort and reported under
//! `artifacts`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::error::OcrGateError;
use crate::models::{validate_filename, JobRequest, JobResponse, Language};
use crate::pipeline::JobOptions;
use crate::services::ArtifactTarget;

fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `POST /api/v1/ocr`
#[utoipa::path(
    post,
    path = "/api/v1/ocr",
    tag = "ocr",
    operation_id = "ocr.run",
    request_body = JobRequest,
    responses(
        (status = 200, description = "Filtered detections and overlay image", body = JobResponse),
        (status = 400, description = "Invalid request or undecodable image", body = ApiError),
        (status = 502, description = "OCR engine failed", body = ApiError),
        (status = 503, description = "No OCR engine available", body = ApiError),
    )
)]
pub async fn run_ocr(
    State(state): State<AppState>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResponse<JobResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return OcrGateError::from(rejection).into(),
    };

    match state.pipeline.run(&request).await {
        Ok(outcome) => {
            let artifacts = state
                .artifacts
                .record(&ArtifactTarget::from(&request), &outcome)
                .await;
            ApiResponse::success(JobResponse {
                result: outcome.result,
                artifacts,
            })
        }
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/ocr:upload`
///
/// Multipart form with a `file` part and optional `lang`, `confidence`,
/// `destinationFolder`, `filename` and `includeText` text parts.
#[utoipa::path(
    post,
    path = "/api/v1/ocr:upload",
    tag = "ocr",
    operation_id = "ocr.upload",
    request_body(content_type = "multipart/form-data", content = String, description = "Image file with optional lang, confidence, destinationFolder, filename and includeText fields"),
    responses(
        (status = 200, description = "Filtered detections and overlay image", body = JobResponse),
        (status = 400, description = "Invalid request or undecodable image", body = ApiError),
        (status = 502, description = "OCR engine failed", body = ApiError),
        (status = 503, description = "No OCR engine available", body = ApiError),
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<JobResponse> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut options = JobOptions {
        lang: Language::default(),
        confidence: None,
        include_text: true,
    };
    let mut target = ArtifactTarget::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            match field.bytes().await {
                Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                Err(e) => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("Failed to read file: {e}"),
                    );
                }
            }
            continue;
        }

        let value = match field.text().await {
            Ok(text) => text,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Invalid {name} field: {e}"),
                );
            }
        };

        match name.as_str() {
            "lang" => match value.parse::<Language>() {
                Ok(lang) => options.lang = lang,
                Err(e) => return ApiResponse::error(ErrorCode::InvalidRequest, e),
            },
            "confidence" => match value.trim().parse::<f64>() {
                Ok(confidence) => options.confidence = Some(confidence),
                Err(_) => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("confidence must be a number, got '{value}'"),
                    );
                }
            },
            "destinationFolder" | "destination_folder" => {
                if !value.trim().is_empty() {
                    target.folder = Some(value);
                }
            }
            "filename" => {
                if let Err(e) = validate_filename(&value) {
                    return e.into();
                }
                target.filename = Some(value);
            }
            "includeText" | "include_text" => match parse_form_bool(&value) {
                Some(include) => options.include_text = include,
                None => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        "includeText must be one of true/false/1/0/yes/no",
                    );
                }
            },
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing required 'file' field");
    };

    match state.pipeline.run_bytes(bytes, options).await {
        Ok(outcome) => {
            let artifacts = state.artifacts.record(&target, &outcome).await;
            ApiResponse::success(JobResponse {
                result: outcome.result,
                artifacts,
            })
        }
        Err(e) => e.into(),
    }
}
