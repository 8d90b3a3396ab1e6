use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocrgate API",
        version = "1.0.0",
        description = "OCR post-processing service: confidence filtering, bounding-box overlays and queued jobs.",
    ),
    paths(
        handlers::health::health_check,
        handlers::ocr::run_ocr,
        handlers::ocr::upload_image,
        handlers::jobs::create_job,
        handlers::jobs::get_job,
        handlers::results::list_results,
        handlers::results::get_result,
        handlers::results::get_result_image,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        response::CursorPagination,
        models::Language,
        models::Detection,
        models::Color,
        models::JobRequest,
        models::JobResult,
        models::JobResponse,
        models::ResultRow,
        models::ArtifactReport,
        dto::jobs::EnqueueJobResponse,
        dto::jobs::JobStatus,
        dto::jobs::JobStatusResponse,
        dto::results::ResultRecordResponse,
        dto::results::ListResultsResponse,
        handlers::health::HealthData,
        handlers::health::EngineStatus,
        handlers::health::DatabaseStatus,
        handlers::health::QueueStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "ocr", description = "Synchronous OCR jobs"),
        (name = "jobs", description = "Queued OCR jobs"),
        (name = "results", description = "Persisted OCR results"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
