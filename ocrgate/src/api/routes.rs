use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::extractors::AppJson;
use super::v1;
use super::v1::middleware::legacy_auth_middleware;
use super::AppState;
use crate::error::Result;
use crate::models::{JobRequest, JobResponse};
use crate::services::ArtifactTarget;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = v1::router::v1_router(state.clone());
    let max_body_bytes = state.config.server.max_body_bytes;

    let legacy = Router::new()
        .route("/process_image", post(process_image))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            legacy_auth_middleware,
        ));

    Router::new()
        .merge(legacy)
        .nest("/api/v1", v1)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /process_image`
///
/// Unversioned endpoint kept for existing clients. Returns the bare job
/// response on success and `{"error", "code"}` on failure.
async fn process_image(
    State(state): State<AppState>,
    AppJson(request): AppJson<JobRequest>,
) -> Result<Json<JobResponse>> {
    let outcome = state.pipeline.run(&request).await?;
    let artifacts = state
        .artifacts
        .record(&ArtifactTarget::from(&request), &outcome)
        .await;

    Ok(Json(JobResponse {
        result: outcome.result,
        artifacts,
    }))
}
