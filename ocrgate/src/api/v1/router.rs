use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let jobs = Router::new()
        .route("/", post(handlers::jobs::create_job))
        .route("/{jobId}", get(handlers::jobs::get_job));

    let results = Router::new()
        .route("/", get(handlers::results::list_results))
        .route("/{objectId}", get(handlers::results::get_result))
        .route("/{objectId}/image", get(handlers::results::get_result_image));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .route("/ocr", post(handlers::ocr::run_ocr))
        .route("/ocr:upload", post(handlers::ocr::upload_image))
        .nest("/jobs", jobs)
        .nest("/results", results)
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
