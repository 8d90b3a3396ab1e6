use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Query;

use crate::api::v1::dto::{ListResultsResponse, ResultRecordResponse};
use crate::api::v1::response::{ApiError, ApiResponse, CursorPagination, ErrorCode, ResponseMeta};
use crate::api::AppState;

/// `GET /api/v1/results`
///
/// Persisted results, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/results",
    tag = "results",
    operation_id = "results.list",
    params(CursorPagination),
    responses(
        (status = 200, description = "Page of result records", body = ListResultsResponse),
        (status = 400, description = "Invalid cursor", body = ApiError),
    )
)]
pub async fn list_results(
    State(state): State<AppState>,
    Query(pagination): Query<CursorPagination>,
) -> ApiResponse<ListResultsResponse> {
    let pagination = pagination.validate();

    match state
        .db
        .list_results(pagination.cursor.as_deref(), pagination.limit)
        .await
    {
        Ok(page) => {
            let meta = ResponseMeta {
                next_cursor: page.next_cursor,
                total: Some(page.total),
            };
            let results = page
                .records
                .into_iter()
                .map(ResultRecordResponse::from)
                .collect();
            ApiResponse::success_with_meta(ListResultsResponse { results }, meta)
        }
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/results/{objectId}`
#[utoipa::path(
    get,
    path = "/api/v1/results/{objectId}",
    tag = "results",
    operation_id = "results.get",
    params(("objectId" = String, Path, description = "Result object id")),
    responses(
        (status = 200, description = "Result record", body = ResultRecordResponse),
        (status = 404, description = "Unknown result", body = ApiError),
    )
)]
pub async fn get_result(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> ApiResponse<ResultRecordResponse> {
    match state.db.get_result(&object_id).await {
        Ok(Some(record)) => ApiResponse::success(record.into()),
        Ok(None) => ApiResponse::error(
            ErrorCode::NotFound,
            format!("Result {object_id} not found"),
        ),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/results/{objectId}/image`
///
/// Raw overlay image bytes; errors still use the JSON envelope.
#[utoipa::path(
    get,
    path = "/api/v1/results/{objectId}/image",
    tag = "results",
    operation_id = "results.image",
    params(("objectId" = String, Path, description = "Result object id")),
    responses(
        (status = 200, description = "Overlay image", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "Unknown result", body = ApiError),
    )
)]
pub async fn get_result_image(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
) -> Response {
    match state.db.get_result_image(&object_id).await {
        Ok(Some(image)) => {
            let disposition = format!("inline; filename=\"{}\"", image.filename);
            (
                [
                    (header::CONTENT_TYPE, image.content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                image.data,
            )
                .into_response()
        }
        Ok(None) => ApiResponse::<()>::error(
            ErrorCode::NotFound,
            format!("Result {object_id} not found"),
        )
        .into_response(),
        Err(e) => ApiResponse::<()>::from(e).into_response(),
    }
}
