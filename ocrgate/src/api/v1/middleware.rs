//! Bearer-token authentication for protected routes.
//!
//! With `OCRGATE_API_KEYS` unset every request passes. Once keys are
//! configured a request must carry `Authorization: Bearer <key>` with one of
//! them. v1 rejections use the error envelope; unversioned routes get the
//! legacy `{"error", "code"}` body.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::state::AppState;

use super::response::{ApiResponse, ErrorCode};

/// Checks the bearer token against the configured keys. `Err` carries the
/// client-facing rejection message.
pub(crate) fn authorize(keys: &[String], request: &Request<Body>) -> Result<(), &'static str> {
    if keys.is_empty() {
        return Ok(());
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) => h
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or("Invalid authorization header format. Expected: Bearer <token>")?,
        None => return Err("Missing authorization header"),
    };

    if keys.iter().any(|key| key == token) {
        Ok(())
    } else {
        tracing::debug!("Rejected request with unknown API key");
        Err("Invalid API key")
    }
}

pub async fn v1_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(&state.config.server.api_keys, &request) {
        Ok(()) => next.run(request).await,
        Err(message) => ApiResponse::<()>::error(ErrorCode::Unauthorized, message).into_response(),
    }
}

/// Same check for the unversioned routes, answering `{"error", "code"}`.
pub async fn legacy_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(&state.config.server.api_keys, &request) {
        Ok(()) => next.run(request).await,
        Err(message) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": message, "code": StatusCode::UNAUTHORIZED.as_u16() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::AppState;
    use crate::config::{Config, PipelineConfig, QueueConfig, StorageConfig};
    use crate::ocr::OcrProvider;
    use axum::{middleware, routing::get, Router};
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    async fn build_test_app(api_keys: Vec<String>) -> (Router, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.server.api_keys = api_keys;
        config.database.url = format!("file:{}", temp_file.path().display());
        config.database.auth_token = None;
        config.database.local_path = None;
        config.pipeline = PipelineConfig::default();
        config.queue = QueueConfig::default();
        config.storage = StorageConfig::default();

        let raw_db = crate::db::Database::new(&config.database).await.unwrap();
        let db: Arc<dyn crate::db::DatabaseBackend> =
            Arc::new(crate::db::LibSqlBackend::new(raw_db));
        let engine = Arc::new(OcrProvider::unavailable("tests"));
        let state = AppState::new(config, db, engine);

        async fn protected_handler() -> &'static str {
            "protected"
        }

        async fn health_handler() -> &'static str {
            "healthy"
        }

        let public_routes = Router::new().route("/health", get(health_handler));
        let protected_routes = Router::new()
            .route("/protected", get(protected_handler))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                v1_auth_middleware,
            ));

        let app = Router::new()
            .merge(public_routes)
            .merge(protected_routes)
            .with_state(state);
        (app, temp_file)
    }

    async fn parse_error_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/protected");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_open_access_without_configured_keys() {
        let (app, _tmp) = build_test_app(vec![]).await;
        let response = app.oneshot(get_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_allows_valid_key() {
        let (app, _tmp) = build_test_app(vec!["k1".to_string(), "k2".to_string()]).await;
        let response = app.oneshot(get_request(Some("Bearer k2"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let (app, _tmp) = build_test_app(vec!["k1".to_string()]).await;
        let response = app
            .oneshot(get_request(Some("Bearer wrong")))
            .await
            .unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
        assert_eq!(json["error"]["message"], "Invalid API key");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_rejects_missing_and_malformed_header() {
        let (app, _tmp) = build_test_app(vec!["k1".to_string()]).await;

        let response = app.clone().oneshot(get_request(None)).await.unwrap();
        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Missing authorization header");

        let response = app.oneshot(get_request(Some("Basic k1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_bypasses_auth() {
        let (app, _tmp) = build_test_app(vec!["secret".to_string()]).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
