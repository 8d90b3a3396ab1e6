pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod response;
pub mod router;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::state::AppState;
    use crate::config::{Config, PipelineConfig, QueueConfig, StorageConfig};
    use crate::error::Result;
    use crate::models::{rect_quad, Detection, Language};
    use crate::ocr::{OcrEngine, OcrProvider};
    use crate::pipeline::{codec, Raster};

    struct FixedEngine;

    #[async_trait]
    impl OcrEngine for FixedEngine {
        async fn infer(&self, _raster: &Raster, _language: Language) -> Result<Vec<Detection>> {
            Ok(vec![
                Detection::new(rect_quad(2.0, 2.0, 10.0, 6.0), "kept", 0.9),
                Detection::new(rect_quad(4.0, 10.0, 8.0, 4.0), "dropped", 0.3),
            ])
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    async fn test_app(
        api_keys: Vec<String>,
        engine: Arc<dyn OcrEngine>,
    ) -> (axum::Router, NamedTempFile) {
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

        (create_router(AppState::new(config, db, engine)), temp_file)
    }

    fn png_base64() -> String {
        let raster = RgbImage::from_pixel(24, 20, Rgb([255, 255, 255]));
        codec::encode_base64(&raster, ImageFormat::Png).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn protected_route_requires_auth_when_keys_set() {
        let (app, _tmp) = test_app(vec!["test-key".to_string()], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": png_base64() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn health_is_public_and_reports_engine() {
        let (app, _tmp) = test_app(vec!["secret".to_string()], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["engine"]["backend"], "fixed");
        assert_eq!(json["data"]["database"]["status"], "ok");
        assert_eq!(json["data"]["queue"]["depth"], 0);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn health_is_degraded_without_engine() {
        let engine = Arc::new(OcrProvider::unavailable("not configured"));
        let (app, _tmp) = test_app(vec![], engine).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "degraded");
        assert_eq!(json["data"]["engine"]["status"], "unavailable");
    }

    #[tokio::test]
    async fn openapi_json_is_public_and_valid() {
        let (app, _tmp) = test_app(vec!["secret".to_string()], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"].as_str().expect("openapi version string");
        assert!(version.starts_with('3'), "got {version}");
    }

    #[tokio::test]
    async fn ocr_success_is_wrapped_in_envelope() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": png_base64(), "confidence": 0.5 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let rows = json["data"]["rows"].as_array().expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text"], "kept");
        assert_eq!(rows[0]["score"], 0.9);
        assert_eq!(json["data"]["extracted_text"], "kept");
        assert!(json["data"]["overlay_image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(json["data"].get("artifacts").is_none());
    }

    #[tokio::test]
    async fn ocr_undecodable_image_is_invalid_request() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": "this is not base64!" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn ocr_missing_image_field_is_invalid_request() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(post_json("/api/v1/ocr", serde_json::json!({ "lang": "en" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "Missing required field: image");
    }

    #[tokio::test]
    async fn ocr_without_engine_is_service_unavailable() {
        let engine = Arc::new(OcrProvider::unavailable("not configured"));
        let (app, _tmp) = test_app(vec![], engine).await;

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": png_base64() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "engine_unavailable");
    }

    #[tokio::test]
    async fn job_is_pending_until_consumed() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/jobs",
                serde_json::json!({ "image": png_base64() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        let job_id = json["data"]["jobId"].as_str().expect("jobId").to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/jobs/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["jobId"], job_id.as_str());
        assert_eq!(json["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn unknown_job_and_result_are_not_found() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        for uri in [
            "/api/v1/jobs/nope",
            "/api/v1/results/nope",
            "/api/v1/results/nope/image",
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let json = body_json(response).await;
            assert_eq!(json["error"]["code"], "not_found");
        }
    }

    #[tokio::test]
    async fn invalid_results_cursor_is_rejected() {
        let (app, _tmp) = test_app(vec![], Arc::new(FixedEngine)).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/results?cursor=abc&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }
}
