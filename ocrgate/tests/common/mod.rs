#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::NamedTempFile;

use ocrgate::config::{Config, PipelineConfig, QueueConfig, StorageConfig};
use ocrgate::db::{Database, DatabaseBackend, LibSqlBackend};
use ocrgate::error::{OcrGateError, Result};
use ocrgate::models::{rect_quad, Detection, Language};
use ocrgate::ocr::OcrEngine;
use ocrgate::pipeline::Raster;

static INIT: Once = Once::new();

/// Initialize tracing once; honours `RUST_LOG`.
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Config pointing at a fresh temp-file database, with env-independent pipeline,
/// queue and storage sections. Keep the returned file alive for the test.
pub fn test_config() -> (Config, NamedTempFile) {
    let temp_file = NamedTempFile::new().expect("temp db file");
    let mut config = Config::default();
    config.server.api_keys = Vec::new();
    config.database.url = format!("file:{}", temp_file.path().display());
    config.database.auth_token = None;
    config.database.local_path = None;
    config.pipeline = PipelineConfig::default();
    config.queue = QueueConfig {
        poll_interval_ms: 10,
        ..QueueConfig::default()
    };
    config.storage = StorageConfig::default();
    (config, temp_file)
}

pub async fn backend(config: &Config) -> Arc<dyn DatabaseBackend> {
    let db = Database::new(&config.database).await.expect("database");
    Arc::new(LibSqlBackend::new(db))
}

/// Engine returning the same detections for every image, remembering the
/// languages it was asked for.
pub struct ScriptedEngine {
    detections: Vec<Detection>,
    pub languages: Mutex<Vec<Language>>,
}

impl ScriptedEngine {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            languages: Mutex::new(Vec::new()),
        }
    }

    /// One confident detection and one below the default threshold.
    pub fn two_boxes() -> Self {
        Self::new(vec![
            Detection::new(rect_quad(4.0, 4.0, 20.0, 8.0), "TOTAL 12.50", 0.9),
            Detection::new(rect_quad(4.0, 20.0, 20.0, 8.0), "smudge", 0.3),
        ])
    }
}

#[async_trait]
impl OcrEngine for ScriptedEngine {
    async fn infer(&self, _raster: &Raster, language: Language) -> Result<Vec<Detection>> {
        self.languages.lock().unwrap().push(language);
        Ok(self.detections.clone())
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Engine that always fails inference.
pub struct BrokenEngine;

#[async_trait]
impl OcrEngine for BrokenEngine {
    async fn infer(&self, _raster: &Raster, _language: Language) -> Result<Vec<Detection>> {
        Err(OcrGateError::Inference("model crashed".to_string()))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

pub fn white_raster() -> RgbImage {
    RgbImage::from_pixel(40, 32, Rgb([255, 255, 255]))
}

pub fn png_bytes() -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    white_raster()
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes())
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
