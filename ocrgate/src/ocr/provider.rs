use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::api::RemoteOcrClient;
use super::tesseract::TesseractPool;
use super::OcrEngine;
use crate::config::{parse_ocr_model, OcrConfig};
use crate::error::{OcrGateError, Result};
use crate::models::{Detection, Language};
use crate::pipeline::Raster;

enum OcrBackend {
    Local { tesseract: TesseractPool },
    Remote { client: RemoteOcrClient },
    Unavailable { reason: String },
}

/// The configured OCR engine, with a timeout around every call.
pub struct OcrProvider {
    backend: OcrBackend,
    timeout_secs: u64,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let (provider, model) = parse_ocr_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "local" if model.eq_ignore_ascii_case("tesseract") => {
                match TesseractPool::new(config.tessdata_path.clone()) {
                    Ok(tesseract) => {
                        info!("Tesseract OCR initialized");
                        OcrBackend::Local { tesseract }
                    }
                    Err(e) => unavailable(format!("Tesseract not available: {e}")),
                }
            }
            "remote" => match RemoteOcrClient::new(config, model) {
                Ok(client) => {
                    info!(name = model, "Remote OCR backend initialized");
                    OcrBackend::Remote { client }
                }
                Err(e) => unavailable(format!("Remote OCR backend unavailable: {e}")),
            },
            _ => unavailable(format!("Unknown OCR model '{}'", config.model)),
        };

        Self {
            backend,
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
            timeout_secs: 0,
        }
    }

    async fn infer_internal(&self, raster: &Raster, language: Language) -> Result<Vec<Detection>> {
        match &self.backend {
            OcrBackend::Local { tesseract } => tesseract.recognize(raster, language).await,
            OcrBackend::Remote { client } => client.recognize(raster, language).await,
            OcrBackend::Unavailable { reason } => {
                Err(OcrGateError::InferenceUnavailable(reason.clone()))
            }
        }
    }
}

fn unavailable(reason: String) -> OcrBackend {
    warn!("{}", reason);
    OcrBackend::Unavailable { reason }
}

#[async_trait]
impl OcrEngine for OcrProvider {
    async fn infer(&self, raster: &Raster, language: Language) -> Result<Vec<Detection>> {
        let timeout_duration = Duration::from_secs(self.timeout_secs);
        if matches!(self.backend, OcrBackend::Unavailable { .. }) {
            return self.infer_internal(raster, language).await;
        }

        match tokio::time::timeout(timeout_duration, self.infer_internal(raster, language)).await {
            Ok(inner_result) => inner_result,
            Err(_) => Err(OcrGateError::Inference(format!(
                "OCR operation timed out after {} seconds",
                self.timeout_secs
            ))),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    fn describe(&self) -> String {
        match &self.backend {
            OcrBackend::Local { .. } => "local/tesseract".to_string(),
            OcrBackend::Remote { client } => format!("remote/{}", client.name()),
            OcrBackend::Unavailable { reason } => format!("unavailable ({reason})"),
        }
    }
}
