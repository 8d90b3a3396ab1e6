use image::ImageFormat;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{OcrGateError, Result};
use crate::models::{Detection, Language};
use crate::pipeline::{codec, Raster};

/// Client for an HTTP OCR sidecar.
///
/// `POST {base_url}/ocr` with `{"image", "lang"}` answers
/// `{"detections": [{"box", "text", "confidence"}]}`. No retries.
#[derive(Clone, Debug)]
pub struct RemoteOcrClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    name: String,
}

#[derive(Debug, Serialize)]
struct OcrServiceRequest<'a> {
    image: String,
    lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrServiceResponse {
    #[serde(default)]
    detections: Vec<Detection>,
}

impl RemoteOcrClient {
    pub fn new(config: &OcrConfig, name: &str) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| {
                OcrGateError::InferenceUnavailable(
                    "OCR_BASE_URL is required for remote OCR".to_string(),
                )
            })?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                OcrGateError::InferenceUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn recognize(&self, raster: &Raster, language: Language) -> Result<Vec<Detection>> {
        let request = OcrServiceRequest {
            image: codec::encode_base64(raster, ImageFormat::Png)?,
            lang: language.as_str(),
        };

        let mut builder = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| OcrGateError::Inference(format!("OCR service request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrGateError::Inference(format!(
                "OCR service returned {status}: {body}"
            )));
        }

        let parsed: OcrServiceResponse = resp.json().await.map_err(|e| {
            OcrGateError::Inference(format!("Failed to parse OCR service response: {e}"))
        })?;

        Ok(parsed.detections)
    }
}
