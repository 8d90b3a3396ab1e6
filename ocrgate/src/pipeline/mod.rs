//! OCR result post-processing.
//!
//! A job moves `Received -> Decoded -> Inferred -> Filtered -> Overlaid ->
//! Serialized`; the transport that delivers it records `Delivered`. A failure
//! at any stage ends the job with a single typed error and no partial result.

pub mod codec;
pub mod filter;
pub mod overlay;
pub mod serializer;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

pub use codec::{DecodeLimits, DecodedImage, Raster};
pub use filter::{filter_detections, ColorPolicy};
pub use overlay::draw_overlay;
pub use serializer::{BoxEncoding, SerializeOptions};

use crate::config::Config;
use crate::error::{OcrGateError, Result};
use crate::models::{JobRequest, JobResult, JobStage, Language};
use crate::ocr::OcrEngine;

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub default_confidence: f64,
    pub color_policy: ColorPolicy,
    pub box_encoding: BoxEncoding,
    pub data_uri: bool,
    pub limits: DecodeLimits,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_confidence: 0.5,
            color_policy: ColorPolicy::default(),
            box_encoding: BoxEncoding::Structured,
            data_uri: true,
            limits: DecodeLimits::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let box_encoding = if config.pipeline.legacy_box_strings {
            BoxEncoding::JsonString
        } else {
            BoxEncoding::Structured
        };

        Self {
            default_confidence: config.pipeline.default_confidence,
            color_policy: ColorPolicy::from_config(&config.pipeline),
            box_encoding,
            data_uri: config.pipeline.overlay_data_uri,
            limits: DecodeLimits {
                max_bytes: config.server.max_body_bytes,
                max_dimension: config.ocr.max_image_dimension,
            },
        }
    }
}

/// Per-job knobs a transport passes alongside the image.
#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    pub lang: Language,
    pub confidence: Option<f64>,
    pub include_text: bool,
}

impl From<&JobRequest> for JobOptions {
    fn from(request: &JobRequest) -> Self {
        Self {
            lang: request.lang,
            confidence: request.confidence,
            include_text: request.include_text,
        }
    }
}

/// A completed job, with the intermediate images kept for artifact persistence.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub result: JobResult,
    pub source: DecodedImage,
    pub overlay: Raster,
    pub lang: Language,
    pub threshold: f64,
}

#[derive(Clone)]
pub struct Pipeline {
    engine: Arc<dyn OcrEngine>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(engine: Arc<dyn OcrEngine>, settings: PipelineSettings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Runs a job whose image is a base64 payload.
    pub async fn run(&self, request: &JobRequest) -> Result<JobOutcome> {
        let job_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        log_stage(&job_id, JobStage::Received, started);

        let decoded = async {
            request.validate()?;
            let image = request.image.clone();
            let limits = self.settings.limits;
            blocking(move || codec::decode_base64(&image, &limits)).await
        }
        .await
        .inspect_err(|e| log_failure(&job_id, e))?;

        self.run_decoded(job_id, started, decoded, JobOptions::from(request))
            .await
    }

    /// Runs a job whose image arrived as raw file bytes.
    pub async fn run_bytes(&self, bytes: Vec<u8>, options: JobOptions) -> Result<JobOutcome> {
        let job_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        log_stage(&job_id, JobStage::Received, started);

        let decoded = async {
            if let Some(confidence) = options.confidence {
                crate::models::validate_confidence(confidence)?;
            }
            let limits = self.settings.limits;
            blocking(move || codec::decode_bytes(&bytes, &limits)).await
        }
        .await
        .inspect_err(|e| log_failure(&job_id, e))?;

        self.run_decoded(job_id, started, decoded, options).await
    }

    async fn run_decoded(
        &self,
        job_id: String,
        started: Instant,
        decoded: DecodedImage,
        options: JobOptions,
    ) -> Result<JobOutcome> {
        log_stage(&job_id, JobStage::Decoded, started);

        let detections = self
            .engine
            .infer(&decoded.raster, options.lang)
            .await
            .inspect_err(|e| log_failure(&job_id, e))?;
        log_stage(&job_id, JobStage::Inferred, started);

        let threshold = options
            .confidence
            .unwrap_or(self.settings.default_confidence);
        let policy = self.settings.color_policy;
        let serialize_options = SerializeOptions {
            box_encoding: self.settings.box_encoding,
            data_uri: self.settings.data_uri,
            include_text: options.include_text,
        };

        let total = detections.len();
        let raster = decoded.raster.clone();
        let id = job_id.clone();
        let (result, overlay) = blocking(move || {
            let kept = filter_detections(detections, threshold, policy);
            info!(job_id = %id, kept = kept.len(), total, threshold, "Detections filtered");
            log_stage(&id, JobStage::Filtered, started);

            let overlay = draw_overlay(&raster, &kept);
            log_stage(&id, JobStage::Overlaid, started);

            let result = serializer::serialize(&overlay, &kept, serialize_options)?;
            Ok((result, overlay))
        })
        .await
        .inspect_err(|e| log_failure(&job_id, e))?;
        log_stage(&job_id, JobStage::Serialized, started);

        Ok(JobOutcome {
            job_id,
            result,
            source: decoded,
            overlay,
            lang: options.lang,
            threshold,
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OcrGateError::Internal(format!("Pipeline task panicked: {e}")))?
}

/// Logs a stage transition for a job.
pub fn log_stage(job_id: &str, stage: JobStage, started: Instant) {
    info!(
        job_id,
        stage = %stage,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Job stage reached"
    );
}

fn log_failure(job_id: &str, error: &OcrGateError) {
    match error.terminal_state() {
        Some(state) => warn!(job_id, state = %state, error = %error, "Job failed"),
        None => warn!(job_id, error = %error, "Job aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{rect_quad, Color, Detection};
    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};

    struct FixedEngine(Vec<Detection>);

    #[async_trait]
    impl OcrEngine for FixedEngine {
        async fn infer(&self, _raster: &Raster, _language: Language) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl OcrEngine for FailingEngine {
        async fn infer(&self, _raster: &Raster, _language: Language) -> Result<Vec<Detection>> {
            Err(OcrGateError::Inference("engine crashed".to_string()))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn white(width: u32, height: u32) -> Raster {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn request_for(raster: &Raster) -> JobRequest {
        JobRequest::new(codec::encode_base64(raster, ImageFormat::Png).unwrap())
    }

    fn pipeline(detections: Vec<Detection>) -> Pipeline {
        Pipeline::new(Arc::new(FixedEngine(detections)), PipelineSettings::default())
    }

    #[tokio::test]
    async fn test_threshold_scenario_keeps_one_box() {
        let detections = vec![
            Detection::new(rect_quad(5.0, 5.0, 20.0, 10.0), "keep", 0.9),
            Detection::new(rect_quad(30.0, 20.0, 10.0, 10.0), "drop", 0.3),
        ];
        let source = white(64, 48);
        let outcome = pipeline(detections)
            .run(&request_for(&source))
            .await
            .unwrap();

        assert_eq!(outcome.result.rows.len(), 1);
        assert_eq!(outcome.result.rows[0].text, "keep");
        assert_eq!(outcome.result.rows[0].score, 0.9);
        assert_eq!(outcome.result.extracted_text.as_deref(), Some("keep"));
        assert_eq!(outcome.threshold, 0.5);

        assert_eq!(outcome.overlay.get_pixel(5, 5), &Color::GREEN.to_rgb());
        assert_eq!(outcome.overlay.get_pixel(30, 20), &Rgb([255, 255, 255]));
    }

    #[tokio::test]
    async fn test_empty_detections_scenario() {
        let source = white(10, 10);
        let outcome = pipeline(vec![]).run(&request_for(&source)).await.unwrap();

        assert!(outcome.result.rows.is_empty());
        assert_eq!(outcome.result.extracted_text.as_deref(), Some(""));
        assert_eq!(outcome.overlay, source);
    }

    #[tokio::test]
    async fn test_request_threshold_overrides_default() {
        let detections = vec![Detection::new(rect_quad(0.0, 0.0, 4.0, 4.0), "mid", 0.6)];
        let mut request = request_for(&white(8, 8));
        request.confidence = Some(0.7);

        let outcome = pipeline(detections).run(&request).await.unwrap();
        assert!(outcome.result.rows.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_base64_is_decode_failure() {
        let err = pipeline(vec![])
            .run(&JobRequest::new("@@@@"))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrGateError::Decode(_)));
    }

    #[tokio::test]
    async fn test_engine_error_is_inference_failure() {
        let pipeline = Pipeline::new(Arc::new(FailingEngine), PipelineSettings::default());
        let err = pipeline.run(&request_for(&white(4, 4))).await.unwrap_err();
        assert_eq!(
            err.terminal_state(),
            Some(crate::error::TerminalState::InferenceFailed)
        );
    }

    #[tokio::test]
    async fn test_run_bytes_rejects_bad_confidence() {
        let bytes = codec::encode(&white(4, 4), ImageFormat::Png).unwrap();
        let options = JobOptions {
            lang: Language::En,
            confidence: Some(2.0),
            include_text: true,
        };
        let err = pipeline(vec![]).run_bytes(bytes, options).await.unwrap_err();
        assert!(matches!(err, OcrGateError::Validation(_)));
    }
}
