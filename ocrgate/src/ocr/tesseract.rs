use std::collections::HashMap;
use std::sync::Arc;

use image::ImageFormat;
use leptess::LepTess;
use tokio::sync::Mutex;

use crate::error::{OcrGateError, Result};
use crate::models::{rect_quad, Detection, Language};
use crate::pipeline::{codec, Raster};

/// Tesseract engines keyed by language, created on first use.
pub struct TesseractPool {
    tessdata_path: Option<String>,
    engines: Mutex<HashMap<Language, Arc<Mutex<LepTess>>>>,
}

fn create_tesseract(
    tessdata_path: Option<&str>,
    language: Language,
) -> std::result::Result<LepTess, String> {
    LepTess::new(tessdata_path, language.tesseract_code()).map_err(|e| e.to_string())
}

impl TesseractPool {
    /// Loads the default language eagerly so a missing installation is detected at startup.
    pub fn new(tessdata_path: Option<String>) -> std::result::Result<Self, String> {
        let default = create_tesseract(tessdata_path.as_deref(), Language::default())?;
        let mut engines = HashMap::new();
        engines.insert(Language::default(), Arc::new(Mutex::new(default)));

        Ok(Self {
            tessdata_path,
            engines: Mutex::new(engines),
        })
    }

    async fn engine_for(&self, language: Language) -> Result<Arc<Mutex<LepTess>>> {
        let mut engines = self.engines.lock().await;
        if let Some(engine) = engines.get(&language) {
            return Ok(Arc::clone(engine));
        }

        let engine = create_tesseract(self.tessdata_path.as_deref(), language).map_err(|e| {
            OcrGateError::Inference(format!(
                "Tesseract model '{}' not available: {e}",
                language.tesseract_code()
            ))
        })?;
        tracing::info!(language = %language, "Loaded Tesseract model");

        let engine = Arc::new(Mutex::new(engine));
        engines.insert(language, Arc::clone(&engine));
        Ok(engine)
    }

    pub async fn recognize(&self, raster: &Raster, language: Language) -> Result<Vec<Detection>> {
        let engine = self.engine_for(language).await?;
        let raster = raster.clone();

        let tsv = tokio::task::spawn_blocking(move || {
            let png = codec::encode(&raster, ImageFormat::Png)?;
            let mut lt = engine.blocking_lock();
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrGateError::Inference(format!("Failed to set image: {e}")))?;
            lt.get_tsv_text(0)
                .map_err(|e| OcrGateError::Inference(format!("Failed to extract text: {e}")))
        })
        .await
        .map_err(|e| OcrGateError::Inference(format!("OCR task panicked: {e}")))??;

        Ok(parse_tsv(&tsv))
    }
}

struct LineAccumulator {
    key: (u32, u32, u32, u32),
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    words: Vec<String>,
    conf_sum: f64,
}

impl LineAccumulator {
    fn finish(self) -> Detection {
        let confidence = (self.conf_sum / self.words.len() as f64 / 100.0).clamp(0.0, 1.0);
        Detection::new(
            rect_quad(
                self.left,
                self.top,
                self.right - self.left,
                self.bottom - self.top,
            ),
            self.words.join(" "),
            confidence,
        )
    }
}

/// Groups Tesseract word rows into one detection per text line.
///
/// Columns: level, page, block, par, line, word, left, top, width, height, conf, text.
/// Only level 5 (word) rows with a non-negative confidence and non-blank text count.
pub fn parse_tsv(tsv: &str) -> Vec<Detection> {
    let mut detections = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for line in tsv.lines() {
        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let ids: Option<Vec<u32>> = cols[1..5].iter().map(|c| c.parse().ok()).collect();
        let geometry: Option<Vec<f64>> = cols[6..11].iter().map(|c| c.parse().ok()).collect();
        let (Some(ids), Some(geometry)) = (ids, geometry) else {
            continue;
        };

        let text = cols[11].trim();
        let conf = geometry[4];
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (ids[0], ids[1], ids[2], ids[3]);
        let (left, top, width, height) = (geometry[0], geometry[1], geometry[2], geometry[3]);

        match current.as_mut() {
            Some(acc) if acc.key == key => {
                acc.left = acc.left.min(left);
                acc.top = acc.top.min(top);
                acc.right = acc.right.max(left + width);
                acc.bottom = acc.bottom.max(top + height);
                acc.words.push(text.to_string());
                acc.conf_sum += conf;
            }
            _ => {
                if let Some(done) = current.take() {
                    detections.push(done.finish());
                }
                current = Some(LineAccumulator {
                    key,
                    left,
                    top,
                    right: left + width,
                    bottom: top + height,
                    words: vec![text.to_string()],
                    conf_sum: conf,
                });
            }
        }
    }

    if let Some(done) = current {
        detections.push(done.finish());
    }
    detections
}
