//! OCR engine collaborators.
//!
//! Detection and recognition are delegated to an external engine. The rest of
//! the crate only sees the [`OcrEngine`] trait, injected as `Arc<dyn OcrEngine>`.
//!
//! Backends are selected by `OCR_MODEL`:
//! - `local/tesseract`: Tesseract via leptess, one engine per language
//! - `remote/<name>`: an HTTP OCR sidecar at `OCR_BASE_URL`
//!
//! A backend that cannot be constructed degrades to an unavailable engine
//! instead of failing startup.

mod api;
mod provider;
mod tesseract;

use async_trait::async_trait;

pub use api::RemoteOcrClient;
pub use provider::OcrProvider;
pub use tesseract::parse_tsv;

use crate::error::Result;
use crate::models::{Detection, Language};
use crate::pipeline::Raster;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Runs detection and recognition. An empty list is a valid result.
    async fn infer(&self, raster: &Raster, language: Language) -> Result<Vec<Detection>>;

    fn is_available(&self) -> bool {
        true
    }

    /// Short human-readable backend name for logs and health output.
    fn describe(&self) -> String;
}
