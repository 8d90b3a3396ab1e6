use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use image::ImageFormat;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::db::DatabaseBackend;
use crate::error::{OcrGateError, Result};
use crate::models::{ArtifactReport, JobRequest, ResultRecord, StoredImage};
use crate::pipeline::{codec, JobOutcome};

pub const DEFAULT_FILENAME: &str = "image.png";

/// Where a job asked its images to be written.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTarget {
    pub folder: Option<String>,
    pub filename: Option<String>,
}

impl From<&JobRequest> for ArtifactTarget {
    fn from(request: &JobRequest) -> Self {
        Self {
            folder: request.destination_folder.clone(),
            filename: request.filename.clone(),
        }
    }
}

/// Best-effort persistence of job images and result records.
///
/// Failures end up in [`ArtifactReport::errors`]; they never fail the job.
#[derive(Clone)]
pub struct ArtifactRecorder {
    db: Arc<dyn DatabaseBackend>,
    storage: StorageConfig,
}

impl ArtifactRecorder {
    pub fn new(db: Arc<dyn DatabaseBackend>, storage: StorageConfig) -> Self {
        Self { db, storage }
    }

    /// Returns `None` when nothing was requested.
    pub async fn record(
        &self,
        target: &ArtifactTarget,
        outcome: &JobOutcome,
    ) -> Option<ArtifactReport> {
        let mut report = ArtifactReport::default();
        let filename = target
            .filename
            .clone()
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let folder = target
            .folder
            .clone()
            .or_else(|| self.storage.default_folder.clone());

        if let Some(folder) = folder {
            match self.write_files(Path::new(&folder), &filename, outcome).await {
                Ok(saved) => report.saved_files = saved,
                Err(e) => {
                    warn!(job_id = %outcome.job_id, folder = %folder, error = %e, "Failed to save images");
                    report.errors.push(format!("filesystem: {e}"));
                }
            }
        }

        if self.storage.persist_results {
            match self.store_result(&filename, target, outcome).await {
                Ok(object_id) => report.object_id = Some(object_id),
                Err(e) => {
                    warn!(job_id = %outcome.job_id, error = %e, "Failed to persist result");
                    report.errors.push(format!("database: {e}"));
                }
            }
        }

        (!report.is_empty()).then_some(report)
    }

    async fn write_files(
        &self,
        folder: &Path,
        filename: &str,
        outcome: &JobOutcome,
    ) -> Result<Vec<String>> {
        let format = codec::format_for_filename(filename);
        let source = outcome.source.raster.clone();
        let overlay = outcome.overlay.clone();
        let (source_bytes, overlay_bytes) = tokio::task::spawn_blocking(move || {
            Ok::<_, OcrGateError>((
                codec::encode(&source, format)?,
                codec::encode(&overlay, format)?,
            ))
        })
        .await
        .map_err(|e| OcrGateError::Internal(format!("Encoding task panicked: {e}")))??;

        tokio::fs::create_dir_all(folder).await?;

        let original: PathBuf = folder.join(filename);
        let boxes: PathBuf = folder.join(format!("boxes_{filename}"));
        tokio::fs::write(&original, source_bytes).await?;
        tokio::fs::write(&boxes, overlay_bytes).await?;

        debug!(job_id = %outcome.job_id, path = %boxes.display(), "Saved overlay image");
        Ok(vec![
            original.display().to_string(),
            boxes.display().to_string(),
        ])
    }

    async fn store_result(
        &self,
        filename: &str,
        target: &ArtifactTarget,
        outcome: &JobOutcome,
    ) -> Result<String> {
        let overlay = outcome.overlay.clone();
        let data = tokio::task::spawn_blocking(move || codec::encode(&overlay, ImageFormat::Png))
            .await
            .map_err(|e| OcrGateError::Internal(format!("Encoding task panicked: {e}")))??;

        let object_id = nanoid::nanoid!();
        let now = Utc::now();
        let rows = outcome.result.rows.clone();
        let extracted_text = rows
            .iter()
            .map(|row| row.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let image = StoredImage {
            id: object_id.clone(),
            filename: format!("boxes_{filename}"),
            content_type: ImageFormat::Png.to_mime_type().to_string(),
            data,
            created_at: now,
        };
        let record = ResultRecord {
            object_id: object_id.clone(),
            rows,
            extracted_text,
            lang: outcome.lang,
            confidence: outcome.threshold,
            source_sha256: outcome.source.source_sha256.clone(),
            filename: target.filename.clone(),
            created_at: now,
        };

        self.db.save_result(&image, &record).await?;
        debug!(job_id = %outcome.job_id, object_id = %object_id, "Stored result record");
        Ok(object_id)
    }
}
