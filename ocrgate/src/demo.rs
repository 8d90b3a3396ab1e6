//! Interactive demo: run local image files through the pipeline, write the
//! overlays next to each other and print a result table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use tracing::{info, warn};

use crate::error::{OcrGateError, Result};
use crate::models::{Language, ResultRow, RowBox};
use crate::ocr::OcrEngine;
use crate::pipeline::{codec, BoxEncoding, ColorPolicy, JobOptions, Pipeline, PipelineSettings};

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub images: Vec<PathBuf>,
    pub lang: Language,
    pub confidence: Option<f64>,
    pub output_dir: PathBuf,
}

/// One processed demo image.
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub source: PathBuf,
    pub overlay_path: PathBuf,
    pub rows: Vec<ResultRow>,
}

/// Demo settings: random colors per box and legacy string-encoded boxes.
pub fn demo_settings(base: PipelineSettings) -> PipelineSettings {
    PipelineSettings {
        color_policy: ColorPolicy::RandomPerDetection,
        box_encoding: BoxEncoding::JsonString,
        ..base
    }
}

pub fn overlay_path(output_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{stem}_ocr.png"))
}

/// Processes every image in order. A failing image is logged and skipped;
/// the error of the last failure is returned if no image succeeded.
pub async fn run(
    options: &DemoOptions,
    engine: Arc<dyn OcrEngine>,
    base: PipelineSettings,
) -> Result<Vec<DemoReport>> {
    let pipeline = Pipeline::new(engine, demo_settings(base));
    tokio::fs::create_dir_all(&options.output_dir).await?;

    let job_options = JobOptions {
        lang: options.lang,
        confidence: options.confidence,
        include_text: false,
    };

    let mut reports = Vec::with_capacity(options.images.len());
    let mut last_error = None;

    for source in &options.images {
        match process_one(&pipeline, source, &options.output_dir, job_options).await {
            Ok(report) => {
                info!(
                    source = %report.source.display(),
                    overlay = %report.overlay_path.display(),
                    rows = report.rows.len(),
                    "Demo image processed"
                );
                reports.push(report);
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Demo image failed");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if reports.is_empty() => Err(e),
        _ => Ok(reports),
    }
}

async fn process_one(
    pipeline: &Pipeline,
    source: &Path,
    output_dir: &Path,
    options: JobOptions,
) -> Result<DemoReport> {
    let bytes = tokio::fs::read(source).await?;
    let outcome = pipeline.run_bytes(bytes, options).await?;

    let overlay = outcome.overlay;
    let png = tokio::task::spawn_blocking(move || codec::encode(&overlay, ImageFormat::Png))
        .await
        .map_err(|e| OcrGateError::Internal(format!("Encoding task panicked: {e}")))??;

    let overlay_path = overlay_path(output_dir, source);
    tokio::fs::write(&overlay_path, png).await?;

    Ok(DemoReport {
        source: source.to_path_buf(),
        overlay_path,
        rows: outcome.result.rows,
    })
}

/// Renders rows as a `bbox | score | text` table.
pub fn render_table(rows: &[ResultRow]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|row| {
            let bbox = match &row.bbox {
                RowBox::Encoded(s) => s.clone(),
                RowBox::Points(quad) => serde_json::to_string(quad).unwrap_or_default(),
            };
            [bbox, format!("{:.3}", row.score), row.text.clone()]
        })
        .collect();

    let header = ["bbox", "score", "text"];
    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cols: [&str; 3]| {
        format!(
            "{:<w0$} | {:<w1$} | {}",
            cols[0],
            cols[1],
            cols[2],
            w0 = widths[0],
            w1 = widths[1]
        )
        .trim_end()
        .to_string()
    };

    let mut out = vec![
        line(header),
        format!(
            "{}-+-{}-+-{}",
            "-".repeat(widths[0]),
            "-".repeat(widths[1]),
            "-".repeat(widths[2])
        ),
    ];
    out.extend(
        cells
            .iter()
            .map(|c| line([c[0].as_str(), c[1].as_str(), c[2].as_str()])),
    );
    out.join("\n")
}
