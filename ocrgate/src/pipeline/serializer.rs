use image::ImageFormat;

use super::codec::{self, Raster};
use crate::error::Result;
use crate::models::{FilteredDetection, JobResult, Quad, ResultRow, RowBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxEncoding {
    /// `[[x, y], ...]` as a JSON array.
    #[default]
    Structured,
    /// The same point list as a JSON-encoded string.
    JsonString,
}

#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub box_encoding: BoxEncoding,
    pub data_uri: bool,
    pub include_text: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            box_encoding: BoxEncoding::Structured,
            data_uri: true,
            include_text: true,
        }
    }
}

/// Rounds half away from zero to 3 decimals.
pub fn round_score(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 1000.0
}

/// Point list rendered like Python's `json.dumps`: `[[x, y], [x, y], ...]`.
pub fn legacy_box_string(quad: &Quad) -> String {
    let points: Vec<String> = quad
        .iter()
        .map(|p| format!("[{}, {}]", json_number(p.x), json_number(p.y)))
        .collect();
    format!("[{}]", points.join(", "))
}

fn json_number(value: f64) -> String {
    serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
}

pub fn build_rows(detections: &[FilteredDetection], encoding: BoxEncoding) -> Vec<ResultRow> {
    detections
        .iter()
        .map(|item| {
            let det = &item.detection;
            let bbox = match encoding {
                BoxEncoding::Structured => RowBox::Points(det.bbox),
                BoxEncoding::JsonString => RowBox::Encoded(legacy_box_string(&det.bbox)),
            };
            ResultRow {
                bbox,
                score: round_score(det.confidence),
                text: det.text.clone(),
            }
        })
        .collect()
}

pub fn extracted_text(detections: &[FilteredDetection]) -> String {
    detections
        .iter()
        .map(|item| item.detection.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn serialize(
    overlay: &Raster,
    detections: &[FilteredDetection],
    options: SerializeOptions,
) -> Result<JobResult> {
    let encoded = codec::encode_base64(overlay, ImageFormat::Png)?;
    let overlay_image = if options.data_uri {
        codec::to_data_uri(&encoded, ImageFormat::Png)
    } else {
        encoded
    };

    Ok(JobResult {
        overlay_image,
        rows: build_rows(detections, options.box_encoding),
        extracted_text: options.include_text.then(|| extracted_text(detections)),
    })
}
