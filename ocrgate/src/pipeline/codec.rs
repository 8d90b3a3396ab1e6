//! Transport encodings of images: base64 (with or without a data URI prefix)
//! and raw file bytes on the way in, PNG on the way out.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageFormat, ImageReader, RgbImage};
use sha2::{Digest, Sha256};

use crate::error::{OcrGateError, Result};

/// In-memory raster every pipeline stage works on.
pub type Raster = RgbImage;

/// Size limits applied while decoding untrusted payloads.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            max_dimension: 8192,
        }
    }
}

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub raster: Raster,
    /// Format the payload was encoded in.
    pub format: ImageFormat,
    /// Hex SHA-256 of the encoded payload.
    pub source_sha256: String,
}

/// Removes a leading `data:image/...;base64,` prefix.
pub fn strip_data_uri(input: &str) -> &str {
    let trimmed = input.trim();
    if trimmed.starts_with("data:image") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

/// Pads with `=` up to a multiple of 4 and drops embedded whitespace.
pub fn normalize_base64(payload: &str) -> String {
    let mut normalized: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let missing = normalized.len() % 4;
    if missing != 0 {
        normalized.extend(std::iter::repeat('=').take(4 - missing));
    }
    normalized
}

pub fn decode_base64(input: &str, limits: &DecodeLimits) -> Result<DecodedImage> {
    let payload = normalize_base64(strip_data_uri(input));
    if payload.is_empty() {
        return Err(OcrGateError::Decode("image payload is empty".to_string()));
    }

    // Base64 inflates by 4/3, so reject obviously oversized input before decoding.
    if payload.len() / 4 * 3 > limits.max_bytes.saturating_add(3) {
        return Err(too_large(payload.len() / 4 * 3, limits.max_bytes));
    }

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| OcrGateError::Decode(format!("Invalid base64 payload: {e}")))?;

    decode_bytes(&bytes, limits)
}

pub fn decode_bytes(bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(OcrGateError::Decode("image payload is empty".to_string()));
    }
    if bytes.len() > limits.max_bytes {
        return Err(too_large(bytes.len(), limits.max_bytes));
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(OcrGateError::Decode(format!(
                "payload is {}, not an image",
                kind.mime_type()
            )));
        }
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrGateError::Decode(format!("Failed to read image: {e}")))?;

    let format = reader.format().ok_or_else(|| {
        OcrGateError::Decode(
            "Cannot identify image file. Please check the input format.".to_string(),
        )
    })?;

    let img = reader
        .decode()
        .map_err(|e| OcrGateError::Decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(OcrGateError::Decode("image has no pixels".to_string()));
    }
    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(OcrGateError::Decode(format!(
            "Image too large: {width}x{height}, maximum {0}x{0}",
            limits.max_dimension
        )));
    }

    let digest = Sha256::digest(bytes);

    Ok(DecodedImage {
        raster: img.to_rgb8(),
        format,
        source_sha256: format!("{digest:x}"),
    })
}

fn too_large(size: usize, max: usize) -> OcrGateError {
    OcrGateError::Decode(format!(
        "Image payload too large: {size} bytes (max: {max} bytes)"
    ))
}

pub fn encode(raster: &Raster, format: ImageFormat) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut output), format)
        .map_err(|e| OcrGateError::Internal(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

pub fn encode_base64(raster: &Raster, format: ImageFormat) -> Result<String> {
    Ok(STANDARD.encode(encode(raster, format)?))
}

pub fn to_data_uri(base64_payload: &str, format: ImageFormat) -> String {
    format!("data:{};base64,{base64_payload}", format.to_mime_type())
}

/// Output format for a file name, PNG when the extension is unknown.
pub fn format_for_filename(filename: &str) -> ImageFormat {
    ImageFormat::from_path(filename).unwrap_or(ImageFormat::Png)
}
