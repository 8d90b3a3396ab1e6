use serde::{Deserialize, Serialize};

use super::detection::Quad;
use crate::error::{OcrGateError, Result};

/// Languages the OCR engine is asked to recognize.
///
/// Parsed case-insensitively from every transport (JSON, form fields, CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ch,
    #[default]
    En,
    Fr,
    German,
    Korean,
    Japan,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Ch,
        Language::En,
        Language::Fr,
        Language::German,
        Language::Korean,
        Language::Japan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ch => "ch",
            Self::En => "en",
            Self::Fr => "fr",
            Self::German => "german",
            Self::Korean => "korean",
            Self::Japan => "japan",
        }
    }

    /// Tesseract traineddata name for this language.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Self::Ch => "chi_sim",
            Self::En => "eng",
            Self::Fr => "fra",
            Self::German => "deu",
            Self::Korean => "kor",
            Self::Japan => "jpn",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unsupported language '{s}', supported: {}",
                    Language::ALL.map(|l| l.as_str()).join(", ")
                )
            })
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// An OCR job as received from a transport.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobRequest {
    /// Base64 image payload, optionally with a `data:image/...;base64,` prefix.
    pub image: String,
    #[serde(default)]
    pub lang: Language,
    /// Detections at or below this score are dropped. Defaults to the configured value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(
        default,
        alias = "destinationFolder",
        alias = "caminho_pasta",
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_folder: Option<String>,
    #[serde(default, alias = "nome_arquivo", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Include the space-joined text of all rows in the result.
    #[serde(default = "default_include_text", alias = "includeText")]
    pub include_text: bool,
}

fn default_include_text() -> bool {
    true
}

impl JobRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            lang: Language::default(),
            confidence: None,
            destination_folder: None,
            filename: None,
            include_text: true,
        }
    }

    /// Boundary validation; everything past this point trusts the request.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(OcrGateError::Validation("image is required".to_string()));
        }

        if let Some(confidence) = self.confidence {
            validate_confidence(confidence)?;
        }

        if let Some(ref folder) = self.destination_folder {
            if folder.trim().is_empty() {
                return Err(OcrGateError::Validation(
                    "destination_folder cannot be empty".to_string(),
                ));
            }
        }

        if let Some(ref filename) = self.filename {
            validate_filename(filename)?;
        }

        Ok(())
    }
}

pub fn validate_confidence(confidence: f64) -> Result<()> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(OcrGateError::Validation(format!(
            "confidence must be between 0 and 1, got {confidence}"
        )));
    }
    Ok(())
}

pub fn validate_filename(filename: &str) -> Result<()> {
    let trimmed = filename.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(OcrGateError::Validation(format!(
            "filename must be a plain file name, got '{filename}'"
        )));
    }
    Ok(())
}

/// Box column of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowBox {
    Points(Quad),
    /// Legacy form: the point list as a JSON-encoded string.
    Encoded(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResultRow {
    /// Point list `[[x, y], ...]`, or its JSON-encoded string in legacy mode.
    #[serde(rename = "box")]
    #[schema(value_type = Object)]
    pub bbox: RowBox,
    /// Confidence rounded to 3 decimals.
    pub score: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobResult {
    /// Overlay image, base64 PNG.
    pub overlay_image: String,
    pub rows: Vec<ResultRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

/// Outcome of best-effort artifact persistence for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ArtifactReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub saved_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ArtifactReport {
    pub fn is_empty(&self) -> bool {
        self.object_id.is_none() && self.saved_files.is_empty() && self.errors.is_empty()
    }
}

/// What a transport hands back for a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobResponse {
    #[serde(flatten)]
    pub result: JobResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactReport>,
}

/// Linear progression of a job through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Received,
    Decoded,
    Inferred,
    Filtered,
    Overlaid,
    Serialized,
    Delivered,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Decoded => write!(f, "decoded"),
            Self::Inferred => write!(f, "inferred"),
            Self::Filtered => write!(f, "filtered"),
            Self::Overlaid => write!(f, "overlaid"),
            Self::Serialized => write!(f, "serialized"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::detection::rect_quad;

    #[test]
    fn test_request_defaults() {
        let req: JobRequest = serde_json::from_str(r#"{"image": "aGk="}"#).unwrap();
        assert_eq!(req.lang, Language::En);
        assert!(req.confidence.is_none());
        assert!(req.destination_folder.is_none());
        assert!(req.filename.is_none());
        assert!(req.include_text);
    }

    #[test]
    fn test_request_legacy_aliases() {
        let req: JobRequest = serde_json::from_str(
            r#"{"image": "aGk=", "lang": "german", "confidence": 0.7,
                "caminho_pasta": "imagens", "nome_arquivo": "imagem.png"}"#,
        )
        .unwrap();
        assert_eq!(req.lang, Language::German);
        assert_eq!(req.confidence, Some(0.7));
        assert_eq!(req.destination_folder.as_deref(), Some("imagens"));
        assert_eq!(req.filename.as_deref(), Some("imagem.png"));
    }

    #[test]
    fn test_language_case_insensitive_like_form_fields() {
        let req: JobRequest =
            serde_json::from_str(r#"{"image": "aGk=", "lang": "EN"}"#).unwrap();
        assert_eq!(req.lang, Language::En);
        assert_eq!("EN".parse::<Language>().unwrap(), req.lang);
        assert_eq!(serde_json::to_value(Language::Korean).unwrap(), "korean");
    }

    #[test]
    fn test_unknown_language_rejected() {
        let result = serde_json::from_str::<JobRequest>(r#"{"image": "aGk=", "lang": "klingon"}"#);
        assert!(result.is_err());
        assert!("klingon".parse::<Language>().is_err());
        assert_eq!("Japan".parse::<Language>().unwrap(), Language::Japan);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(JobRequest::new("   ").validate().is_err());

        let mut req = JobRequest::new("aGk=");
        req.confidence = Some(1.5);
        assert!(req.validate().is_err());

        req.confidence = Some(f64::NAN);
        assert!(req.validate().is_err());

        req.confidence = Some(0.0);
        assert!(req.validate().is_ok());

        req.filename = Some("../etc/passwd".to_string());
        assert!(req.validate().is_err());

        req.filename = Some("scan.png".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_tesseract_codes() {
        assert_eq!(Language::Ch.tesseract_code(), "chi_sim");
        assert_eq!(Language::German.tesseract_code(), "deu");
        assert_eq!(Language::Japan.tesseract_code(), "jpn");
    }

    #[test]
    fn test_row_box_shapes() {
        let structured = ResultRow {
            bbox: RowBox::Points(rect_quad(0.0, 0.0, 2.0, 1.0)),
            score: 0.9,
            text: "a".to_string(),
        };
        let json = serde_json::to_value(&structured).unwrap();
        assert!(json["box"].is_array());

        let legacy = ResultRow {
            bbox: RowBox::Encoded("[[0.0, 0.0]]".to_string()),
            score: 0.9,
            text: "a".to_string(),
        };
        let json = serde_json::to_value(&legacy).unwrap();
        assert_eq!(json["box"], "[[0.0, 0.0]]");
    }

    #[test]
    fn test_response_flattens_result() {
        let response = JobResponse {
            result: JobResult {
                overlay_image: "abc".to_string(),
                rows: vec![],
                extracted_text: Some(String::new()),
            },
            artifacts: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["overlay_image"], "abc");
        assert_eq!(json["rows"], serde_json::json!([]));
        assert_eq!(json["extracted_text"], "");
        assert!(json.get("artifacts").is_none());
    }
}
