use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Language, ResultRecord, ResultRow};

/// A persisted OCR result, without its image.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecordResponse {
    pub object_id: String,
    pub rows: Vec<ResultRow>,
    pub extracted_text: String,
    pub lang: Language,
    /// Threshold the job was filtered with.
    pub confidence: f64,
    /// Hex SHA-256 of the decoded source image.
    pub source_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    /// Relative URL of the stored overlay PNG.
    pub image_url: String,
}

impl From<ResultRecord> for ResultRecordResponse {
    fn from(record: ResultRecord) -> Self {
        let image_url = format!("/api/v1/results/{}/image", record.object_id);
        Self {
            object_id: record.object_id,
            rows: record.rows,
            extracted_text: record.extracted_text,
            lang: record.lang,
            confidence: record.confidence,
            source_sha256: record.source_sha256,
            filename: record.filename,
            created_at: record.created_at,
            image_url,
        }
    }
}

/// Response body for `GET /v1/results`. Pagination lives in `meta`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListResultsResponse {
    pub results: Vec<ResultRecordResponse>,
}
