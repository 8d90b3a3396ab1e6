use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Language, ResultRow};

/// Metadata record persisted next to a stored overlay image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub object_id: String,
    pub rows: Vec<ResultRow>,
    pub extracted_text: String,
    pub lang: Language,
    pub confidence: f64,
    /// SHA-256 of the decoded source image bytes, hex encoded.
    pub source_sha256: String,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Binary object stored for a result.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Page of records in creation order, newest first.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<ResultRecord>,
    pub next_cursor: Option<String>,
    pub total: u64,
}
