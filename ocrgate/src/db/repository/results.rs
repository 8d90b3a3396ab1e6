use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use tracing::warn;

use crate::error::{OcrGateError, Result};
use crate::models::{Language, RecordPage, ResultRecord, StoredImage};

pub struct ResultRepository;

const RECORD_COLUMNS: &str =
    "object_id, rows, extracted_text, lang, confidence, source_sha256, filename, created_at";

impl ResultRepository {
    pub async fn create(conn: &Connection, image: &StoredImage, record: &ResultRecord) -> Result<()> {
        let tx = conn.transaction().await?;

        tx.execute(
            r#"
            INSERT INTO ocr_images (id, filename, content_type, data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                image.id.clone(),
                image.filename.clone(),
                image.content_type.clone(),
                image.data.clone(),
                image.created_at.to_rfc3339(),
            ],
        )
        .await?;

        tx.execute(
            r#"
            INSERT INTO ocr_results (
                object_id, rows, extracted_text, lang, confidence,
                source_sha256, filename, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.object_id.clone(),
                serde_json::to_string(&record.rows)?,
                record.extracted_text.clone(),
                record.lang.to_string(),
                record.confidence,
                record.source_sha256.clone(),
                record.filename.clone(),
                record.created_at.to_rfc3339(),
            ],
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, object_id: &str) -> Result<Option<ResultRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM ocr_results WHERE object_id = ?1");
        let mut rows = conn.query(&sql, params![object_id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_record(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_image(conn: &Connection, object_id: &str) -> Result<Option<StoredImage>> {
        let mut rows = conn
            .query(
                "SELECT id, filename, content_type, data, created_at FROM ocr_images WHERE id = ?1",
                params![object_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(StoredImage {
                id: row.get(0)?,
                filename: row.get(1)?,
                content_type: row.get(2)?,
                data: row.get(3)?,
                created_at: parse_timestamp(&row.get::<String>(4)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Keyset pagination on rowid, newest first. The cursor is the last rowid returned.
    pub async fn list(conn: &Connection, cursor: Option<&str>, limit: u32) -> Result<RecordPage> {
        let limit = limit.clamp(1, 100);
        let before = cursor
            .map(|c| {
                c.parse::<i64>()
                    .map_err(|_| OcrGateError::Validation(format!("Invalid cursor: {c}")))
            })
            .transpose()?;

        let sql = format!(
            "SELECT rowid, {RECORD_COLUMNS} FROM ocr_results
             WHERE ?1 IS NULL OR rowid < ?1
             ORDER BY rowid DESC LIMIT ?2"
        );
        let mut rows = conn
            .query(&sql, params![before, i64::from(limit) + 1])
            .await?;

        let mut records = Vec::new();
        let mut last_rowid = None;
        let mut has_more = false;
        while let Some(row) = rows.next().await? {
            if records.len() == limit as usize {
                has_more = true;
                break;
            }
            last_rowid = Some(row.get::<i64>(0)?);
            records.push(Self::row_to_record_at(&row, 1)?);
        }

        let mut count_rows = conn.query("SELECT COUNT(*) FROM ocr_results", ()).await?;
        let total = match count_rows.next().await? {
            Some(row) => row.get::<i64>(0)?.max(0) as u64,
            None => 0,
        };

        Ok(RecordPage {
            records,
            next_cursor: if has_more {
                last_rowid.map(|id| id.to_string())
            } else {
                None
            },
            total,
        })
    }

    fn row_to_record(row: &libsql::Row) -> Result<ResultRecord> {
        Self::row_to_record_at(row, 0)
    }

    fn row_to_record_at(row: &libsql::Row, offset: i32) -> Result<ResultRecord> {
        let object_id: String = row.get(offset)?;
        let rows = match serde_json::from_str(&row.get::<String>(offset + 1)?) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(object_id = %object_id, error = %e, "Stored rows are unreadable, returning none");
                Vec::new()
            }
        };
        let stored_lang = row.get::<String>(offset + 3)?;
        let lang = stored_lang.parse::<Language>().unwrap_or_else(|e| {
            warn!(object_id = %object_id, error = %e, "Stored language is unknown, using default");
            Language::default()
        });

        Ok(ResultRecord {
            object_id,
            rows,
            extracted_text: row.get(offset + 2)?,
            lang,
            confidence: row.get(offset + 4)?,
            source_sha256: row.get(offset + 5)?,
            filename: row.get(offset + 6)?,
            created_at: parse_timestamp(&row.get::<String>(offset + 7)?),
        })
    }
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
