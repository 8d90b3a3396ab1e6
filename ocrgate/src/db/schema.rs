use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Overlay images kept for later retrieval
        CREATE TABLE IF NOT EXISTS ocr_images (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Result metadata, one row per stored overlay
        CREATE TABLE IF NOT EXISTS ocr_results (
            object_id TEXT PRIMARY KEY,
            rows TEXT NOT NULL DEFAULT '[]',
            extracted_text TEXT NOT NULL DEFAULT '',
            lang TEXT NOT NULL,
            confidence REAL NOT NULL,
            source_sha256 TEXT NOT NULL,
            filename TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (object_id) REFERENCES ocr_images(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_ocr_results_sha256 ON ocr_results(source_sha256);

        -- Durable job queues
        CREATE TABLE IF NOT EXISTS queue_messages (
            id TEXT PRIMARY KEY,
            queue TEXT NOT NULL,
            body TEXT NOT NULL,
            correlation_id TEXT,
            status TEXT NOT NULL DEFAULT 'ready',
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            claimed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_queue_messages_queue_status ON queue_messages(queue, status);
        CREATE INDEX IF NOT EXISTS idx_queue_messages_correlation ON queue_messages(correlation_id);
        CREATE INDEX IF NOT EXISTS idx_queue_messages_queue_created ON queue_messages(queue, created_at);
        "#,
    )
    .await?;

    Ok(())
}
