use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{params, Connection};

use super::results::parse_timestamp;
use crate::error::Result;
use crate::models::{MessageStatus, QueueMessage};

pub struct QueueRepository;

const MESSAGE_COLUMNS: &str =
    "id, queue, body, correlation_id, status, attempts, created_at, claimed_at";

impl QueueRepository {
    pub async fn publish(
        conn: &Connection,
        queue: &str,
        body: &str,
        correlation_id: Option<&str>,
    ) -> Result<String> {
        let id = nanoid::nanoid!();
        conn.execute(
            r#"
            INSERT INTO queue_messages (id, queue, body, correlation_id, status, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, 'ready', 0, ?5)
            "#,
            params![
                id.clone(),
                queue,
                body,
                correlation_id.map(str::to_string),
                stamp(Utc::now()),
            ],
        )
        .await?;

        Ok(id)
    }

    /// Oldest ready message first, by insertion order.
    pub async fn claim(conn: &Connection, queue: &str) -> Result<Option<QueueMessage>> {
        let sql = format!(
            r#"
            UPDATE queue_messages
            SET status = 'in_flight', attempts = attempts + 1, claimed_at = ?2
            WHERE id = (
                SELECT id FROM queue_messages
                WHERE queue = ?1 AND status = 'ready'
                ORDER BY rowid
                LIMIT 1
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let mut rows = conn
            .query(&sql, params![queue, stamp(Utc::now())])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_message(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn ack(conn: &Connection, id: &str) -> Result<bool> {
        let affected = conn
            .execute("DELETE FROM queue_messages WHERE id = ?1", params![id])
            .await?;
        Ok(affected > 0)
    }

    /// Releases in-flight messages claimed at or before `claimed_before`.
    pub async fn requeue_in_flight(
        conn: &Connection,
        queue: &str,
        claimed_before: DateTime<Utc>,
    ) -> Result<u64> {
        let affected = conn
            .execute(
                "UPDATE queue_messages SET status = 'ready', claimed_at = NULL
                 WHERE queue = ?1 AND status = 'in_flight'
                   AND (claimed_at IS NULL OR claimed_at <= ?2)",
                params![queue, stamp(claimed_before)],
            )
            .await?;
        Ok(affected)
    }

    /// Deletes messages published at or before `created_before`.
    pub async fn purge(
        conn: &Connection,
        queue: &str,
        created_before: DateTime<Utc>,
    ) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM queue_messages WHERE queue = ?1 AND created_at <= ?2",
                params![queue, stamp(created_before)],
            )
            .await?;
        Ok(affected)
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<QueueMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM queue_messages WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_message(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn find_by_correlation(
        conn: &Connection,
        queue: &str,
        correlation_id: &str,
    ) -> Result<Option<QueueMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM queue_messages
             WHERE queue = ?1 AND correlation_id = ?2
             ORDER BY rowid DESC LIMIT 1"
        );
        let mut rows = conn.query(&sql, params![queue, correlation_id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_message(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn count_ready(conn: &Connection, queue: &str) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1 AND status = 'ready'",
                params![queue],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    fn row_to_message(row: &libsql::Row) -> Result<QueueMessage> {
        Ok(QueueMessage {
            id: row.get(0)?,
            queue: row.get(1)?,
            body: row.get(2)?,
            correlation_id: row.get(3)?,
            status: row
                .get::<String>(4)?
                .parse()
                .unwrap_or(MessageStatus::Ready),
            attempts: row.get::<i64>(5)?.max(0) as u32,
            created_at: parse_timestamp(&row.get::<String>(6)?),
            claimed_at: row
                .get::<Option<String>>(7)?
                .map(|ts| parse_timestamp(&ts)),
        })
    }
}

/// Fixed-width UTC timestamps, so SQL string comparison orders them.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
