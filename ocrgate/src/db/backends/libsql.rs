use crate::db::connection::Database;
use crate::db::repository::{QueueRepository, ResultRepository};
use crate::db::traits::{DatabaseBackend, QueueStore, ResultStore};
use crate::error::Result;
use crate::models::{QueueMessage, RecordPage, ResultRecord, StoredImage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResultStore for LibSqlBackend {
    async fn save_result(&self, image: &StoredImage, record: &ResultRecord) -> Result<()> {
        let conn = self.db.connect()?;
        ResultRepository::create(&conn, image, record).await
    }
    async fn get_result(&self, object_id: &str) -> Result<Option<ResultRecord>> {
        let conn = self.db.connect()?;
        ResultRepository::get_by_id(&conn, object_id).await
    }
    async fn get_result_image(&self, object_id: &str) -> Result<Option<StoredImage>> {
        let conn = self.db.connect()?;
        ResultRepository::get_image(&conn, object_id).await
    }
    async fn list_results(&self, cursor: Option<&str>, limit: u32) -> Result<RecordPage> {
        let conn = self.db.connect()?;
        ResultRepository::list(&conn, cursor, limit).await
    }
}

#[async_trait]
impl QueueStore for LibSqlBackend {
    async fn publish(
        &self,
        queue: &str,
        body: &str,
        correlation_id: Option<&str>,
    ) -> Result<String> {
        let conn = self.db.connect()?;
        QueueRepository::publish(&conn, queue, body, correlation_id).await
    }
    async fn claim(&self, queue: &str) -> Result<Option<QueueMessage>> {
        let conn = self.db.connect()?;
        QueueRepository::claim(&conn, queue).await
    }
    async fn ack(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        QueueRepository::ack(&conn, id).await
    }
    async fn requeue_in_flight(
        &self,
        queue: &str,
        claimed_before: DateTime<Utc>,
    ) -> Result<u64> {
        let conn = self.db.connect()?;
        QueueRepository::requeue_in_flight(&conn, queue, claimed_before).await
    }
    async fn purge_messages(&self, queue: &str, created_before: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect()?;
        QueueRepository::purge(&conn, queue, created_before).await
    }
    async fn get_message(&self, id: &str) -> Result<Option<QueueMessage>> {
        let conn = self.db.connect()?;
        QueueRepository::get_by_id(&conn, id).await
    }
    async fn find_by_correlation(
        &self,
        queue: &str,
        correlation_id: &str,
    ) -> Result<Option<QueueMessage>> {
        let conn = self.db.connect()?;
        QueueRepository::find_by_correlation(&conn, queue, correlation_id).await
    }
    async fn queue_depth(&self, queue: &str) -> Result<u64> {
        let conn = self.db.connect()?;
        QueueRepository::count_ready(&conn, queue).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}
