use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{QueueMessage, RecordPage, ResultRecord, StoredImage};

/// Persisted overlays and their metadata records.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores the image and its record together.
    async fn save_result(&self, image: &StoredImage, record: &ResultRecord) -> Result<()>;
    async fn get_result(&self, object_id: &str) -> Result<Option<ResultRecord>>;
    async fn get_result_image(&self, object_id: &str) -> Result<Option<StoredImage>>;
    /// Newest first. `cursor` is the `next_cursor` of the previous page.
    async fn list_results(&self, cursor: Option<&str>, limit: u32) -> Result<RecordPage>;
}

/// Named FIFO queues of JSON messages with claim/ack semantics.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends a message and returns its id.
    async fn publish(&self, queue: &str, body: &str, correlation_id: Option<&str>)
        -> Result<String>;

    /// Marks the oldest ready message in flight and returns it.
    async fn claim(&self, queue: &str) -> Result<Option<QueueMessage>>;

    /// Removes a claimed message. Returns false if it was already gone.
    async fn ack(&self, id: &str) -> Result<bool>;

    /// Puts in-flight messages claimed at or before `claimed_before` back to ready.
    async fn requeue_in_flight(&self, queue: &str, claimed_before: DateTime<Utc>)
        -> Result<u64>;

    /// Deletes messages published at or before `created_before`.
    async fn purge_messages(&self, queue: &str, created_before: DateTime<Utc>) -> Result<u64>;

    async fn get_message(&self, id: &str) -> Result<Option<QueueMessage>>;

    async fn find_by_correlation(
        &self,
        queue: &str,
        correlation_id: &str,
    ) -> Result<Option<QueueMessage>>;

    /// Messages waiting to be claimed.
    async fn queue_depth(&self, queue: &str) -> Result<u64>;
}

/// A complete database backend.
#[async_trait]
pub trait DatabaseBackend: ResultStore + QueueStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<()>;
}
