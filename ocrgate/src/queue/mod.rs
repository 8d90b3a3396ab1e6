//! Queue transport: jobs arrive on the input queue and replies, correlated by
//! the input message id, go to the response queue.

mod consumer;

pub use consumer::QueueConsumer;

use crate::config::QueueConfig;
use crate::db::QueueStore;
use crate::error::Result;
use crate::models::JobRequest;

/// Publishes a job on the input queue and returns its job id.
pub async fn enqueue<S: QueueStore + ?Sized>(
    store: &S,
    config: &QueueConfig,
    request: &JobRequest,
) -> Result<String> {
    request.validate()?;
    let body = serde_json::to_string(request)?;
    let job_id = store.publish(&config.input_queue, &body, None).await?;
    tracing::info!(job_id = %job_id, queue = %config.input_queue, "Job enqueued");
    Ok(job_id)
}
