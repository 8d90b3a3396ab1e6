use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{AckMode, QueueConfig};
use crate::db::DatabaseBackend;
use crate::error::{OcrGateError, Result, TerminalState};
use crate::models::{JobReply, JobRequest, JobResponse, JobStage, QueueMessage};
use crate::pipeline::{log_stage, Pipeline};
use crate::services::{ArtifactRecorder, ArtifactTarget};

/// Pulls jobs from the input queue and publishes one reply per job.
#[derive(Clone)]
pub struct QueueConsumer {
    db: Arc<dyn DatabaseBackend>,
    pipeline: Pipeline,
    artifacts: ArtifactRecorder,
    config: QueueConfig,
}

impl QueueConsumer {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        pipeline: Pipeline,
        artifacts: ArtifactRecorder,
        config: QueueConfig,
    ) -> Self {
        Self {
            db,
            pipeline,
            artifacts,
            config,
        }
    }

    /// Returns messages claimed longer ago than the visibility timeout to the queue.
    ///
    /// Claims younger than the timeout belong to a consumer that may still be
    /// working on them and are left alone.
    pub async fn recover(&self) -> Result<u64> {
        let cutoff = cutoff(self.config.visibility_timeout_secs);
        let recovered = self
            .db
            .requeue_in_flight(&self.config.input_queue, cutoff)
            .await?;
        if recovered > 0 {
            info!(
                queue = %self.config.input_queue,
                recovered, "Re-queued stale in-flight messages"
            );
        }
        Ok(recovered)
    }

    /// Deletes replies older than the retention period from the response queue.
    pub async fn purge_replies(&self) -> Result<u64> {
        let cutoff = cutoff(self.config.reply_retention_secs);
        let purged = self
            .db
            .purge_messages(&self.config.response_queue, cutoff)
            .await?;
        if purged > 0 {
            debug!(queue = %self.config.response_queue, purged, "Purged expired replies");
        }
        Ok(purged)
    }

    /// Stale-claim recovery plus reply retention. Runs at startup and then
    /// periodically from [`run`](Self::run).
    pub async fn sweep(&self) -> Result<()> {
        self.recover().await?;
        self.purge_replies().await?;
        Ok(())
    }

    /// Consumes until cancelled. The job in progress is finished before returning.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        self.sweep().await?;
        info!(
            input = %self.config.input_queue,
            response = %self.config.response_queue,
            ack_mode = ?self.config.ack_mode,
            "Queue consumer started"
        );

        let idle = Duration::from_millis(self.config.poll_interval_ms);
        let sweep_every = Duration::from_secs(self.config.visibility_timeout_secs.max(1));
        let mut last_sweep = Instant::now();
        loop {
            if token.is_cancelled() {
                break;
            }

            if last_sweep.elapsed() >= sweep_every {
                if let Err(e) = self.sweep().await {
                    error!("Queue sweep failed: {}", e);
                }
                last_sweep = Instant::now();
            }

            let processed = match self.run_once().await {
                Ok(processed) => processed,
                Err(e) => {
                    error!("Queue consumer error: {}", e);
                    false
                }
            };

            if !processed {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(idle) => {}
                }
            }
        }

        info!("Queue consumer shutting down...");
        Ok(())
    }

    /// Handles at most one message. Returns whether a message was claimed.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(message) = self.db.claim(&self.config.input_queue).await? else {
            return Ok(false);
        };
        debug!(message_id = %message.id, attempts = message.attempts, "Claimed message");

        if self.config.ack_mode == AckMode::OnReceipt {
            self.db.ack(&message.id).await?;
        }

        let started = Instant::now();
        let reply = self.process(&message).await;
        let body = serde_json::to_string(&reply)?;

        if let Err(e) = self
            .db
            .publish(&self.config.response_queue, &body, Some(&message.id))
            .await
        {
            let failure = OcrGateError::Delivery(format!(
                "could not publish reply for {}: {e}",
                message.id
            ));
            warn!(
                job_id = %message.id,
                state = %TerminalState::DeliveryFailed,
                error = %failure,
                "Job failed"
            );
            return Err(failure);
        }
        log_stage(&message.id, JobStage::Delivered, started);

        if self.config.ack_mode == AckMode::AfterPublish {
            self.db.ack(&message.id).await?;
        }

        Ok(true)
    }

    async fn process(&self, message: &QueueMessage) -> JobReply {
        let request: JobRequest = match serde_json::from_str(&message.body) {
            Ok(request) => request,
            Err(e) => {
                let error = OcrGateError::Validation(format!("Invalid job message: {e}"));
                warn!(job_id = %message.id, error = %error, "Rejected malformed message");
                return JobReply::failed(&message.id, &error);
            }
        };

        match self.pipeline.run(&request).await {
            Ok(outcome) => {
                let artifacts = self
                    .artifacts
                    .record(&ArtifactTarget::from(&request), &outcome)
                    .await;
                JobReply::Completed {
                    job_id: message.id.clone(),
                    response: JobResponse {
                        result: outcome.result,
                        artifacts,
                    },
                }
            }
            Err(e) => JobReply::failed(&message.id, &e),
        }
    }
}

/// `now - age_secs`, saturating at the earliest representable instant.
fn cutoff(age_secs: u64) -> DateTime<Utc> {
    let age = i64::try_from(age_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_sub_signed(age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
