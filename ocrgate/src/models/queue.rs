use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobResponse;
use crate::error::{OcrGateError, TerminalState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Ready,
    InFlight,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::InFlight => write!(f, "in_flight"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ready" => Ok(Self::Ready),
            "in_flight" => Ok(Self::InFlight),
            _ => Err(format!("Unknown message status: {s}")),
        }
    }
}

/// A JSON message sitting on one of the job queues.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub id: String,
    pub queue: String,
    pub body: String,
    /// Id of the message this one answers, for response messages.
    pub correlation_id: Option<String>,
    pub status: MessageStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Body published on the response queue for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobReply {
    Completed {
        #[serde(rename = "jobId")]
        job_id: String,
        #[serde(flatten)]
        response: JobResponse,
    },
    Failed {
        #[serde(rename = "jobId")]
        job_id: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<TerminalState>,
    },
}

impl JobReply {
    pub fn failed(job_id: impl Into<String>, error: &OcrGateError) -> Self {
        Self::Failed {
            job_id: job_id.into(),
            error: error.to_string(),
            state: error.terminal_state(),
        }
    }
}
