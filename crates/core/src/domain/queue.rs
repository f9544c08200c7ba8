// Queue Domain Model

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::job::{JobId, OperationCategory};
use crate::domain::payload::JobPayload;

/// Queue identifier
pub type QueueId = String;

/// Task identifier (UUID v4)
pub type TaskId = String;

/// Where a job was submitted (at most one assignment per job)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAssignment {
    pub job_id: JobId,
    pub queue: QueueId,
    pub task_id: TaskId,
    pub assigned_at: i64, // epoch ms
    pub task_state: TaskState,
}

/// Task lifecycle inside the queue store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Taken,
    Acknowledged,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "PENDING"),
            TaskState::Taken => write!(f, "TAKEN"),
            TaskState::Acknowledged => write!(f, "ACKNOWLEDGED"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskState::Pending),
            "TAKEN" => Ok(TaskState::Taken),
            "ACKNOWLEDGED" => Ok(TaskState::Acknowledged),
            other => Err(DomainError::ValidationError(format!(
                "unknown task state: {}",
                other
            ))),
        }
    }
}

/// A dequeued unit of work
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub queue: QueueId,
    pub payload: JobPayload,
    pub enqueued_at: i64,
}

/// Category -> queue name routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRouting {
    pub encrypt: QueueId,
    pub decrypt: QueueId,
    pub compress: QueueId,
    pub decompress: QueueId,
}

impl QueueRouting {
    pub fn queue_for(&self, category: OperationCategory) -> &str {
        match category {
            OperationCategory::Encrypt => &self.encrypt,
            OperationCategory::Decrypt => &self.decrypt,
            OperationCategory::Compress => &self.compress,
            OperationCategory::Decompress => &self.decompress,
        }
    }
}

impl Default for QueueRouting {
    fn default() -> Self {
        Self {
            encrypt: OperationCategory::Encrypt.default_queue().to_string(),
            decrypt: OperationCategory::Decrypt.default_queue().to_string(),
            compress: OperationCategory::Compress.default_queue().to_string(),
            decompress: OperationCategory::Decompress.default_queue().to_string(),
        }
    }
}
