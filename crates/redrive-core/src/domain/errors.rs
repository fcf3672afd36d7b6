//! Error types, one enum per concern.
//!
//! - `WorkError`: the unit of work failed (expected; drives FAILED + backoff)
//! - `StoreError` / `QueueError`: dependency failures (logged, never mask a
//!   unit-of-work failure or a dead-letter diagnostic)
//! - `IngressError`: rejected submissions, never reach the controller
//! - `ConfigError`: invalid configuration

use thiserror::Error;

use super::TaskId;

/// Failure reported by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkError {
    message: String,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),

    #[error("version conflict on {task_id}: expected {expected}, found {actual}")]
    VersionConflict {
        task_id: TaskId,
        expected: u64,
        actual: u64,
    },

    #[error("record store unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("receipt handle is not current: {0}")]
    InvalidReceipt(String),

    /// Backend failure reported by a queue adapter.
    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Invalid JSON in request body: {0}")]
    InvalidJson(String),

    #[error("Invalid request: payload is required and must be an object")]
    InvalidPayload,

    #[error("Invalid request: taskId must be a non-empty string")]
    InvalidTaskId,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl IngressError {
    /// Whether the caller sent a bad request (as opposed to an internal failure).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            IngressError::InvalidJson(_) | IngressError::InvalidPayload | IngressError::InvalidTaskId
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
