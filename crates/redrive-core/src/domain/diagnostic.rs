//! Dead-letter diagnostic record: the terminal audit artifact of a task.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::{Task, TaskId, TaskMessage};

/// Event name carried by every diagnostic record.
pub const DEAD_LETTER_EVENT: &str = "TASK_DEAD_LETTER";

/// A value taken from the task record, or `"unknown"` when the record (or the
/// field) could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded<T> {
    Known(T),
    Unknown,
}

impl<T> Recorded<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recorded::Known(v) => Some(v),
            Recorded::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Recorded<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Recorded::Unknown, Recorded::Known)
    }
}

impl<T: Serialize> Serialize for Recorded<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recorded::Known(v) => v.serialize(serializer),
            Recorded::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Recorded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recorded::Known(v) => v.fmt(f),
            Recorded::Unknown => f.write_str("unknown"),
        }
    }
}

/// Whether triage had the full task record behind the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticContext {
    Complete,
    Incomplete,
}

/// Structured record emitted once per dead-lettered task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterDiagnostic {
    pub event: &'static str,
    pub task_id: TaskId,
    pub payload: serde_json::Value,
    pub attempts: Recorded<u32>,
    pub last_error: Recorded<String>,
    pub created_at: Recorded<DateTime<Utc>>,
    pub triaged_at: DateTime<Utc>,
    pub context: DiagnosticContext,

    /// Lookup or update failure that degraded this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,

    pub message: String,
}

impl DeadLetterDiagnostic {
    /// Assemble a diagnostic from the dead-letter message and whatever the
    /// record store returned.
    pub fn build(
        message: &TaskMessage,
        record: Option<&Task>,
        triaged_at: DateTime<Utc>,
        store_error: Option<String>,
    ) -> Self {
        let attempts = Recorded::from(record.map(|t| t.attempts));
        let last_error = Recorded::from(record.and_then(|t| t.last_error.clone()));
        let created_at = Recorded::from(record.map(|t| t.created_at));

        let payload = match record {
            Some(task) if message.payload.is_null() => task.payload.clone(),
            _ => message.payload.clone(),
        };

        let context = if record.is_some() && store_error.is_none() {
            DiagnosticContext::Complete
        } else {
            DiagnosticContext::Incomplete
        };

        let summary = format!(
            "Task {} has been moved to DLQ after {} attempts",
            message.task_id, attempts
        );

        Self {
            event: DEAD_LETTER_EVENT,
            task_id: message.task_id.clone(),
            payload,
            attempts,
            last_error,
            created_at,
            triaged_at,
            context,
            store_error,
            message: summary,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.context == DiagnosticContext::Complete
    }
}
