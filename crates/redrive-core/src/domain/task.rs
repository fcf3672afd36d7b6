//! Task record: the unit of durable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskStatus};

/// Persisted state of one task.
///
/// Design:
/// - The record store is the single source of truth; nothing caches a `Task`
///   across deliveries.
/// - `attempts` mirrors the substrate's receive count for the delivery that
///   last touched the record. It is never incremented locally.
/// - Mutations go through [`TaskPatch`] so a write only names the fields it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A freshly accepted task (status SUBMITTED, no attempts yet).
    pub fn submitted(task_id: TaskId, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            payload,
            status: TaskStatus::Submitted,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(attempts) = patch.attempts {
            self.attempts = attempts;
        }
        if let Some(error) = &patch.last_error {
            self.last_error = Some(error.clone());
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        self.updated_at = patch.updated_at;
    }
}

/// Field-level update of a task record.
///
/// Fields left as `None` are not touched by the write. `updated_at` is always
/// refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub attempts: Option<u32>,
    pub last_error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TaskPatch {
    fn touch(now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            attempts: None,
            last_error: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Claim for a delivery: PROCESSING + attempts synchronized from the substrate.
    pub fn processing(attempt: u32, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Processing),
            attempts: Some(attempt),
            ..Self::touch(now)
        }
    }

    /// The unit of work succeeded. `last_error` is deliberately left alone.
    pub fn completed(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            completed_at: Some(now),
            ..Self::touch(now)
        }
    }

    pub fn failed(error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            last_error: Some(error.into()),
            ..Self::touch(now)
        }
    }

    /// Dead-letter triage: attempts and last_error are preserved.
    pub fn dead_letter(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::DeadLetter),
            ..Self::touch(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn submitted_task_starts_with_zero_attempts() {
        let task = Task::submitted(TaskId::new("t-1"), serde_json::json!({"a": 1}), t0());
        assert_eq!(task.status, TaskStatus::Submitted);
        assert_eq!(task.attempts, 0);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.last_error.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn patches_only_touch_named_fields() {
        let mut task = Task::submitted(TaskId::new("t-1"), serde_json::json!({}), t0());

        task.apply(&TaskPatch::processing(1, t0() + Duration::seconds(1)));
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.attempts, 1);

        task.apply(&TaskPatch::failed("boom", t0() + Duration::seconds(2)));
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.attempts, 1);
        assert_eq!(task.last_error.as_deref(), Some("boom"));

        task.apply(&TaskPatch::processing(2, t0() + Duration::seconds(3)));
        task.apply(&TaskPatch::completed(t0() + Duration::seconds(4)));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.attempts, 2);
        assert_eq!(task.completed_at, Some(t0() + Duration::seconds(4)));
        assert_eq!(task.updated_at, t0() + Duration::seconds(4));
        // Stale error survives completion.
        assert_eq!(task.last_error.as_deref(), Some("boom"));
        assert_eq!(task.created_at, t0());
    }

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let task = Task::submitted(TaskId::new("t-1"), serde_json::json!({"k": "v"}), t0());
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["taskId"], "t-1");
        assert_eq!(v["status"], "SUBMITTED");
        assert_eq!(v["attempts"], 0);
        assert!(v.get("lastError").is_none());
        assert!(v.get("createdAt").is_some());
    }
}
