//! Dead-letter triage: record DEAD_LETTER and emit one diagnostic per
//! dead-letter delivery.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{DeadLetterDiagnostic, Delivery, TaskPatch};
use crate::ports::{Clock, DiagnosticSink, TaskStore};

pub struct DeadLetterTriage {
    store: Arc<dyn TaskStore>,
    sink: Arc<dyn DiagnosticSink>,
    clock: Arc<dyn Clock>,
}

impl DeadLetterTriage {
    pub fn new(store: Arc<dyn TaskStore>, sink: Arc<dyn DiagnosticSink>, clock: Arc<dyn Clock>) -> Self {
        Self { store, sink, clock }
    }

    /// Triage one dead-letter delivery. Infallible: lookup and update
    /// failures degrade the diagnostic instead of aborting it.
    pub async fn triage(&self, delivery: &Delivery) -> DeadLetterDiagnostic {
        let message = &delivery.message;
        let task_id = &message.task_id;
        let now = self.clock.now();

        let (record, store_error) = match self.store.get(task_id).await {
            Ok(Some(stored)) => {
                match self.store.update(task_id, &TaskPatch::dead_letter(now), None).await {
                    Ok(updated) => (Some(updated.task), None),
                    Err(e) => {
                        warn!(task_id = %task_id, error = %e, "failed to persist DEAD_LETTER status");
                        (Some(stored.task), Some(e.to_string()))
                    }
                }
            }
            Ok(None) => {
                warn!(task_id = %task_id, "dead-lettered task has no record");
                (None, None)
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "failed to read dead-lettered task");
                (None, Some(e.to_string()))
            }
        };

        let diagnostic = DeadLetterDiagnostic::build(message, record.as_ref(), now, store_error);
        self.sink.emit(&diagnostic);
        info!(
            task_id = %task_id,
            complete = diagnostic.is_complete(),
            "dead-letter triage done"
        );
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DiagnosticContext, ReceiptHandle, Recorded, StoreError, Task, TaskId, TaskMessage,
        TaskStatus,
    };
    use crate::impls::{InMemoryTaskStore, MemoryDiagnosticSink};
    use crate::ports::{FixedClock, StoredTask};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap()
    }

    fn delivery(task_id: &str) -> Delivery {
        Delivery::new(
            TaskMessage::new(TaskId::new(task_id), serde_json::json!({"n": 7})),
            1,
            ReceiptHandle::new("dlq-rh"),
        )
    }

    async fn failed_three_times(store: &InMemoryTaskStore) {
        let id = TaskId::new("t-1");
        store
            .create(Task::submitted(id.clone(), serde_json::json!({"n": 7}), t0()))
            .await
            .unwrap();
        store.update(&id, &TaskPatch::processing(3, t0()), None).await.unwrap();
        store
            .update(&id, &TaskPatch::failed("upstream 503", t0()), None)
            .await
            .unwrap();
    }

    /// Store whose reads or writes always fail.
    struct BrokenStore {
        inner: InMemoryTaskStore,
        reads: bool,
    }

    #[async_trait]
    impl TaskStore for BrokenStore {
        async fn create(&self, task: Task) -> Result<StoredTask, StoreError> {
            self.inner.create(task).await
        }

        async fn get(&self, task_id: &TaskId) -> Result<Option<StoredTask>, StoreError> {
            if self.reads {
                return Err(StoreError::Backend("read refused".into()));
            }
            self.inner.get(task_id).await
        }

        async fn update(
            &self,
            _task_id: &TaskId,
            _patch: &TaskPatch,
            _expected_version: Option<u64>,
        ) -> Result<StoredTask, StoreError> {
            Err(StoreError::Backend("write refused".into()))
        }
    }

    #[tokio::test]
    async fn present_task_is_marked_dead_letter_with_history_intact() {
        let store = Arc::new(InMemoryTaskStore::new());
        failed_three_times(&store).await;
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let triage = DeadLetterTriage::new(store.clone(), sink.clone(), Arc::new(FixedClock::new(t1())));

        let d = triage.triage(&delivery("t-1")).await;

        let task = store.get(&TaskId::new("t-1")).await.unwrap().unwrap().task;
        assert_eq!(task.status, TaskStatus::DeadLetter);
        assert_eq!(task.attempts, 3);
        assert_eq!(task.last_error.as_deref(), Some("upstream 503"));
        assert_eq!(task.updated_at, t1());

        assert_eq!(d.context, DiagnosticContext::Complete);
        assert_eq!(d.attempts, Recorded::Known(3));
        assert_eq!(d.last_error, Recorded::Known("upstream 503".to_string()));
        assert_eq!(d.created_at, Recorded::Known(t0()));
        assert_eq!(d.triaged_at, t1());
        assert_eq!(sink.records(), vec![d]);
    }

    #[tokio::test]
    async fn absent_task_still_emits_incomplete_diagnostic() {
        let store = Arc::new(InMemoryTaskStore::new());
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let triage = DeadLetterTriage::new(store.clone(), sink.clone(), Arc::new(FixedClock::new(t1())));

        let d = triage.triage(&delivery("gone")).await;

        assert_eq!(d.context, DiagnosticContext::Incomplete);
        assert_eq!(d.attempts, Recorded::Unknown);
        assert!(d.store_error.is_none());
        assert_eq!(d.payload, serde_json::json!({"n": 7}));
        assert_eq!(sink.records().len(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn lookup_failure_is_recorded_in_diagnostic() {
        let store = Arc::new(BrokenStore {
            inner: InMemoryTaskStore::new(),
            reads: true,
        });
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let triage = DeadLetterTriage::new(store, sink.clone(), Arc::new(FixedClock::new(t1())));

        let d = triage.triage(&delivery("t-1")).await;

        assert_eq!(d.context, DiagnosticContext::Incomplete);
        assert_eq!(d.store_error.as_deref(), Some("record store unavailable: read refused"));
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn update_failure_keeps_record_fields_but_is_incomplete() {
        let inner = InMemoryTaskStore::new();
        failed_three_times(&inner).await;
        let store = Arc::new(BrokenStore { inner, reads: false });
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let triage = DeadLetterTriage::new(store, sink.clone(), Arc::new(FixedClock::new(t1())));

        let d = triage.triage(&delivery("t-1")).await;

        assert_eq!(d.context, DiagnosticContext::Incomplete);
        assert_eq!(d.attempts, Recorded::Known(3));
        assert_eq!(d.store_error.as_deref(), Some("record store unavailable: write refused"));
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn repeated_dead_letter_delivery_is_tolerated() {
        let store = Arc::new(InMemoryTaskStore::new());
        failed_three_times(&store).await;
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let triage = DeadLetterTriage::new(store.clone(), sink.clone(), Arc::new(FixedClock::new(t1())));

        triage.triage(&delivery("t-1")).await;
        let again = triage.triage(&delivery("t-1")).await;

        assert!(again.is_complete());
        assert_eq!(sink.records().len(), 2);
        let task = store.get(&TaskId::new("t-1")).await.unwrap().unwrap().task;
        assert_eq!(task.status, TaskStatus::DeadLetter);
    }
}
