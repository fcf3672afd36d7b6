//! Ingress: validate a submission, persist it as SUBMITTED, enqueue it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::domain::{IngressError, Task, TaskId, TaskMessage, TaskStatus};
use crate::ports::{Clock, IdGenerator, MessagePublisher, TaskStore};

/// Submission body: `{ "taskId"?: string, "payload": object }`.
///
/// `task_id` stays untyped so a non-string id is reported as an invalid id
/// rather than a JSON error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub task_id: Option<Value>,
    #[serde(default)]
    pub payload: Value,
}

impl SubmitRequest {
    pub fn new(task_id: Option<&str>, payload: Value) -> Self {
        Self {
            task_id: task_id.map(|id| Value::String(id.to_string())),
            payload,
        }
    }
}

/// Acknowledgement returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

pub struct Ingress {
    store: Arc<dyn TaskStore>,
    publisher: Arc<dyn MessagePublisher>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Ingress {
    pub fn new(
        store: Arc<dyn TaskStore>,
        publisher: Arc<dyn MessagePublisher>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            ids,
            clock,
        }
    }

    /// Parse a raw request body; an empty body counts as `{}`.
    pub async fn submit_json(&self, body: &str) -> Result<SubmitReceipt, IngressError> {
        let body = if body.trim().is_empty() { "{}" } else { body };
        let request: SubmitRequest =
            serde_json::from_str(body).map_err(|e| IngressError::InvalidJson(e.to_string()))?;
        self.submit(request).await
    }

    /// Validate, create the SUBMITTED record, then publish its message.
    ///
    /// The two writes are not atomic. If the record is created but the
    /// publish fails, the task stays SUBMITTED with no message to deliver it
    /// and the error is returned; retrying the submission is up to the caller.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, IngressError> {
        if !request.payload.is_object() {
            return Err(IngressError::InvalidPayload);
        }

        let task_id = match request.task_id {
            None | Some(Value::Null) => self.ids.generate_task_id(),
            Some(Value::String(id)) if !id.trim().is_empty() => TaskId::new(id),
            Some(_) => return Err(IngressError::InvalidTaskId),
        };

        let task = Task::submitted(task_id.clone(), request.payload.clone(), self.clock.now());
        self.store.create(task).await?;
        self.publisher
            .publish(TaskMessage::new(task_id.clone(), request.payload))
            .await?;

        info!(task_id = %task_id, "task submitted");
        Ok(SubmitReceipt {
            task_id,
            status: TaskStatus::Submitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QueueError, StoreError};
    use async_trait::async_trait;
    use crate::impls::{InMemoryQueue, InMemoryTaskStore};
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    struct Fixture {
        store: Arc<InMemoryTaskStore>,
        queue: InMemoryQueue,
        ingress: Ingress,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = InMemoryQueue::default();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        let ingress = Ingress::new(
            store.clone(),
            queue.tasks(),
            Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        );
        Fixture {
            store,
            queue,
            ingress,
        }
    }

    #[tokio::test]
    async fn accepted_submission_is_stored_and_enqueued() {
        let fx = fixture();

        let receipt = fx
            .ingress
            .submit_json(r#"{"taskId":"order-1","payload":{"sku":"A1"}}"#)
            .await
            .unwrap();

        assert_eq!(receipt.task_id, TaskId::new("order-1"));
        assert_eq!(receipt.status, TaskStatus::Submitted);

        let stored = fx.store.get(&receipt.task_id).await.unwrap().unwrap();
        assert_eq!(stored.task.status, TaskStatus::Submitted);
        assert_eq!(stored.task.attempts, 0);

        let delivery = fx.queue.tasks().receive().await;
        assert_eq!(delivery.message.task_id, receipt.task_id);
        assert_eq!(delivery.message.payload, serde_json::json!({"sku": "A1"}));
    }

    #[tokio::test]
    async fn missing_task_id_is_generated() {
        let fx = fixture();

        let receipt = fx
            .ingress
            .submit(SubmitRequest::new(None, serde_json::json!({})))
            .await
            .unwrap();

        assert!(receipt.task_id.as_str().starts_with("task-"));
        assert_eq!(fx.store.len().await, 1);
    }

    #[rstest]
    #[case::not_json("{nope", "json")]
    #[case::no_payload(r#"{"taskId":"a"}"#, "payload")]
    #[case::string_payload(r#"{"payload":"x"}"#, "payload")]
    #[case::null_payload(r#"{"payload":null}"#, "payload")]
    #[case::empty_body("", "payload")]
    #[case::numeric_id(r#"{"taskId":42,"payload":{}}"#, "task_id")]
    #[case::blank_id(r#"{"taskId":"  ","payload":{}}"#, "task_id")]
    #[tokio::test]
    async fn invalid_submissions_are_rejected(#[case] body: &str, #[case] kind: &str) {
        let fx = fixture();

        let err = fx.ingress.submit_json(body).await.unwrap_err();

        assert!(err.is_rejection());
        match kind {
            "json" => assert!(matches!(err, IngressError::InvalidJson(_))),
            "payload" => assert!(matches!(err, IngressError::InvalidPayload)),
            _ => assert!(matches!(err, IngressError::InvalidTaskId)),
        }
        assert!(fx.store.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_task_id_is_a_store_error() {
        let fx = fixture();
        let request = SubmitRequest::new(Some("dup"), serde_json::json!({}));
        fx.ingress.submit(request.clone()).await.unwrap();

        let err = fx.ingress.submit(request).await.unwrap_err();

        assert!(matches!(err, IngressError::Store(StoreError::AlreadyExists(_))));
        assert!(!err.is_rejection());
    }

    struct DownPublisher;

    #[async_trait]
    impl MessagePublisher for DownPublisher {
        async fn publish(&self, _message: TaskMessage) -> Result<(), QueueError> {
            Err(QueueError::OperationFailed("broker unreachable".into()))
        }
    }

    #[tokio::test]
    async fn failed_publish_leaves_record_submitted_and_returns_error() {
        let store = Arc::new(InMemoryTaskStore::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        let ingress = Ingress::new(
            store.clone(),
            Arc::new(DownPublisher),
            Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        );

        let err = ingress
            .submit(SubmitRequest::new(Some("orphan"), serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, IngressError::Queue(QueueError::OperationFailed(_))));
        assert!(!err.is_rejection());
        let task = store.get(&TaskId::new("orphan")).await.unwrap().unwrap().task;
        assert_eq!(task.status, TaskStatus::Submitted);
        assert_eq!(task.attempts, 0);
    }
}
