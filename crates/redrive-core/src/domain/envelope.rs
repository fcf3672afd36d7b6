//! Queue message body and delivery envelope.

use serde::{Deserialize, Serialize};

use super::{ReceiptHandle, TaskId};

/// Body of a message on the task queue (and on its dead-letter channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    pub task_id: TaskId,

    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskMessage {
    pub fn new(task_id: TaskId, payload: serde_json::Value) -> Self {
        Self { task_id, payload }
    }
}

/// One delivery of a message, as handed to the controller or to triage.
///
/// `attempt` is the substrate's receive count for this message and is treated
/// as ground truth for `Task::attempts`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message: TaskMessage,
    pub attempt: u32,
    pub handle: ReceiptHandle,
}

impl Delivery {
    pub fn new(message: TaskMessage, attempt: u32, handle: ReceiptHandle) -> Self {
        Self {
            message,
            attempt,
            handle,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.message.task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_body_uses_camel_case_wire_names() {
        let body = r#"{"taskId":"t-9","payload":{"x":1}}"#;
        let msg: TaskMessage = serde_json::from_str(body).unwrap();
        assert_eq!(msg.task_id, TaskId::new("t-9"));
        assert_eq!(msg.payload["x"], 1);
    }

    #[test]
    fn message_without_payload_defaults_to_null() {
        let msg: TaskMessage = serde_json::from_str(r#"{"taskId":"t-9"}"#).unwrap();
        assert!(msg.payload.is_null());
    }
}
