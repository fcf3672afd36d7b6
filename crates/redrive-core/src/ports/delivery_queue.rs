//! Queue substrate ports.
//!
//! The substrate owns delivery accounting: at-least-once delivery, the
//! receive count, the visibility window and routing to the dead-letter
//! channel after its maximum receive count. The core only
//! - publishes message bodies (ingress),
//! - receives and settles deliveries (worker adapter),
//! - asks for a redelivery delay (controller).

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Delivery, QueueError, ReceiptHandle, TaskMessage};

/// Enqueue side, used by ingress.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: TaskMessage) -> Result<(), QueueError>;
}

/// Consume side, used by the worker group.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next visible message and take a delivery of it.
    async fn receive(&self) -> Delivery;

    /// Delete the delivered message so it is never delivered again.
    async fn acknowledge(&self, handle: &ReceiptHandle) -> Result<(), QueueError>;
}

/// Redelivery pacing, used by the controller on the failure path.
#[async_trait]
pub trait RedeliveryScheduler: Send + Sync {
    /// Keep the delivered message hidden for `delay` (whole seconds) before
    /// it becomes visible again.
    async fn delay_redelivery(
        &self,
        handle: &ReceiptHandle,
        delay: Duration,
    ) -> Result<(), QueueError>;
}
