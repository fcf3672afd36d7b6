//! In-memory queue substrate.
//!
//! Models the parts of a hosted queue the controller relies on:
//! - at-least-once delivery: a received message stays stored and reappears
//!   once its visibility window lapses unless it is deleted
//! - a per-message receive count, reported as the delivery attempt
//! - change-visibility on the current receipt handle (redelivery delay)
//! - redrive: a message that would be received more than
//!   `max_receive_count` times is moved to the dead-letter channel instead
//!
//! Delivery order is first-visible, not strictly FIFO.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info};
use ulid::Ulid;

use crate::config::QueueConfig;
use crate::domain::{Delivery, QueueError, ReceiptHandle, TaskMessage};
use crate::ports::{MessagePublisher, MessageSource, RedeliveryScheduler};

/// A stored message (single source of truth for its delivery accounting).
#[derive(Debug, Clone)]
struct StoredMessage {
    body: TaskMessage,
    receive_count: u32,
    visible_at: Instant,

    /// Receipt of the latest delivery; older receipts are stale.
    receipt: Option<ReceiptHandle>,
}

#[derive(Default)]
struct ChannelState {
    /// Keyed by arrival sequence.
    messages: BTreeMap<u64, StoredMessage>,
    next_seq: u64,
}

impl ChannelState {
    fn seq_of(&self, handle: &ReceiptHandle) -> Option<u64> {
        self.messages
            .iter()
            .find(|(_, m)| m.receipt.as_ref() == Some(handle))
            .map(|(seq, _)| *seq)
    }

    fn push(&mut self, body: TaskMessage) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.insert(
            seq,
            StoredMessage {
                body,
                receive_count: 0,
                visible_at: Instant::now(),
                receipt: None,
            },
        );
    }
}

/// Where exhausted messages go.
struct Redrive {
    max_receive_count: u32,
    target: Arc<MessageChannel>,
}

/// One queue (the task queue or its dead-letter queue).
pub struct MessageChannel {
    name: &'static str,
    state: Mutex<ChannelState>,
    notify: Notify,
    visibility_timeout: Duration,
    redrive: Option<Redrive>,
}

/// Result of one scan over the channel.
enum Scan {
    Delivered(Delivery),
    Wait(Option<Instant>),
}

impl MessageChannel {
    fn new(name: &'static str, visibility_timeout: Duration, redrive: Option<Redrive>) -> Self {
        Self {
            name,
            state: Mutex::new(ChannelState::default()),
            notify: Notify::new(),
            visibility_timeout,
            redrive,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a message, visible immediately.
    pub async fn send(&self, body: TaskMessage) {
        self.state.lock().await.push(body);
        self.notify.notify_one();
    }

    /// Take a delivery of the first visible message, redriving exhausted ones.
    ///
    /// Nothing is removed before both locks are held, so a cancelled receive
    /// never drops a message.
    async fn scan(&self) -> Scan {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let mut exhausted = Vec::new();
        let mut delivered = None;

        for (seq, msg) in state.messages.iter_mut() {
            if msg.visible_at > now {
                continue;
            }
            if let Some(redrive) = &self.redrive
                && msg.receive_count >= redrive.max_receive_count
            {
                exhausted.push(*seq);
                continue;
            }
            msg.receive_count += 1;
            msg.visible_at = now + self.visibility_timeout;
            let handle = ReceiptHandle::from(Ulid::new());
            msg.receipt = Some(handle.clone());
            delivered = Some(Delivery::new(msg.body.clone(), msg.receive_count, handle));
            break;
        }

        if !exhausted.is_empty()
            && let Some(redrive) = &self.redrive
        {
            let mut target = redrive.target.state.lock().await;
            for seq in exhausted {
                let Some(msg) = state.messages.remove(&seq) else {
                    continue;
                };
                info!(
                    queue = self.name,
                    dead_letter_queue = redrive.target.name,
                    task_id = %msg.body.task_id,
                    receive_count = msg.receive_count,
                    "max receive count exceeded, moving message to dead-letter queue"
                );
                target.push(msg.body);
                redrive.target.notify.notify_one();
            }
        }

        match delivered {
            Some(delivery) => Scan::Delivered(delivery),
            None => Scan::Wait(state.messages.values().map(|m| m.visible_at).min()),
        }
    }

    /// Wait until a message is visible and deliver it.
    pub async fn receive(&self) -> Delivery {
        loop {
            let next_wake = match self.scan().await {
                Scan::Delivered(delivery) => {
                    debug!(
                        queue = self.name,
                        task_id = %delivery.task_id(),
                        attempt = delivery.attempt,
                        "message delivered"
                    );
                    return delivery;
                }
                Scan::Wait(next_wake) => next_wake,
            };

            // Wait for a send/visibility change OR the next message to become visible
            if let Some(wake_at) = next_wake {
                tokio::select! {
                    _ = self.notify.notified() => {},
                    _ = tokio::time::sleep_until(wake_at) => {},
                }
            } else {
                self.notify.notified().await;
            }
        }
    }

    /// Delete the message behind a current receipt.
    pub async fn delete(&self, handle: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let Some(seq) = state.seq_of(handle) else {
            return Err(QueueError::InvalidReceipt(handle.to_string()));
        };
        state.messages.remove(&seq);
        Ok(())
    }

    /// Reset the visibility window of a delivered message to `timeout` from now.
    pub async fn change_visibility(
        &self,
        handle: &ReceiptHandle,
        timeout: Duration,
    ) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock().await;
            let Some(seq) = state.seq_of(handle) else {
                return Err(QueueError::InvalidReceipt(handle.to_string()));
            };
            if let Some(msg) = state.messages.get_mut(&seq) {
                msg.visible_at = Instant::now() + timeout;
            }
        }
        // A shorter window may make the message visible earlier than waiters expect.
        self.notify.notify_one();
        Ok(())
    }

    pub async fn snapshot(&self) -> ChannelSnapshot {
        let state = self.state.lock().await;
        let now = Instant::now();
        let messages: Vec<QueuedMessage> = state
            .messages
            .values()
            .map(|m| QueuedMessage {
                body: m.body.clone(),
                receive_count: m.receive_count,
                visible: m.visible_at <= now,
            })
            .collect();
        let visible = messages.iter().filter(|m| m.visible).count();
        ChannelSnapshot {
            name: self.name,
            visible,
            in_flight: messages.len() - visible,
            messages,
        }
    }
}

#[async_trait]
impl MessagePublisher for MessageChannel {
    async fn publish(&self, message: TaskMessage) -> Result<(), QueueError> {
        self.send(message).await;
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MessageChannel {
    async fn receive(&self) -> Delivery {
        MessageChannel::receive(self).await
    }

    async fn acknowledge(&self, handle: &ReceiptHandle) -> Result<(), QueueError> {
        self.delete(handle).await
    }
}

#[async_trait]
impl RedeliveryScheduler for MessageChannel {
    async fn delay_redelivery(
        &self,
        handle: &ReceiptHandle,
        delay: Duration,
    ) -> Result<(), QueueError> {
        // The substrate works in whole seconds.
        self.change_visibility(handle, Duration::from_secs(delay.as_secs()))
            .await
    }
}

/// Task queue wired to its dead-letter queue.
pub struct InMemoryQueue {
    tasks: Arc<MessageChannel>,
    dead_letter: Arc<MessageChannel>,
}

impl InMemoryQueue {
    pub fn new(max_receive_count: u32, visibility_timeout: Duration) -> Self {
        let dead_letter = Arc::new(MessageChannel::new("dead-letter", visibility_timeout, None));
        let tasks = Arc::new(MessageChannel::new(
            "tasks",
            visibility_timeout,
            Some(Redrive {
                max_receive_count,
                target: Arc::clone(&dead_letter),
            }),
        ));
        Self { tasks, dead_letter }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(
            config.max_receive_count,
            Duration::from_secs(config.visibility_timeout_secs),
        )
    }

    pub fn tasks(&self) -> Arc<MessageChannel> {
        Arc::clone(&self.tasks)
    }

    pub fn dead_letter(&self) -> Arc<MessageChannel> {
        Arc::clone(&self.dead_letter)
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tasks: self.tasks.snapshot().await,
            dead_letter: self.dead_letter.snapshot().await,
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

/// A message as seen by an inspection snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    pub body: TaskMessage,
    pub receive_count: u32,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub name: &'static str,
    pub visible: usize,
    pub in_flight: usize,
    pub messages: Vec<QueuedMessage>,
}

impl ChannelSnapshot {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub tasks: ChannelSnapshot,
    pub dead_letter: ChannelSnapshot,
}
