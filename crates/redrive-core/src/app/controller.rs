//! Task lifecycle controller: one delivery in, one `ProcessOutcome` out.
//!
//! SUBMITTED/FAILED/PROCESSING → PROCESSING → COMPLETED | FAILED.
//! The controller never dead-letters; the substrate does that once the
//! receive count runs out and `DeadLetterTriage` records it.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::ConcurrencyGuard;
use crate::domain::{
    Delivery, ProcessOutcome, RetryPolicy, SkipReason, StoreError, TaskPatch, TaskStatus,
    WriteStage,
};
use crate::ports::{Clock, RedeliveryScheduler, TaskStore, UnitOfWork};

pub struct LifecycleController {
    store: Arc<dyn TaskStore>,
    scheduler: Arc<dyn RedeliveryScheduler>,
    work: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    guard: ConcurrencyGuard,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn TaskStore>,
        scheduler: Arc<dyn RedeliveryScheduler>,
        work: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        guard: ConcurrencyGuard,
    ) -> Self {
        Self {
            store,
            scheduler,
            work,
            clock,
            policy,
            guard,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn guard(&self) -> ConcurrencyGuard {
        self.guard
    }

    /// Handle one delivery of a task message.
    ///
    /// Never returns an error: every failure (unit of work or dependency) is
    /// reported as a failure outcome so the substrate's receive count
    /// advances. FAILED is only written over a PROCESSING record this
    /// delivery claimed.
    pub async fn handle(&self, delivery: &Delivery) -> ProcessOutcome {
        let task_id = delivery.task_id();
        let attempt = delivery.attempt;
        info!(task_id = %task_id, attempt, "processing task");

        let stored = match self.store.get(task_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                warn!(task_id = %task_id, attempt, "task record not found, dropping delivery");
                return ProcessOutcome::Skipped(SkipReason::TaskMissing);
            }
            Err(e) => {
                // status unknown: nothing may be written
                warn!(task_id = %task_id, attempt, error = %e, "failed to read task record");
                return self.signal_failure(delivery, e.to_string()).await;
            }
        };

        let status = stored.task.status;
        if !status.can_transition_to(TaskStatus::Processing) {
            info!(
                task_id = %task_id,
                attempt,
                status = %status,
                "task already terminal, duplicate delivery dropped"
            );
            return ProcessOutcome::Skipped(SkipReason::AlreadyTerminal(status));
        }

        let claim = TaskPatch::processing(attempt, self.clock.now());
        let claimed = match self
            .store
            .update(task_id, &claim, self.expected(stored.version))
            .await
        {
            Ok(claimed) => claimed,
            Err(StoreError::VersionConflict { .. }) => {
                return self.conflict(delivery, WriteStage::Claim);
            }
            Err(e) => {
                // not claimed: the record keeps its status
                warn!(task_id = %task_id, attempt, error = %e, "failed to claim task");
                return self.signal_failure(delivery, e.to_string()).await;
            }
        };

        if let Err(e) = self.work.run(&claimed.task).await {
            return self
                .fail(delivery, e.message().to_string(), self.expected(claimed.version))
                .await;
        }

        let done = TaskPatch::completed(self.clock.now());
        match self
            .store
            .update(task_id, &done, self.expected(claimed.version))
            .await
        {
            Ok(_) => {
                info!(task_id = %task_id, attempt, "task completed");
                ProcessOutcome::Completed
            }
            Err(StoreError::VersionConflict { .. }) => {
                self.conflict(delivery, WriteStage::Complete)
            }
            Err(e) => {
                self.fail(delivery, e.to_string(), self.expected(claimed.version))
                    .await
            }
        }
    }

    fn expected(&self, version: u64) -> Option<u64> {
        match self.guard {
            ConcurrencyGuard::LastWriterWins => None,
            ConcurrencyGuard::ConditionalUpdate => Some(version),
        }
    }

    fn conflict(&self, delivery: &Delivery, stage: WriteStage) -> ProcessOutcome {
        warn!(
            task_id = %delivery.task_id(),
            attempt = delivery.attempt,
            stage = %stage,
            "task record changed concurrently, releasing delivery"
        );
        ProcessOutcome::Conflict { stage }
    }

    /// Failure after a successful claim: persist FAILED, then pace and signal.
    async fn fail(
        &self,
        delivery: &Delivery,
        error_message: String,
        expected_version: Option<u64>,
    ) -> ProcessOutcome {
        let task_id = delivery.task_id();
        let attempt = delivery.attempt;
        error!(task_id = %task_id, attempt, error = %error_message, "task failed");

        let patch = TaskPatch::failed(error_message.clone(), self.clock.now());
        match self.store.update(task_id, &patch, expected_version).await {
            Ok(_) => {}
            Err(StoreError::VersionConflict { actual, .. }) => {
                warn!(
                    task_id = %task_id,
                    attempt,
                    actual_version = actual,
                    "task record changed concurrently, FAILED not written"
                );
            }
            Err(e) => {
                error!(task_id = %task_id, attempt, error = %e, "failed to persist FAILED status");
            }
        }

        self.signal_failure(delivery, error_message).await
    }

    /// Request the backoff delay (unless exhausted) and build the failure outcome.
    async fn signal_failure(&self, delivery: &Delivery, error_message: String) -> ProcessOutcome {
        let task_id = delivery.task_id();
        let attempt = delivery.attempt;

        if self.policy.is_exhausted(attempt) {
            warn!(
                task_id = %task_id,
                attempt,
                max_attempts = self.policy.max_attempts(),
                "retry budget exhausted, leaving task to the dead-letter queue"
            );
            return ProcessOutcome::FailedExhausted {
                error: error_message,
            };
        }

        let delay = self.policy.delay_for(attempt);
        let delay_requested = match self.scheduler.delay_redelivery(&delivery.handle, delay).await {
            Ok(()) => {
                info!(
                    task_id = %task_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "retry scheduled with backoff"
                );
                true
            }
            Err(e) => {
                error!(
                    task_id = %task_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "failed to set redelivery delay"
                );
                false
            }
        };

        ProcessOutcome::FailedRetryable {
            error: error_message,
            delay,
            delay_requested,
        }
    }
}
