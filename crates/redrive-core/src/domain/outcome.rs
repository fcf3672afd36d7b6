//! Outcome model: what one delivery ended up doing.
//!
//! The controller never throws to ask for a retry. It returns a
//! `ProcessOutcome` and the worker adapter turns that into whatever the
//! substrate needs (`Settlement`).

use std::fmt;
use std::time::Duration;

use super::TaskStatus;

/// Why a delivery was dropped without running the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The record store has no such task (e.g. removed by retention).
    TaskMissing,

    /// The task already reached a terminal status; a duplicate delivery.
    AlreadyTerminal(TaskStatus),
}

/// Which write lost a compare-and-swap race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Claim,
    Complete,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Claim => f.write_str("claim"),
            WriteStage::Complete => f.write_str("complete"),
        }
    }
}

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Unit of work succeeded and COMPLETED was persisted.
    Completed,

    /// Failed below the exhaustion threshold.
    ///
    /// `delay` is what the retry policy asked for; `delay_requested` is false
    /// when the substrate rejected the instruction (its default delay applies).
    FailedRetryable {
        error: String,
        delay: Duration,
        delay_requested: bool,
    },

    /// Failed at or beyond the threshold; no delay was requested.
    FailedExhausted { error: String },

    /// Nothing was done for this delivery.
    Skipped(SkipReason),

    /// Another delivery wrote the record first (conditional updates only).
    Conflict { stage: WriteStage },
}

/// How the worker settles a delivery with the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Delete the message: it needs no further delivery.
    Acknowledge,

    /// Leave the message to reappear after its visibility window, advancing
    /// the substrate's receive count.
    Release,
}

impl ProcessOutcome {
    pub fn settlement(&self) -> Settlement {
        match self {
            ProcessOutcome::Completed | ProcessOutcome::Skipped(_) => Settlement::Acknowledge,
            ProcessOutcome::FailedRetryable { .. }
            | ProcessOutcome::FailedExhausted { .. }
            | ProcessOutcome::Conflict { .. } => Settlement::Release,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProcessOutcome::FailedRetryable { .. } | ProcessOutcome::FailedExhausted { .. }
        )
    }

    /// The unit-of-work (or dependency) error, if this delivery failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            ProcessOutcome::FailedRetryable { error, .. }
            | ProcessOutcome::FailedExhausted { error } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_and_conflicts_are_released() {
        let retry = ProcessOutcome::FailedRetryable {
            error: "e".into(),
            delay: Duration::from_secs(5),
            delay_requested: true,
        };
        assert_eq!(retry.settlement(), Settlement::Release);
        assert_eq!(
            ProcessOutcome::FailedExhausted { error: "e".into() }.settlement(),
            Settlement::Release
        );
        assert_eq!(
            ProcessOutcome::Conflict { stage: WriteStage::Claim }.settlement(),
            Settlement::Release
        );
    }

    #[test]
    fn completions_and_skips_are_acknowledged() {
        assert_eq!(ProcessOutcome::Completed.settlement(), Settlement::Acknowledge);
        assert_eq!(
            ProcessOutcome::Skipped(SkipReason::TaskMissing).settlement(),
            Settlement::Acknowledge
        );
        assert_eq!(
            ProcessOutcome::Skipped(SkipReason::AlreadyTerminal(TaskStatus::Completed)).settlement(),
            Settlement::Acknowledge
        );
    }

    #[test]
    fn error_is_exposed_for_failures_only() {
        let exhausted = ProcessOutcome::FailedExhausted { error: "boom".into() };
        assert!(exhausted.is_failure());
        assert_eq!(exhausted.error(), Some("boom"));
        assert_eq!(ProcessOutcome::Completed.error(), None);
        assert!(!ProcessOutcome::Conflict { stage: WriteStage::Complete }.is_failure());
    }
}
