//! Task status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted status of a task.
///
/// State transitions:
/// - Submitted -> Processing -> Completed
/// - Submitted -> Processing -> Failed -> Processing -> ... (one loop per delivery)
/// - Processing -> Processing (redelivery after the visibility window lapsed)
/// - any -> DeadLetter (only through dead-letter triage)
///
/// Completed and DeadLetter are terminal for the processing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Accepted by ingress, not yet delivered.
    Submitted,

    /// A delivery is running the unit of work.
    Processing,

    /// The unit of work succeeded.
    Completed,

    /// The last delivery failed; the substrate will redeliver or dead-letter.
    Failed,

    /// Routed to the dead-letter channel and triaged.
    DeadLetter,
}

impl TaskStatus {
    /// Is this a terminal state for the processing path?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::DeadLetter)
    }

    /// Whether the transition `self -> next` is allowed.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (_, DeadLetter) => true,
            (Submitted | Failed | Processing, Processing) => true,
            (Processing, Completed | Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::DeadLetter => "DEAD_LETTER",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use TaskStatus::*;

    #[rstest]
    #[case(Submitted, Processing)]
    #[case(Failed, Processing)]
    #[case(Processing, Processing)]
    #[case(Processing, Completed)]
    #[case(Processing, Failed)]
    #[case(Submitted, DeadLetter)]
    #[case(Completed, DeadLetter)]
    #[case(DeadLetter, DeadLetter)]
    fn allowed_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        assert!(from.can_transition_to(to), "{from} -> {to} should be allowed");
    }

    #[rstest]
    #[case(Submitted, Completed)]
    #[case(Submitted, Failed)]
    #[case(Failed, Completed)]
    #[case(Completed, Processing)]
    #[case(DeadLetter, Processing)]
    #[case(Completed, Failed)]
    fn rejected_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        assert!(!from.can_transition_to(to), "{from} -> {to} should be rejected");
    }

    #[test]
    fn terminal_states() {
        assert!(Completed.is_terminal());
        assert!(DeadLetter.is_terminal());
        assert!(!Submitted.is_terminal());
        assert!(!Processing.is_terminal());
        assert!(!Failed.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        for status in [Submitted, Processing, Completed, Failed, DeadLetter] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
