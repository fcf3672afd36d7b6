//! Status views over the task records.

use serde::{Deserialize, Serialize};

use crate::domain::TaskStatus;

/// Number of tasks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub submitted: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_letter: usize,
}

impl StatusCounts {
    pub fn tally(statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                TaskStatus::Submitted => counts.submitted += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::DeadLetter => counts.dead_letter += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.submitted + self.processing + self.completed + self.failed + self.dead_letter
    }

    /// Tasks that reached COMPLETED or DEAD_LETTER.
    pub fn settled(&self) -> usize {
        self.completed + self.dead_letter
    }
}
