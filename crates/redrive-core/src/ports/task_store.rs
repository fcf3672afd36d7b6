//! TaskStore port - the durable key-value record of task state.
//!
//! Point lookups and updates keyed by task id only: no range queries, no
//! transactions, no batches. Domain rules (status graph, guards) live in the
//! controller; stores are dumb.
//!
//! # Versioning
//! Every stored record carries a monotonic version, starting at 1 and bumped
//! by each successful write. `update` with `expected_version = Some(v)` is a
//! compare-and-swap; `None` is an unconditional last-writer-wins write.

use async_trait::async_trait;

use crate::domain::{StoreError, Task, TaskId, TaskPatch};

/// A task together with the version of the write that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTask {
    pub task: Task,
    pub version: u64,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, task: Task) -> Result<StoredTask, StoreError>;

    /// Point lookup. `Ok(None)` when the task does not exist.
    async fn get(&self, task_id: &TaskId) -> Result<Option<StoredTask>, StoreError>;

    /// Apply a field-level update.
    ///
    /// Fails with `NotFound` if the record is absent, and with
    /// `VersionConflict` if `expected_version` is given and stale.
    async fn update(
        &self,
        task_id: &TaskId,
        patch: &TaskPatch,
        expected_version: Option<u64>,
    ) -> Result<StoredTask, StoreError>;
}
