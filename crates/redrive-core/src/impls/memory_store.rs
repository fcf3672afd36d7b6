//! In-memory record store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::app::status::StatusCounts;
use crate::domain::{StoreError, Task, TaskId, TaskPatch};
use crate::ports::{StoredTask, TaskStore};

/// Versioned task records behind a single async mutex.
///
/// The lock is never held across an await outside this type.
#[derive(Default)]
pub struct InMemoryTaskStore {
    records: Mutex<HashMap<TaskId, StoredTask>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Remove a record, as an out-of-band retention job would.
    pub async fn remove(&self, task_id: &TaskId) -> Option<Task> {
        self.records.lock().await.remove(task_id).map(|s| s.task)
    }

    /// Status view over every stored task.
    pub async fn counts_by_status(&self) -> StatusCounts {
        let records = self.records.lock().await;
        StatusCounts::tally(records.values().map(|s| s.task.status))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<StoredTask, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&task.task_id) {
            return Err(StoreError::AlreadyExists(task.task_id));
        }
        let stored = StoredTask { task, version: 1 };
        records.insert(stored.task.task_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<StoredTask>, StoreError> {
        Ok(self.records.lock().await.get(task_id).cloned())
    }

    async fn update(
        &self,
        task_id: &TaskId,
        patch: &TaskPatch,
        expected_version: Option<u64>,
    ) -> Result<StoredTask, StoreError> {
        let mut records = self.records.lock().await;
        let Some(stored) = records.get_mut(task_id) else {
            return Err(StoreError::NotFound(task_id.clone()));
        };
        if let Some(expected) = expected_version
            && stored.version != expected
        {
            return Err(StoreError::VersionConflict {
                task_id: task_id.clone(),
                expected,
                actual: stored.version,
            });
        }
        stored.task.apply(patch);
        stored.version += 1;
        Ok(stored.clone())
    }
}
