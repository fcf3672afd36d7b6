//! UnitOfWork port - the opaque work a task stands for.

use async_trait::async_trait;

use crate::domain::{Task, WorkError};

/// The work performed for one delivery of a task.
///
/// Invoked exactly once per delivery that the controller accepts. The
/// controller only observes success or failure; it never interprets the
/// payload.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn run(&self, task: &Task) -> Result<(), WorkError>;
}
