//! Domain identifiers.
//!
//! Task ids are opaque: ingress either accepts the caller's id verbatim or
//! generates one. Generated ids are ULID based so they sort by creation time
//! and can be produced on any node without coordination.
//!
//! Receipt handles are issued by the queue substrate per delivery and are
//! only meaningful to the substrate that issued them.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Prefix used for generated task ids.
const TASK_PREFIX: &str = "task-";

/// Identifier of a task (the key of the record store).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self(format!("{TASK_PREFIX}{ulid}"))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle of one delivery, used to delay or acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for ReceiptHandle {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
