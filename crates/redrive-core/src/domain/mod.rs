//! Domain model (ids, task record, status graph, retry policy, outcomes,
//! diagnostics, errors).
//!
//! Nothing in here performs I/O; the controller and triage in `app` combine
//! these types with the ports.

pub mod diagnostic;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod retry;
pub mod state;
pub mod task;

pub use diagnostic::{DeadLetterDiagnostic, DiagnosticContext, Recorded};
pub use envelope::{Delivery, TaskMessage};
pub use errors::{ConfigError, IngressError, QueueError, StoreError, WorkError};
pub use ids::{ReceiptHandle, TaskId};
pub use outcome::{ProcessOutcome, Settlement, SkipReason, WriteStage};
pub use retry::RetryPolicy;
pub use state::TaskStatus;
pub use task::{Task, TaskPatch};
