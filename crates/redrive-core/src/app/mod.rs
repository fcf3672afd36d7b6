//! App - the application layer.
//!
//! Combines the ports into the task lifecycle.
//!
//! # Components
//! - **AppBuilder**: wiring and fail-fast validation
//! - **Ingress**: submission → SUBMITTED record + task message
//! - **LifecycleController**: one delivery → `ProcessOutcome`
//! - **DeadLetterTriage**: dead-letter delivery → DEAD_LETTER + diagnostic
//! - **WorkerGroup**: runs controller and triage against the queues
//! - **StatusCounts**: per-status view of the records

pub mod builder;
pub mod controller;
pub mod ingress;
pub mod status;
pub mod triage;
pub mod worker_loop;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::controller::LifecycleController;
pub use self::ingress::{Ingress, SubmitReceipt, SubmitRequest};
pub use self::status::StatusCounts;
pub use self::triage::DeadLetterTriage;
pub use self::worker_loop::WorkerGroup;
