//! Ports - the seams to external collaborators.
//!
//! Each trait hides one collaborator the lifecycle controller depends on:
//! the record store, the queue substrate, the unit of work, the diagnostic
//! sink, plus clock and id generation. Everything is injected as
//! `Arc<dyn …>`; there are no ambient clients.

pub mod clock;
pub mod delivery_queue;
pub mod diagnostic_sink;
pub mod id_generator;
pub mod task_store;
pub mod unit_of_work;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery_queue::{MessagePublisher, MessageSource, RedeliveryScheduler};
pub use self::diagnostic_sink::DiagnosticSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::{StoredTask, TaskStore};
pub use self::unit_of_work::UnitOfWork;
