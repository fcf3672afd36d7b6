//! Impls - in-process implementations of the ports.
//!
//! # Included
//! - **InMemoryTaskStore**: versioned record store
//! - **InMemoryQueue**: task queue + dead-letter queue with receive counts,
//!   visibility windows and redrive
//! - **TracingDiagnosticSink** / **MemoryDiagnosticSink**
//! - **fault** (tests / `fault-injection` feature): failing units of work
//!
//! Hosted backends (a managed queue, a managed key-value table) implement the
//! same ports in their own crates.

pub mod memory_queue;
pub mod memory_store;
pub mod sink;

#[cfg(any(test, feature = "fault-injection"))]
pub mod fault;

pub use self::memory_queue::{ChannelSnapshot, InMemoryQueue, MessageChannel, QueueSnapshot};
pub use self::memory_store::InMemoryTaskStore;
pub use self::sink::{MemoryDiagnosticSink, TracingDiagnosticSink};
