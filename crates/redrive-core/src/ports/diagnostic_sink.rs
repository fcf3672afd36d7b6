//! DiagnosticSink port - where dead-letter diagnostics go.
//!
//! # Implementations
//! - `TracingDiagnosticSink`: one structured `tracing` event per task
//! - `MemoryDiagnosticSink`: collects records (tests, demos)

use crate::domain::DeadLetterDiagnostic;

/// Receives the terminal audit record of a dead-lettered task.
///
/// Emission is infallible from triage's point of view: a sink that can fail
/// must handle it internally, because triage has nowhere to report it.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &DeadLetterDiagnostic);
}
