//! Diagnostic sinks.

use std::sync::Mutex;

use tracing::error;

use crate::domain::DeadLetterDiagnostic;
use crate::domain::diagnostic::DEAD_LETTER_EVENT;
use crate::ports::DiagnosticSink;

/// Log target of dead-letter diagnostics, for filtering and routing.
pub const DEAD_LETTER_TARGET: &str = "redrive::dead_letter";

/// Emits each diagnostic as a single `tracing` event at ERROR level.
///
/// The full record travels as JSON in the `record` field so a JSON log
/// pipeline receives it in one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&self, diagnostic: &DeadLetterDiagnostic) {
        let record = serde_json::to_string(diagnostic)
            .unwrap_or_else(|e| format!("{{\"serializationError\":\"{e}\"}}"));
        error!(
            target: DEAD_LETTER_TARGET,
            event = DEAD_LETTER_EVENT,
            task_id = %diagnostic.task_id,
            attempts = %diagnostic.attempts,
            last_error = %diagnostic.last_error,
            complete = diagnostic.is_complete(),
            record = %record,
            "{}",
            diagnostic.message
        );
    }
}

/// Keeps every emitted diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnosticSink {
    records: Mutex<Vec<DeadLetterDiagnostic>>,
}

impl MemoryDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DeadLetterDiagnostic> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DiagnosticSink for MemoryDiagnosticSink {
    fn emit(&self, diagnostic: &DeadLetterDiagnostic) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
