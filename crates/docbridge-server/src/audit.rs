// crates/docbridge-server/src/audit.rs
// ============================================================================
// Module: Server Audit Sink
// Description: Compliance audit sink that logs JSON lines to stderr.
// Purpose: Give operators a machine-readable record of every exchange action.
// Dependencies: docbridge-core, serde_json
// ============================================================================

//! ## Overview
//! The server records every exchange audit event as one JSON line on stderr.
//! Lines carry the action, message scope, outcome, detail, and duration; they
//! never include payload bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use docbridge_core::AuditEvent;
use docbridge_core::AuditSink;
use docbridge_core::MessageId;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Default)]
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Renders one event as a JSON line.
    fn render(event: &AuditEvent) -> String {
        serde_json::json!({
            "action": event.action.as_str(),
            "message_id": event.message_id.as_ref().map(MessageId::as_str),
            "outcome": event.outcome.as_str(),
            "detail": event.detail,
            "duration_ms": u64::try_from(event.duration.as_millis()).unwrap_or(u64::MAX),
        })
        .to_string()
    }
}

impl AuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is this sink's output channel.")]
    fn record(&self, event: AuditEvent) {
        eprintln!("{}", Self::render(&event));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
