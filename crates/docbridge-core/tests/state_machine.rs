// crates/docbridge-core/tests/state_machine.rs
// ============================================================================
// Module: Transmission State Machine Unit Tests
// Description: Transition matrix and in-memory ledger behavior tests.
// Purpose: Verify one-way transitions and ledger audit invariants.
// ============================================================================

//! ## Overview
//! Unit tests for the transmission state machine and the in-memory reference
//! ledger:
//! - Legal and illegal transitions across outbound and inbound lifecycles.
//! - Ledger create/transition/find semantics, duplicate rejection, and
//!   receipt capture.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use docbridge_core::ConversationId;
use docbridge_core::Direction;
use docbridge_core::DocumentTypeId;
use docbridge_core::LedgerError;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::MemoryLedger;
use docbridge_core::ParticipantId;
use docbridge_core::ProcessId;
use docbridge_core::Receipt;
use docbridge_core::Timestamp;
use docbridge_core::TransmissionLedger;
use docbridge_core::TransmissionStatus;

fn sample_message(id: &str) -> Message {
    Message {
        message_id: MessageId::new(id),
        conversation_id: ConversationId::new("conv-1"),
        timestamp: Timestamp::from_unix_millis(1_700_000_000_000),
        from: ParticipantId::new("0192", "987654325").expect("valid sender"),
        to: ParticipantId::new("0088", "5798000000001").expect("valid receiver"),
        document_type: DocumentTypeId::new("urn:test:invoice"),
        process: ProcessId::new("urn:test:billing"),
        payload: b"<Invoice/>".to_vec(),
    }
}

#[test]
fn outbound_transitions_are_one_way() {
    use TransmissionStatus as S;
    assert!(S::Pending.can_transition_to(S::Sent));
    assert!(S::Pending.can_transition_to(S::Failed));
    assert!(S::Sent.can_transition_to(S::Delivered));
    assert!(S::Sent.can_transition_to(S::Failed));
    assert!(!S::Sent.can_transition_to(S::Pending));
    assert!(!S::Delivered.can_transition_to(S::Failed));
    assert!(!S::Failed.can_transition_to(S::Sent));
    assert!(!S::Pending.can_transition_to(S::Delivered));
}

#[test]
fn inbound_transitions_are_one_way() {
    use TransmissionStatus as S;
    assert!(S::Received.can_transition_to(S::Processed));
    assert!(S::Received.can_transition_to(S::Rejected));
    assert!(!S::Processed.can_transition_to(S::Rejected));
    assert!(!S::Rejected.can_transition_to(S::Processed));
    assert!(!S::Received.can_transition_to(S::Sent));
}

#[test]
fn terminal_states_are_closed() {
    use TransmissionStatus as S;
    for terminal in [S::Delivered, S::Failed, S::Processed, S::Rejected] {
        assert!(terminal.is_terminal());
        for next in [S::Pending, S::Sent, S::Delivered, S::Failed, S::Received, S::Processed] {
            assert!(!terminal.can_transition_to(next));
        }
    }
}

#[test]
fn status_labels_round_trip() {
    use TransmissionStatus as S;
    for status in [S::Pending, S::Sent, S::Delivered, S::Failed, S::Received, S::Processed, S::Rejected]
    {
        assert_eq!(TransmissionStatus::from_label(status.as_str()), Some(status));
    }
    assert_eq!(TransmissionStatus::from_label("unknown"), None);
}

#[test]
fn ledger_creates_rows_in_initial_status() {
    let ledger = MemoryLedger::new();
    let outbound = ledger
        .create(&sample_message("m-out"), Direction::Outbound)
        .expect("outbound row");
    assert_eq!(outbound.status, TransmissionStatus::Pending);
    let inbound = ledger
        .create(&sample_message("m-in"), Direction::Inbound)
        .expect("inbound row");
    assert_eq!(inbound.status, TransmissionStatus::Received);
}

#[test]
fn ledger_rejects_duplicate_message_ids() {
    let ledger = MemoryLedger::new();
    let message = sample_message("m-dup");
    ledger.create(&message, Direction::Outbound).expect("first row");
    let err = ledger.create(&message, Direction::Outbound).expect_err("duplicate row");
    assert_eq!(err, LedgerError::Conflict("m-dup".to_string()));
}

#[test]
fn ledger_rejects_invalid_transitions() {
    let ledger = MemoryLedger::new();
    let message = sample_message("m-bad");
    ledger.create(&message, Direction::Outbound).expect("row");
    let err = ledger
        .transition(&message.message_id, TransmissionStatus::Delivered, None, None)
        .expect_err("pending cannot deliver");
    assert_eq!(
        err,
        LedgerError::InvalidTransition {
            from: TransmissionStatus::Pending,
            to: TransmissionStatus::Delivered,
        }
    );
}

#[test]
fn ledger_records_receipt_and_error_payloads() {
    let ledger = MemoryLedger::new();
    let message = sample_message("m-full");
    ledger.create(&message, Direction::Outbound).expect("row");
    ledger
        .transition(&message.message_id, TransmissionStatus::Sent, None, None)
        .expect("pending to sent");
    let receipt = Receipt::success(message.message_id.clone(), Timestamp::now());
    ledger
        .transition(&message.message_id, TransmissionStatus::Delivered, Some(&receipt), None)
        .expect("sent to delivered");
    let row = ledger.find(&message.message_id).expect("find").expect("row exists");
    assert_eq!(row.status, TransmissionStatus::Delivered);
    assert_eq!(row.receipt, Some(receipt));
    assert!(row.updated_at >= row.created_at);
}

#[test]
fn ledger_transition_on_missing_row_fails() {
    let ledger = MemoryLedger::new();
    let err = ledger
        .transition(&MessageId::new("m-none"), TransmissionStatus::Sent, None, None)
        .expect_err("missing row");
    assert_eq!(err, LedgerError::Missing("m-none".to_string()));
}
