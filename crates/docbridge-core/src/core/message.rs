// crates/docbridge-core/src/core/message.rs
// ============================================================================
// Module: Docbridge Messages and Receipts
// Description: Business message and delivery acknowledgment types.
// Purpose: Carry exchange payloads and outcomes with stable wire semantics.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`Message`] is the unit handed to the exchange layer: identifiers,
//! parties, document/process classification, and raw payload bytes. A
//! [`Receipt`] is the acknowledgment produced for exactly one prior message.
//! Receipt error codes are stable strings shared by both exchange directions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ConversationId;
use crate::core::identifiers::DocumentTypeId;
use crate::core::identifiers::MessageId;
use crate::core::identifiers::ParticipantId;
use crate::core::identifiers::ProcessId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Stable receipt error codes used on the wire.
pub mod error_codes {
    /// Envelope could not be parsed as XML.
    pub const ENVELOPE_MALFORMED: &str = "DB:0001";
    /// Envelope signature failed verification.
    pub const SIGNATURE_INVALID: &str = "DB:0002";
    /// Party identifiers were missing or outside the scheme registry.
    pub const PARTY_INVALID: &str = "DB:0003";
    /// Payload was missing or empty.
    pub const PAYLOAD_EMPTY: &str = "DB:0004";
    /// Security freshness window was missing or expired.
    pub const SECURITY_STALE: &str = "DB:0005";
    /// Peer certificate was outside the pinned trust set.
    pub const PEER_UNTRUSTED: &str = "DB:0006";
    /// Transport-level failure synthesized locally.
    pub const TRANSPORT_FAILURE: &str = "DB:0007";
}

// ============================================================================
// SECTION: Message
// ============================================================================

/// Business message exchanged between two participants.
///
/// # Invariants
/// - `message_id` is unique per send attempt and never reused.
/// - `payload` holds the mapped business-document bytes unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, unique per send attempt.
    pub message_id: MessageId,
    /// Conversation identifier grouping related messages.
    pub conversation_id: ConversationId,
    /// Message creation timestamp.
    pub timestamp: Timestamp,
    /// Sending participant.
    pub from: ParticipantId,
    /// Receiving participant.
    pub to: ParticipantId,
    /// Business-document type identifier.
    pub document_type: DocumentTypeId,
    /// Exchange process identifier.
    pub process: ProcessId,
    /// Raw business-document payload bytes.
    pub payload: Vec<u8>,
}

// ============================================================================
// SECTION: Receipt
// ============================================================================

/// Receipt status reported by the processing side.
///
/// # Invariants
/// - Variants are stable for serialization and wire matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Message was accepted and processed.
    Success,
    /// Message was accepted with a non-fatal warning.
    Warning,
    /// Message was rejected.
    Failure,
}

impl ReceiptStatus {
    /// Returns the wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Failure => "Failure",
        }
    }

    /// Parses a wire label into a status.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(Self::Success),
            "Warning" => Some(Self::Warning),
            "Failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Delivery acknowledgment referencing exactly one prior message.
///
/// # Invariants
/// - `error_code` and `error_description` are present only for non-success
///   statuses and are carried verbatim from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Identifier of the acknowledged message.
    pub ref_to_message_id: MessageId,
    /// Acknowledgment timestamp.
    pub timestamp: Timestamp,
    /// Acknowledgment status.
    pub status: ReceiptStatus,
    /// Stable error code for non-success statuses.
    pub error_code: Option<String>,
    /// Human-readable error description for non-success statuses.
    pub error_description: Option<String>,
}

impl Receipt {
    /// Creates a success receipt for the given message.
    #[must_use]
    pub const fn success(ref_to_message_id: MessageId, timestamp: Timestamp) -> Self {
        Self {
            ref_to_message_id,
            timestamp,
            status: ReceiptStatus::Success,
            error_code: None,
            error_description: None,
        }
    }

    /// Creates a failure receipt with a stable error code.
    #[must_use]
    pub fn failure(
        ref_to_message_id: MessageId,
        timestamp: Timestamp,
        code: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            ref_to_message_id,
            timestamp,
            status: ReceiptStatus::Failure,
            error_code: Some(code.to_string()),
            error_description: Some(description.into()),
        }
    }

    /// Returns true when the receipt reports successful processing.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, ReceiptStatus::Success)
    }
}
