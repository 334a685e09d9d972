// crates/docbridge-core/src/lib.rs
// ============================================================================
// Module: Docbridge Core Library
// Description: Data model, state machine, and interfaces for the access point.
// Purpose: Provide the shared vocabulary used by all Docbridge crates.
// Dependencies: serde, serde_json, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Docbridge Core defines the participant, message, receipt, and transmission
//! model for the Peppol document exchange layer, plus the backend-agnostic
//! interfaces (ledger, document profiles, audit sink) that surrounding crates
//! implement.
//! Invariants:
//! - Participant schemes belong to a closed registry; unknown schemes fail at
//!   construction time.
//! - Transmission status transitions are one-way and validated centrally.
//! - Core types never perform network or storage I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::hashing;
pub use core::identifiers::ConversationId;
pub use core::identifiers::DocumentTypeId;
pub use core::identifiers::MessageId;
pub use core::identifiers::ParticipantId;
pub use core::identifiers::ProcessId;
pub use core::identifiers::SchemeError;
pub use core::identifiers::TransportProfile;
pub use core::identifiers::supported_schemes;
pub use core::message::Message;
pub use core::message::Receipt;
pub use core::message::ReceiptStatus;
pub use core::message::error_codes;
pub use core::profile::DocumentProfile;
pub use core::profile::MapperError;
pub use core::time::Timestamp;
pub use core::transmission::Direction;
pub use core::transmission::Transmission;
pub use core::transmission::TransmissionStatus;
pub use core::xmlscan;
pub use interfaces::AuditAction;
pub use interfaces::AuditEvent;
pub use interfaces::AuditOutcome;
pub use interfaces::AuditSink;
pub use interfaces::DocumentMapper;
pub use interfaces::LedgerError;
pub use interfaces::MemoryAudit;
pub use interfaces::MemoryLedger;
pub use interfaces::NoopAudit;
pub use interfaces::PassthroughMapper;
pub use interfaces::TransmissionLedger;
