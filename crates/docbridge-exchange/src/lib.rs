// crates/docbridge-exchange/src/lib.rs
// ============================================================================
// Module: Docbridge Exchange Library
// Description: AS4 envelope exchange: build, sign, deliver, receive.
// Purpose: Orchestrate outbound and inbound document exchange over trusted
//          transport against the transmission ledger.
// Dependencies: docbridge-core, docbridge-directory, docbridge-identity,
//               base64, rand, reqwest, thiserror
// ============================================================================

//! ## Overview
//! Docbridge Exchange implements the message exchange flows: the AS4-style
//! envelope and receipt wire formats with a deterministic signing input, a
//! trusted transport that installs the resolved peer certificate as its only
//! TLS root, and the send/receive orchestration over the transmission ledger.
//! Invariants:
//! - An outbound row is created `Pending` before any network I/O and ends in
//!   a terminal state for every dispatched attempt.
//! - Certificate pinning is enforced before any connection is opened.
//! - Inbound processing always answers with a receipt; inbound duplicates
//!   return the stored receipt unchanged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod envelope;
pub mod exchange;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use envelope::CLOCK_SKEW_SECS;
pub use envelope::Envelope;
pub use envelope::EnvelopeError;
pub use envelope::FRESHNESS_WINDOW_SECS;
pub use envelope::parse_receipt;
pub use envelope::receipt_to_xml;
pub use exchange::CancelToken;
pub use exchange::MessageExchange;
pub use exchange::MessageIdGenerator;
pub use exchange::SendError;
pub use exchange::SendRequest;
pub use transport::MessageTransport;
pub use transport::TransportConfig;
pub use transport::TransportError;
