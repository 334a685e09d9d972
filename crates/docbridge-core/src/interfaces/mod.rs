// crates/docbridge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Docbridge Interfaces
// Description: Backend-agnostic interfaces for ledger storage, document
//              mapping, and audit hooks.
// Purpose: Define the contract surfaces used by the exchange layer.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the exchange layer integrates with storage and
//! compliance logging without embedding backend-specific details. The ledger
//! is the single writer for transmission status; implementations must reject
//! illegal transitions as a hard invariant because the ledger is the audit
//! trail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

use crate::core::identifiers::MessageId;
use crate::core::message::Message;
use crate::core::message::Receipt;
use crate::core::profile::DocumentProfile;
use crate::core::profile::MapperError;
use crate::core::time::Timestamp;
use crate::core::transmission::Direction;
use crate::core::transmission::Transmission;
use crate::core::transmission::TransmissionStatus;

// ============================================================================
// SECTION: Ledger Errors
// ============================================================================

/// Transmission ledger errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding raw payload bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Ledger storage is unavailable or reported an I/O failure.
    #[error("ledger storage error: {0}")]
    Storage(String),
    /// A row already exists for the message identifier.
    #[error("ledger conflict: transmission already exists for {0}")]
    Conflict(String),
    /// No row exists for the message identifier.
    #[error("ledger missing transmission for {0}")]
    Missing(String),
    /// Requested status change violates the state machine.
    #[error("invalid transmission transition from {from} to {to}")]
    InvalidTransition {
        /// Status currently recorded.
        from: TransmissionStatus,
        /// Status that was requested.
        to: TransmissionStatus,
    },
    /// Stored row failed to serialize or deserialize.
    #[error("ledger serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Transmission Ledger
// ============================================================================

/// Durable, append-only record of exchange attempts.
///
/// Writes for a single message identifier are serialized by the
/// implementation; writes for distinct identifiers may proceed in parallel.
pub trait TransmissionLedger: Send + Sync {
    /// Creates a row in the direction's initial status, before any network
    /// I/O for outbound attempts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Conflict`] for duplicate message identifiers
    /// and [`LedgerError::Storage`] when storage is unavailable.
    fn create(&self, message: &Message, direction: Direction) -> Result<Transmission, LedgerError>;

    /// Applies a status transition, recording the receipt or error payload.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidTransition`] for moves the state machine
    /// forbids and [`LedgerError::Missing`] for unknown message identifiers.
    fn transition(
        &self,
        message_id: &MessageId,
        new_status: TransmissionStatus,
        receipt: Option<&Receipt>,
        error: Option<&str>,
    ) -> Result<(), LedgerError>;

    /// Returns the current row for a message identifier, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] when storage is unavailable.
    fn find(&self, message_id: &MessageId) -> Result<Option<Transmission>, LedgerError>;

    /// Reports ledger readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the ledger is unavailable.
    fn readiness(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Ledger
// ============================================================================

/// In-memory reference ledger for tests and embedded use.
///
/// # Invariants
/// - Enforces the same transition rules as durable implementations.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// Rows keyed by message identifier.
    rows: Mutex<BTreeMap<String, Transmission>>,
}

impl MemoryLedger {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransmissionLedger for MemoryLedger {
    fn create(&self, message: &Message, direction: Direction) -> Result<Transmission, LedgerError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))?;
        let key = message.message_id.as_str().to_string();
        if rows.contains_key(&key) {
            return Err(LedgerError::Conflict(key));
        }
        let now = Timestamp::now();
        let id = i64::try_from(rows.len())
            .map_err(|_| LedgerError::Storage("row count overflow".to_string()))?
            + 1;
        let row = Transmission {
            id,
            direction,
            message: message.clone(),
            status: direction.initial_status(),
            receipt: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(key, row.clone());
        Ok(row)
    }

    fn transition(
        &self,
        message_id: &MessageId,
        new_status: TransmissionStatus,
        receipt: Option<&Receipt>,
        error: Option<&str>,
    ) -> Result<(), LedgerError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))?;
        let row = rows
            .get_mut(message_id.as_str())
            .ok_or_else(|| LedgerError::Missing(message_id.as_str().to_string()))?;
        if !row.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                from: row.status,
                to: new_status,
            });
        }
        row.status = new_status;
        if let Some(receipt) = receipt {
            row.receipt = Some(receipt.clone());
        }
        if let Some(error) = error {
            row.error_message = Some(error.to_string());
        }
        row.updated_at = Timestamp::now();
        Ok(())
    }

    fn find(&self, message_id: &MessageId) -> Result<Option<Transmission>, LedgerError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".to_string()))?;
        Ok(rows.get(message_id.as_str()).cloned())
    }
}

// ============================================================================
// SECTION: Document Mapping
// ============================================================================

/// Maps business documents into exchange payload bytes.
///
/// Content transformation stays behind this seam; the exchange layer carries
/// payloads opaquely.
pub trait DocumentMapper: Send + Sync {
    /// Maps a source document into envelope payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError`] when the source document cannot be mapped.
    fn map_to_payload(&self, document: &[u8]) -> Result<Vec<u8>, MapperError>;
}

impl DocumentMapper for DocumentProfile {
    fn map_to_payload(&self, document: &[u8]) -> Result<Vec<u8>, MapperError> {
        let value: serde_json::Value = serde_json::from_slice(document)
            .map_err(|err| MapperError::Invalid(err.to_string()))?;
        self.to_envelope_payload(&value)
    }
}

/// Mapper that carries documents unchanged.
///
/// # Invariants
/// - Output bytes equal input bytes for every document.
#[derive(Debug, Default)]
pub struct PassthroughMapper;

impl DocumentMapper for PassthroughMapper {
    fn map_to_payload(&self, document: &[u8]) -> Result<Vec<u8>, MapperError> {
        Ok(document.to_vec())
    }
}

// ============================================================================
// SECTION: Audit Hook
// ============================================================================

/// Exchange actions recorded for compliance logging.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// Outbound send attempt.
    Send,
    /// Inbound envelope processing.
    Receive,
    /// Directory endpoint resolution.
    Resolve,
    /// Identity rotation.
    Rotate,
    /// Access point startup checks.
    Startup,
}

impl AuditAction {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Resolve => "resolve",
            Self::Rotate => "rotate",
            Self::Startup => "startup",
        }
    }
}

/// Audit outcome classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Action completed successfully.
    Ok,
    /// Action completed with a warning.
    Warning,
    /// Action failed.
    Error,
}

impl AuditOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Compliance audit event emitted by the exchange layer.
///
/// # Invariants
/// - `message_id` is `None` only for actions without a message scope.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Action performed.
    pub action: AuditAction,
    /// Message identifier when the action is message-scoped.
    pub message_id: Option<MessageId>,
    /// Action outcome.
    pub outcome: AuditOutcome,
    /// Optional detail string (error code or warning text).
    pub detail: Option<String>,
    /// Action duration.
    pub duration: Duration,
}

/// Audit sink for compliance logging.
pub trait AuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: AuditEvent);
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
#[derive(Debug, Default)]
pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn record(&self, _event: AuditEvent) {}
}

/// In-memory audit sink for tests.
///
/// # Invariants
/// - Events are appended in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    /// Creates an empty in-memory audit sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
