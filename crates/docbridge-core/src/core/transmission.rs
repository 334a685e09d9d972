// crates/docbridge-core/src/core/transmission.rs
// ============================================================================
// Module: Docbridge Transmission State
// Description: Durable exchange-attempt record and its status state machine.
// Purpose: Capture auditable, one-way transmission evolution.
// Dependencies: crate::core::{message, time}, serde
// ============================================================================

//! ## Overview
//! Every outbound or inbound exchange attempt is recorded as a
//! [`Transmission`]. Status evolution is a one-way state machine validated by
//! [`TransmissionStatus::can_transition_to`]; the ledger enforces it as a
//! hard invariant because the record is the audit trail. Rows are never
//! deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::message::Message;
use crate::core::message::Receipt;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Direction
// ============================================================================

/// Exchange direction for a transmission.
///
/// # Invariants
/// - Variants are stable for serialization and ledger storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Message sent by this access point.
    Outbound,
    /// Message received by this access point.
    Inbound,
}

impl Direction {
    /// Returns the stable label for the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "outbound",
            Self::Inbound => "inbound",
        }
    }

    /// Parses a stable label into a direction.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "outbound" => Some(Self::Outbound),
            "inbound" => Some(Self::Inbound),
            _ => None,
        }
    }

    /// Returns the initial status for a transmission in this direction.
    #[must_use]
    pub const fn initial_status(self) -> TransmissionStatus {
        match self {
            Self::Outbound => TransmissionStatus::Pending,
            Self::Inbound => TransmissionStatus::Received,
        }
    }
}

// ============================================================================
// SECTION: Status State Machine
// ============================================================================

/// Transmission lifecycle status.
///
/// Outbound: `Pending -> Sent -> {Delivered | Failed}`, with `Pending ->
/// Failed` permitted for attempts that fail before any network dispatch.
/// Inbound: `Received -> {Processed | Rejected}`.
///
/// # Invariants
/// - Transitions are one-way; terminal states accept no further moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionStatus {
    /// Outbound row created, no network I/O attempted yet.
    Pending,
    /// Envelope dispatched, awaiting acknowledgment.
    Sent,
    /// Peer acknowledged with a success receipt.
    Delivered,
    /// Attempt failed (discovery, trust, transport, or peer rejection).
    Failed,
    /// Inbound envelope accepted for processing.
    Received,
    /// Inbound message verified and processed.
    Processed,
    /// Inbound message rejected (kept for audit).
    Rejected,
}

impl TransmissionStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Received => "received",
            Self::Processed => "processed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a stable label into a status.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            "received" => Some(Self::Received),
            "processed" => Some(Self::Processed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true when the status accepts no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Processed | Self::Rejected)
    }

    /// Returns true when moving to `next` is a legal one-way transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Sent)
                | (Self::Pending, Self::Failed)
                | (Self::Sent, Self::Delivered)
                | (Self::Sent, Self::Failed)
                | (Self::Received, Self::Processed)
                | (Self::Received, Self::Rejected)
        )
    }
}

impl core::fmt::Display for TransmissionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Transmission Record
// ============================================================================

/// Durable record of a single exchange attempt.
///
/// # Invariants
/// - `status` only evolves along [`TransmissionStatus::can_transition_to`].
/// - `receipt` is present once a peer acknowledgment has been recorded.
/// - `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmission {
    /// Ledger row identifier.
    pub id: i64,
    /// Exchange direction.
    pub direction: Direction,
    /// Message carried by this attempt.
    pub message: Message,
    /// Current lifecycle status.
    pub status: TransmissionStatus,
    /// Acknowledgment recorded for this attempt, when available.
    pub receipt: Option<Receipt>,
    /// Error description recorded for failed or rejected attempts.
    pub error_message: Option<String>,
    /// Row creation timestamp.
    pub created_at: Timestamp,
    /// Last status-change timestamp.
    pub updated_at: Timestamp,
}
