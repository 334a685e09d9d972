// crates/docbridge-store-sqlite/src/lib.rs
// ============================================================================
// Module: Docbridge SQLite Store Library
// Description: Durable SQLite-backed transmission ledger.
// Purpose: Provide the persistent TransmissionLedger implementation used by
//          the access point server.
// Dependencies: docbridge-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Docbridge `SQLite` Store persists transmission rows in a single `SQLite`
//! database file. Status transitions are checked against the transmission
//! state machine inside a transaction, and every applied change is appended
//! to an event history table for audit.
//! Invariants:
//! - Transmission rows are never deleted; terminal rows stay readable.
//! - The history table is append-only.
//! - A schema version mismatch refuses to open the database.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ledger;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ledger::SqliteJournalMode;
pub use ledger::SqliteLedger;
pub use ledger::SqliteLedgerConfig;
pub use ledger::SqliteLedgerError;
pub use ledger::SqliteSyncMode;
pub use ledger::TransitionRecord;
