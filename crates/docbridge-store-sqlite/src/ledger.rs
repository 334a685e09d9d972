// crates/docbridge-store-sqlite/src/ledger.rs
// ============================================================================
// Module: SQLite Transmission Ledger
// Description: Durable TransmissionLedger backed by SQLite WAL.
// Purpose: Persist transmission rows with guarded status transitions and an
//          append-only transition history.
// Dependencies: docbridge-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`TransmissionLedger`] using `SQLite`.
//! Every status change runs inside a transaction that re-reads the current
//! status and applies the state machine, so concurrent writers cannot skip or
//! repeat a transition. Each applied change also appends one row to an
//! append-only history table; transmission rows are updated in place but
//! never deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use docbridge_core::Direction;
use docbridge_core::LedgerError;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::Receipt;
use docbridge_core::Timestamp;
use docbridge_core::Transmission;
use docbridge_core::TransmissionLedger;
use docbridge_core::TransmissionStatus;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the ledger.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` transmission ledger.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteLedgerConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteLedgerConfig {
    /// Creates a configuration with defaults for the given database path.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` ledger errors.
///
/// # Invariants
/// - Error messages avoid embedding payload bytes.
#[derive(Debug, Error, Clone)]
pub enum SqliteLedgerError {
    /// Ledger I/O error.
    #[error("sqlite ledger io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite ledger db error: {0}")]
    Db(String),
    /// Ledger schema version mismatch.
    #[error("sqlite ledger version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid stored data.
    #[error("sqlite ledger invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteLedgerError> for LedgerError {
    fn from(error: SqliteLedgerError) -> Self {
        match error {
            SqliteLedgerError::Io(message)
            | SqliteLedgerError::Db(message)
            | SqliteLedgerError::VersionMismatch(message) => Self::Storage(message),
            SqliteLedgerError::Invalid(message) => Self::Serialization(message),
        }
    }
}

// ============================================================================
// SECTION: Transition History
// ============================================================================

/// One appended transition history entry.
///
/// # Invariants
/// - History rows are append-only; they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Message identifier the entry belongs to.
    pub message_id: String,
    /// Status before the change; `None` for row creation.
    pub from_status: Option<TransmissionStatus>,
    /// Status after the change.
    pub to_status: TransmissionStatus,
    /// Optional error detail recorded with the change.
    pub detail: Option<String>,
    /// Instant the change was recorded.
    pub recorded_at: Timestamp,
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// `SQLite`-backed transmission ledger with WAL support.
///
/// # Invariants
/// - Status transitions re-check the stored status inside a transaction.
/// - Connection access is serialized through a mutex.
#[derive(Clone)]
pub struct SqliteLedger {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Opens an `SQLite`-backed transmission ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteLedgerConfig) -> Result<Self, SqliteLedgerError> {
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the append-only transition history for a message, oldest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteLedgerError`] when the query fails or a stored status
    /// label is unknown.
    pub fn history(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<TransitionRecord>, SqliteLedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteLedgerError::Db("ledger mutex poisoned".to_string()))?;
        let mut stmt = guard
            .prepare(
                "SELECT message_id, from_status, to_status, detail, recorded_at \
                 FROM transmission_events WHERE message_id = ?1 ORDER BY event_id ASC",
            )
            .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![message_id.as_str()], |row| {
                let message_id: String = row.get(0)?;
                let from_status: Option<String> = row.get(1)?;
                let to_status: String = row.get(2)?;
                let detail: Option<String> = row.get(3)?;
                let recorded_at: i64 = row.get(4)?;
                Ok((message_id, from_status, to_status, detail, recorded_at))
            })
            .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            let (message_id, from_status, to_status, detail, recorded_at) =
                row.map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
            let from_status = from_status.map(|label| parse_status(&label)).transpose()?;
            results.push(TransitionRecord {
                message_id,
                from_status,
                to_status: parse_status(&to_status)?,
                detail,
                recorded_at: Timestamp::from_unix_millis(recorded_at),
            });
        }
        Ok(results)
    }
}

impl TransmissionLedger for SqliteLedger {
    fn create(&self, message: &Message, direction: Direction) -> Result<Transmission, LedgerError> {
        let message_json = serde_json::to_string(message)
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        let now = Timestamp::now();
        let status = direction.initial_status();

        let mut guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        let tx = guard
            .transaction()
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        let inserted = tx.execute(
            "INSERT INTO transmissions \
             (message_id, direction, status, message_json, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.message_id.as_str(),
                direction.as_str(),
                status.as_str(),
                message_json,
                now.as_unix_millis(),
                now.as_unix_millis(),
            ],
        );
        let id = match inserted {
            Ok(_) => tx.last_insert_rowid(),
            Err(err) => {
                if is_constraint_violation(&err) {
                    return Err(LedgerError::Conflict(
                        message.message_id.as_str().to_string(),
                    ));
                }
                return Err(LedgerError::Storage(err.to_string()));
            }
        };
        append_event(&tx, message.message_id.as_str(), None, status, None, now)
            .map_err(LedgerError::from)?;
        tx.commit().map_err(|err| LedgerError::Storage(err.to_string()))?;

        Ok(Transmission {
            id,
            direction,
            message: message.clone(),
            status,
            receipt: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition(
        &self,
        message_id: &MessageId,
        new_status: TransmissionStatus,
        receipt: Option<&Receipt>,
        error: Option<&str>,
    ) -> Result<(), LedgerError> {
        let receipt_json = receipt
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        let now = Timestamp::now();

        let mut guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        let tx = guard
            .transaction()
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        let current: Option<String> = tx
            .query_row(
                "SELECT status FROM transmissions WHERE message_id = ?1",
                params![message_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        let current = current
            .ok_or_else(|| LedgerError::Missing(message_id.as_str().to_string()))?;
        let current = parse_status(&current).map_err(LedgerError::from)?;
        if !current.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }
        tx.execute(
            "UPDATE transmissions SET status = ?2, \
             receipt_json = COALESCE(?3, receipt_json), \
             error_message = COALESCE(?4, error_message), \
             updated_at = ?5 \
             WHERE message_id = ?1",
            params![
                message_id.as_str(),
                new_status.as_str(),
                receipt_json,
                error,
                now.as_unix_millis(),
            ],
        )
        .map_err(|err| LedgerError::Storage(err.to_string()))?;
        append_event(&tx, message_id.as_str(), Some(current), new_status, error, now)
            .map_err(LedgerError::from)?;
        tx.commit().map_err(|err| LedgerError::Storage(err.to_string()))
    }

    fn find(&self, message_id: &MessageId) -> Result<Option<Transmission>, LedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        let row = guard
            .query_row(
                "SELECT id, direction, status, message_json, receipt_json, error_message, \
                 created_at, updated_at FROM transmissions WHERE message_id = ?1",
                params![message_id.as_str()],
                |row| {
                    let id: i64 = row.get(0)?;
                    let direction: String = row.get(1)?;
                    let status: String = row.get(2)?;
                    let message_json: String = row.get(3)?;
                    let receipt_json: Option<String> = row.get(4)?;
                    let error_message: Option<String> = row.get(5)?;
                    let created_at: i64 = row.get(6)?;
                    let updated_at: i64 = row.get(7)?;
                    Ok((
                        id,
                        direction,
                        status,
                        message_json,
                        receipt_json,
                        error_message,
                        created_at,
                        updated_at,
                    ))
                },
            )
            .optional()
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        let Some((id, direction, status, message_json, receipt_json, error_message, created, updated)) =
            row
        else {
            return Ok(None);
        };
        let direction = Direction::from_label(&direction)
            .ok_or_else(|| LedgerError::Serialization(format!("unknown direction: {direction}")))?;
        let status = parse_status(&status).map_err(LedgerError::from)?;
        let message: Message = serde_json::from_str(&message_json)
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        let receipt: Option<Receipt> = receipt_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|err| LedgerError::Serialization(err.to_string()))?;
        Ok(Some(Transmission {
            id,
            direction,
            message,
            status,
            receipt,
            error_message,
            created_at: Timestamp::from_unix_millis(created),
            updated_at: Timestamp::from_unix_millis(updated),
        }))
    }

    fn readiness(&self) -> Result<(), LedgerError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        guard
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| LedgerError::Storage(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a stored status label.
fn parse_status(label: &str) -> Result<TransmissionStatus, SqliteLedgerError> {
    TransmissionStatus::from_label(label)
        .ok_or_else(|| SqliteLedgerError::Invalid(format!("unknown status: {label}")))
}

/// Appends one row to the transition history table.
fn append_event(
    tx: &rusqlite::Transaction<'_>,
    message_id: &str,
    from_status: Option<TransmissionStatus>,
    to_status: TransmissionStatus,
    detail: Option<&str>,
    recorded_at: Timestamp,
) -> Result<(), SqliteLedgerError> {
    tx.execute(
        "INSERT INTO transmission_events \
         (message_id, from_status, to_status, detail, recorded_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            message_id,
            from_status.map(TransmissionStatus::as_str),
            to_status.as_str(),
            detail,
            recorded_at.as_unix_millis(),
        ],
    )
    .map(|_| ())
    .map_err(|err| SqliteLedgerError::Db(err.to_string()))
}

/// Returns true when the error is a uniqueness constraint violation.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}

/// Creates the parent directory for the database file when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteLedgerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteLedgerError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Opens a connection with the configured pragmas applied.
fn open_connection(config: &SqliteLedgerConfig) -> Result<Connection, SqliteLedgerError> {
    let connection =
        Connection::open(&config.path).map_err(|err| SqliteLedgerError::Io(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "journal_mode", config.journal_mode.pragma_value())
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "synchronous", config.sync_mode.pragma_value())
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    connection
        .pragma_update(None, "foreign_keys", "on")
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    Ok(connection)
}

/// Creates tables and records the schema version on first open.
fn initialize_schema(connection: &Connection) -> Result<(), SqliteLedgerError> {
    let version: i64 = connection
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    if version != 0 && version != SCHEMA_VERSION {
        return Err(SqliteLedgerError::VersionMismatch(format!(
            "found schema version {version}, expected {SCHEMA_VERSION}"
        )));
    }
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS transmissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                direction TEXT NOT NULL,
                status TEXT NOT NULL,
                message_json TEXT NOT NULL,
                receipt_json TEXT,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transmissions_status
                ON transmissions(status);
            CREATE TABLE IF NOT EXISTS transmission_events (
                event_id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL,
                from_status TEXT,
                to_status TEXT NOT NULL,
                detail TEXT,
                recorded_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transmission_events_message
                ON transmission_events(message_id);",
        )
        .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    if version == 0 {
        connection
            .pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|err| SqliteLedgerError::Db(err.to_string()))?;
    }
    Ok(())
}
