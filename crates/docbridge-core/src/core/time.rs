// crates/docbridge-core/src/core/time.rs
// ============================================================================
// Module: Docbridge Time Model
// Description: Canonical timestamp representation for messages and ledger rows.
// Purpose: Provide a single millisecond-precision time value with RFC 3339
//          wire formatting.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Docbridge embeds explicit timestamps in envelopes, receipts, and ledger
//! rows. The wire form is RFC 3339 with UTC offset; the in-memory form is
//! unix milliseconds so ordering and freshness-window arithmetic stay cheap
//! and deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp (unix epoch milliseconds, UTC).
///
/// # Invariants
/// - Values round-trip through RFC 3339 at millisecond precision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Self(truncate_nanos(nanos))
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted forward by the given number of seconds.
    #[must_use]
    pub const fn plus_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds.saturating_mul(1_000)))
    }

    /// Returns the RFC 3339 wire form.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let nanos = i128::from(self.0).saturating_mul(1_000_000);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .and_then(|value| value.format(&Rfc3339).ok())
            .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
    }

    /// Parses an RFC 3339 wire form.
    #[must_use]
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339).ok()?;
        Some(Self(truncate_nanos(parsed.unix_timestamp_nanos())))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Truncates a nanosecond epoch value to whole milliseconds.
#[allow(clippy::cast_possible_truncation, reason = "Range is clamped to i64 millis first.")]
const fn truncate_nanos(nanos: i128) -> i64 {
    let millis = nanos / 1_000_000;
    if millis > i64::MAX as i128 {
        i64::MAX
    } else if millis < i64::MIN as i128 {
        i64::MIN
    } else {
        millis as i64
    }
}
