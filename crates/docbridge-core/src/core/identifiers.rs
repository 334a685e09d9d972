// crates/docbridge-core/src/core/identifiers.rs
// ============================================================================
// Module: Docbridge Identifiers
// Description: Scheme-validated participant identifiers and opaque wire ids.
// Purpose: Provide strongly typed identifiers with stable wire forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! This module defines the identifiers carried on the Peppol wire. The
//! participant identifier is validated against a closed registry of supported
//! ISO 6523 schemes at construction time; every other identifier is opaque
//! and carried unchanged from request to envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Scheme Registry
// ============================================================================

/// Entry in the closed registry of supported participant schemes.
///
/// # Invariants
/// - `code` is the ISO 6523 ICD code used as the scheme qualifier on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeEntry {
    /// ISO 6523 ICD code (four digits).
    pub code: &'static str,
    /// Human-readable registry name.
    pub name: &'static str,
}

/// Closed registry of supported participant identifier schemes.
///
/// Membership here is the only way a scheme becomes valid; unknown schemes
/// are always rejected, never silently accepted.
const SCHEME_REGISTRY: &[SchemeEntry] = &[
    SchemeEntry { code: "0088", name: "GLN" },
    SchemeEntry { code: "0184", name: "DK:DIGST" },
    SchemeEntry { code: "0192", name: "NO:ORG" },
    SchemeEntry { code: "0195", name: "SG:UEN" },
    SchemeEntry { code: "0196", name: "IS:KTNR" },
    SchemeEntry { code: "0208", name: "BE:EN" },
    SchemeEntry { code: "0221", name: "JP:IIN" },
    SchemeEntry { code: "9915", name: "AT:GOV" },
    SchemeEntry { code: "9930", name: "DE:VAT" },
    SchemeEntry { code: "9938", name: "LU:VAT" },
];

/// Returns the closed registry of supported schemes.
#[must_use]
pub const fn supported_schemes() -> &'static [SchemeEntry] {
    SCHEME_REGISTRY
}

/// Looks up a scheme entry by ICD code.
fn scheme_entry(code: &str) -> Option<&'static SchemeEntry> {
    SCHEME_REGISTRY.iter().find(|entry| entry.code == code)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Participant identifier construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemeError {
    /// Scheme is not in the supported registry.
    #[error("unsupported participant scheme: {0}")]
    UnsupportedScheme(String),
    /// Identifier value is empty or whitespace-only.
    #[error("participant identifier is empty")]
    EmptyIdentifier,
}

// ============================================================================
// SECTION: Participant Identifier
// ============================================================================

/// Scheme-qualified business participant identifier.
///
/// # Invariants
/// - `scheme` is a member of the closed scheme registry.
/// - `identifier` is non-empty with no surrounding whitespace.
/// - Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId {
    /// ISO 6523 scheme qualifier.
    scheme: String,
    /// Registry-specific identifier value.
    identifier: String,
}

impl ParticipantId {
    /// Creates a participant identifier after validating the scheme and value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError::UnsupportedScheme`] for schemes outside the
    /// registry and [`SchemeError::EmptyIdentifier`] for blank identifiers.
    pub fn new(scheme: &str, identifier: &str) -> Result<Self, SchemeError> {
        let entry = scheme_entry(scheme)
            .ok_or_else(|| SchemeError::UnsupportedScheme(scheme.to_string()))?;
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(SchemeError::EmptyIdentifier);
        }
        Ok(Self {
            scheme: entry.code.to_string(),
            identifier: trimmed.to_string(),
        })
    }

    /// Parses a `scheme:identifier` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError`] when the scheme is unknown or the identifier
    /// part is missing.
    pub fn parse(formatted: &str) -> Result<Self, SchemeError> {
        match formatted.split_once(':') {
            Some((scheme, identifier)) => Self::new(scheme, identifier),
            None => Err(SchemeError::EmptyIdentifier),
        }
    }

    /// Returns the scheme qualifier.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the `scheme:identifier` wire form.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("{}:{}", self.scheme, self.identifier)
    }

    /// Returns the lowercase `scheme::identifier` canonical form used for
    /// discovery hashing.
    ///
    /// Every access point must derive exactly this string; discovery hostname
    /// agreement is bit-for-bit across implementations.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}::{}", self.scheme, self.identifier).to_lowercase()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.identifier)
    }
}

// ============================================================================
// SECTION: Transport Profile
// ============================================================================

/// Transport profile negotiated through the discovery service.
///
/// # Invariants
/// - Variants are stable for serialization and endpoint matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProfile {
    /// Peppol AS4 version 2 profile (the locally supported profile).
    As4V2,
}

impl TransportProfile {
    /// Returns the wire identifier for the profile.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::As4V2 => "peppol-transport-as4-v2_0",
        }
    }

    /// Parses a wire identifier into a known profile.
    #[must_use]
    pub fn from_identifier(value: &str) -> Option<Self> {
        (value == Self::As4V2.as_str()).then_some(Self::As4V2)
    }
}

impl fmt::Display for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Message identifier unique per send attempt.
///
/// # Invariants
/// - Opaque UTF-8 string; generated once per attempt and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a new message identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Conversation identifier grouping related messages.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a new conversation identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Business-document type identifier (customization identifier).
///
/// # Invariants
/// - Opaque UTF-8 string; carried unchanged from request to envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentTypeId(String);

impl DocumentTypeId {
    /// Creates a new document type identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DocumentTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentTypeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Exchange process identifier (profile identifier).
///
/// # Invariants
/// - Opaque UTF-8 string; carried unchanged from request to envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Creates a new process identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProcessId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProcessId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
