// crates/docbridge-identity/src/der.rs
// ============================================================================
// Module: Minimal DER Reader
// Description: Cursor over DER-encoded ASN.1 structures.
// Purpose: Extract the handful of X.509 fields the access point needs.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The access point only needs a few fields from an X.509 certificate:
//! serial number, validity window, subject/issuer common name, and the
//! Ed25519 subject public key. This module is a strict cursor over DER
//! tag-length-value triples, not a general ASN.1 library; anything outside
//! the expected shape fails closed with [`DerError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Tags
// ============================================================================

/// ASN.1 INTEGER tag.
pub const TAG_INTEGER: u8 = 0x02;
/// ASN.1 BIT STRING tag.
pub const TAG_BIT_STRING: u8 = 0x03;
/// ASN.1 OBJECT IDENTIFIER tag.
pub const TAG_OID: u8 = 0x06;
/// ASN.1 UTF8String tag.
pub const TAG_UTF8_STRING: u8 = 0x0C;
/// ASN.1 PrintableString tag.
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
/// ASN.1 IA5String tag.
pub const TAG_IA5_STRING: u8 = 0x16;
/// ASN.1 UTCTime tag.
pub const TAG_UTC_TIME: u8 = 0x17;
/// ASN.1 GeneralizedTime tag.
pub const TAG_GENERALIZED_TIME: u8 = 0x18;
/// ASN.1 SEQUENCE tag (constructed).
pub const TAG_SEQUENCE: u8 = 0x30;
/// ASN.1 SET tag (constructed).
pub const TAG_SET: u8 = 0x31;
/// Context-specific [0] tag (constructed), used for the X.509 version field.
pub const TAG_CONTEXT_0: u8 = 0xA0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// DER parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerError {
    /// Input ended before a complete TLV was read.
    #[error("der input truncated")]
    Truncated,
    /// Length encoding is unsupported or inconsistent.
    #[error("der length invalid")]
    InvalidLength,
    /// Expected tag was not found.
    #[error("der expected tag {expected:#04x}, found {found:#04x}")]
    UnexpectedTag {
        /// Tag that was expected.
        expected: u8,
        /// Tag that was found.
        found: u8,
    },
}

// ============================================================================
// SECTION: TLV Reader
// ============================================================================

/// One decoded tag-length-value triple.
///
/// # Invariants
/// - `content` borrows exactly the value bytes, excluding tag and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// ASN.1 tag byte.
    pub tag: u8,
    /// Value bytes.
    pub content: &'a [u8],
}

/// Strict cursor over a DER byte slice.
///
/// # Invariants
/// - `pos` never exceeds `data.len()`.
#[derive(Debug)]
pub struct Reader<'a> {
    /// Underlying DER bytes.
    data: &'a [u8],
    /// Current cursor position.
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over the given bytes.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
        }
    }

    /// Returns true when all bytes have been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the next tag byte without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`DerError::Truncated`] at end of input.
    pub fn peek_tag(&self) -> Result<u8, DerError> {
        self.data.get(self.pos).copied().ok_or(DerError::Truncated)
    }

    /// Reads the next TLV.
    ///
    /// # Errors
    ///
    /// Returns [`DerError`] on truncated input or unsupported length forms.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, DerError> {
        let tag = self.peek_tag()?;
        let mut cursor = self.pos + 1;
        let first = self.data.get(cursor).copied().ok_or(DerError::Truncated)?;
        cursor += 1;
        let length = if first < 0x80 {
            usize::from(first)
        } else {
            let num_bytes = usize::from(first & 0x7F);
            if num_bytes == 0 || num_bytes > 4 {
                return Err(DerError::InvalidLength);
            }
            let mut value = 0usize;
            for _ in 0..num_bytes {
                let byte = self.data.get(cursor).copied().ok_or(DerError::Truncated)?;
                cursor += 1;
                value = value.checked_shl(8).ok_or(DerError::InvalidLength)? | usize::from(byte);
            }
            value
        };
        let end = cursor.checked_add(length).ok_or(DerError::InvalidLength)?;
        if end > self.data.len() {
            return Err(DerError::Truncated);
        }
        let content = &self.data[cursor..end];
        self.pos = end;
        Ok(Tlv {
            tag,
            content,
        })
    }

    /// Reads the next TLV, requiring a specific tag.
    ///
    /// # Errors
    ///
    /// Returns [`DerError::UnexpectedTag`] when the tag differs.
    pub fn expect(&mut self, tag: u8) -> Result<Tlv<'a>, DerError> {
        let found = self.peek_tag()?;
        if found != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found,
            });
        }
        self.read_tlv()
    }

    /// Skips one TLV when its tag matches; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DerError`] when the matching TLV is malformed.
    pub fn skip_optional(&mut self, tag: u8) -> Result<(), DerError> {
        if !self.is_empty() && self.peek_tag()? == tag {
            self.read_tlv()?;
        }
        Ok(())
    }
}
