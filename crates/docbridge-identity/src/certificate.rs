// crates/docbridge-identity/src/certificate.rs
// ============================================================================
// Module: Access Point Certificate
// Description: X.509 certificate fields, fingerprints, and validity checks.
// Purpose: Provide the certificate view used for trust and pinning decisions.
// Dependencies: crate::der, docbridge-core, base64, ed25519-dalek, thiserror,
// time
// ============================================================================

//! ## Overview
//! A certificate is parsed once into the handful of fields the access point
//! consults: serial, subject/issuer common name, validity window, SHA-256
//! fingerprint over the DER encoding, and the Ed25519 public key. The
//! fingerprint is the unit of pinning trust. Validity is re-checked at every
//! use; a certificate within 30 days of expiry yields a warning status, an
//! expired one always fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use docbridge_core::Timestamp;
use docbridge_core::hashing;
use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use time::Date;
use time::Month;

use crate::der;
use crate::der::DerError;
use crate::der::Reader;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Days before expiry at which a certificate is reported as expiring soon.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// DER encoding of the Ed25519 algorithm identifier (1.3.101.112).
const OID_ED25519: &[u8] = &[0x2B, 0x65, 0x70];

/// DER encoding of the common-name attribute type (2.5.4.3).
const OID_COMMON_NAME: &[u8] = &[0x55, 0x04, 0x03];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity and certificate errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Load-time failures are fatal configuration errors for the access point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Certificate or key file could not be read.
    #[error("identity file unreadable: {0}")]
    Io(String),
    /// PEM framing was missing or malformed.
    #[error("identity pem malformed: {0}")]
    Pem(String),
    /// DER structure did not match the expected certificate shape.
    #[error("certificate parse error: {0}")]
    Parse(String),
    /// Certificate key algorithm is not Ed25519.
    #[error("unsupported certificate key algorithm")]
    UnsupportedKey,
    /// Certificate validity window has not started.
    #[error("certificate not valid before {0}")]
    NotYetValid(Timestamp),
    /// Certificate validity window has ended.
    #[error("certificate expired at {0}")]
    Expired(Timestamp),
    /// Private key could not be parsed.
    #[error("private key parse error: {0}")]
    KeyParse(String),
    /// Encrypted private keys are not supported.
    #[error("encrypted private keys are not supported")]
    EncryptedKeyUnsupported,
    /// Private key does not match the certificate public key.
    #[error("private key does not match certificate public key")]
    KeyMismatch,
}

impl From<DerError> for IdentityError {
    fn from(err: DerError) -> Self {
        Self::Parse(err.to_string())
    }
}

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// SHA-256 fingerprint of a DER-encoded certificate, lowercase hex.
///
/// # Invariants
/// - Always 64 lowercase hex characters.
/// - Derivation is deterministic over the DER bytes; this is the unit of
///   pinning trust.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of DER certificate bytes.
    #[must_use]
    pub fn from_der(der_bytes: &[u8]) -> Self {
        Self(hashing::sha256_hex(der_bytes))
    }

    /// Parses a configured fingerprint string (case-insensitive hex).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|ch| *ch != ':')
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        let valid =
            normalized.len() == 64 && normalized.chars().all(|ch| ch.is_ascii_hexdigit());
        valid.then_some(Self(normalized))
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Expiry Status
// ============================================================================

/// Certificate temporal status relative to a reference time.
///
/// # Invariants
/// - `ExpiringSoon` is a warning, not a failure; `Expired` always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// Within the validity window with comfortable margin.
    Valid,
    /// Within the validity window but expiring within the warning horizon.
    ExpiringSoon {
        /// Whole days remaining until expiry.
        days_left: i64,
    },
    /// Outside the validity window.
    Expired,
}

// ============================================================================
// SECTION: Certificate
// ============================================================================

/// Parsed view of an access point or peer certificate.
///
/// # Invariants
/// - `fingerprint` matches `der` bytes exactly.
/// - `not_before <= not_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointCertificate {
    /// Serial number, lowercase hex.
    pub serial: String,
    /// Subject common name, when present.
    pub subject: String,
    /// Issuer common name, when present.
    pub issuer: String,
    /// Start of the validity window.
    pub not_before: Timestamp,
    /// End of the validity window.
    pub not_after: Timestamp,
    /// SHA-256 fingerprint of the DER encoding.
    pub fingerprint: Fingerprint,
    /// Ed25519 subject public key.
    pub public_key: VerifyingKey,
    /// Raw DER encoding.
    pub der: Vec<u8>,
}

impl AccessPointCertificate {
    /// Parses a DER-encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the structure is malformed or the key
    /// algorithm is not Ed25519.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self, IdentityError> {
        let mut outer = Reader::new(der_bytes);
        let certificate = outer.expect(der::TAG_SEQUENCE)?;
        let mut cert_reader = Reader::new(certificate.content);
        let tbs = cert_reader.expect(der::TAG_SEQUENCE)?;

        let mut tbs_reader = Reader::new(tbs.content);
        tbs_reader.skip_optional(der::TAG_CONTEXT_0)?;
        let serial = tbs_reader.expect(der::TAG_INTEGER)?;
        let _signature_alg = tbs_reader.expect(der::TAG_SEQUENCE)?;
        let issuer = tbs_reader.expect(der::TAG_SEQUENCE)?;
        let validity = tbs_reader.expect(der::TAG_SEQUENCE)?;
        let subject = tbs_reader.expect(der::TAG_SEQUENCE)?;
        let spki = tbs_reader.expect(der::TAG_SEQUENCE)?;

        let mut validity_reader = Reader::new(validity.content);
        let not_before = read_time(&mut validity_reader)?;
        let not_after = read_time(&mut validity_reader)?;
        if not_before > not_after {
            return Err(IdentityError::Parse("validity window inverted".to_string()));
        }

        Ok(Self {
            serial: hashing::hex_encode(serial.content),
            subject: common_name(subject.content)?.unwrap_or_default(),
            issuer: common_name(issuer.content)?.unwrap_or_default(),
            not_before,
            not_after,
            fingerprint: Fingerprint::from_der(der_bytes),
            public_key: ed25519_key(spki.content)?,
            der: der_bytes.to_vec(),
        })
    }

    /// Parses the first certificate block in a PEM document.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Pem`] when no certificate block is present.
    pub fn from_pem(pem: &str) -> Result<Self, IdentityError> {
        let der_bytes = pem_block(pem, "CERTIFICATE")?;
        Self::from_der(&der_bytes)
    }

    /// Loads and parses a PEM certificate file.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Io`] when the file is unreadable and parse
    /// errors otherwise.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let pem = fs::read_to_string(path)
            .map_err(|err| IdentityError::Io(format!("{}: {err}", path.display())))?;
        Self::from_pem(&pem)
    }

    /// Returns the temporal status relative to `now`.
    #[must_use]
    pub fn expiry_status(&self, now: Timestamp) -> ExpiryStatus {
        if now < self.not_before || now > self.not_after {
            return ExpiryStatus::Expired;
        }
        let millis_left = self.not_after.as_unix_millis() - now.as_unix_millis();
        let days_left = millis_left / (24 * 60 * 60 * 1_000);
        if days_left < EXPIRY_WARNING_DAYS {
            ExpiryStatus::ExpiringSoon {
                days_left,
            }
        } else {
            ExpiryStatus::Valid
        }
    }

    /// Fails when `now` is outside the validity window.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NotYetValid`] or [`IdentityError::Expired`].
    /// There is no code path that treats an expired certificate as valid.
    pub fn ensure_valid_at(&self, now: Timestamp) -> Result<(), IdentityError> {
        if now < self.not_before {
            return Err(IdentityError::NotYetValid(self.not_before));
        }
        if now > self.not_after {
            return Err(IdentityError::Expired(self.not_after));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Extracts one PEM block's DER payload by label.
fn pem_block(pem: &str, label: &str) -> Result<Vec<u8>, IdentityError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");
    let start = pem
        .find(&begin)
        .ok_or_else(|| IdentityError::Pem(format!("missing {begin}")))?;
    let after_begin = start + begin.len();
    let stop = pem[after_begin..]
        .find(&end)
        .ok_or_else(|| IdentityError::Pem(format!("missing {end}")))?;
    let body: String =
        pem[after_begin..after_begin + stop].chars().filter(|ch| !ch.is_whitespace()).collect();
    BASE64.decode(body.as_bytes()).map_err(|err| IdentityError::Pem(err.to_string()))
}

/// Reads one UTCTime or GeneralizedTime value.
fn read_time(reader: &mut Reader<'_>) -> Result<Timestamp, IdentityError> {
    let tlv = reader.read_tlv()?;
    let text = std::str::from_utf8(tlv.content)
        .map_err(|_| IdentityError::Parse("time value not ascii".to_string()))?;
    let (year, rest) = match tlv.tag {
        der::TAG_UTC_TIME if text.len() == 13 => {
            let two = parse_digits(&text[0..2])?;
            let year = if two >= 50 { 1900 + two } else { 2000 + two };
            (year, &text[2..])
        }
        der::TAG_GENERALIZED_TIME if text.len() == 15 => (parse_digits(&text[0..4])?, &text[4..]),
        _ => return Err(IdentityError::Parse("unsupported time encoding".to_string())),
    };
    if !rest.ends_with('Z') || rest.len() != 11 {
        return Err(IdentityError::Parse("time value not utc".to_string()));
    }
    let month = parse_digits(&rest[0..2])?;
    let day = parse_digits(&rest[2..4])?;
    let hour = parse_digits(&rest[4..6])?;
    let minute = parse_digits(&rest[6..8])?;
    let second = parse_digits(&rest[8..10])?;
    let month = u8::try_from(month)
        .ok()
        .and_then(|value| Month::try_from(value).ok())
        .ok_or_else(|| IdentityError::Parse("month out of range".to_string()))?;
    let date = Date::from_calendar_date(
        i32::try_from(year).map_err(|_| IdentityError::Parse("year out of range".to_string()))?,
        month,
        u8::try_from(day).map_err(|_| IdentityError::Parse("day out of range".to_string()))?,
    )
    .map_err(|err| IdentityError::Parse(err.to_string()))?;
    let time = time::Time::from_hms(
        u8::try_from(hour).map_err(|_| IdentityError::Parse("hour out of range".to_string()))?,
        u8::try_from(minute)
            .map_err(|_| IdentityError::Parse("minute out of range".to_string()))?,
        u8::try_from(second)
            .map_err(|_| IdentityError::Parse("second out of range".to_string()))?,
    )
    .map_err(|err| IdentityError::Parse(err.to_string()))?;
    let seconds = date.with_time(time).assume_utc().unix_timestamp();
    Ok(Timestamp::from_unix_millis(seconds.saturating_mul(1_000)))
}

/// Parses an ASCII digit run into an integer.
fn parse_digits(text: &str) -> Result<i64, IdentityError> {
    if !text.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(IdentityError::Parse("time value not numeric".to_string()));
    }
    text.parse::<i64>().map_err(|err| IdentityError::Parse(err.to_string()))
}

/// Extracts the common-name attribute from an X.501 Name.
fn common_name(name: &[u8]) -> Result<Option<String>, IdentityError> {
    let mut reader = Reader::new(name);
    while !reader.is_empty() {
        let set = reader.expect(der::TAG_SET)?;
        let mut set_reader = Reader::new(set.content);
        while !set_reader.is_empty() {
            let attribute = set_reader.expect(der::TAG_SEQUENCE)?;
            let mut attr_reader = Reader::new(attribute.content);
            let oid = attr_reader.expect(der::TAG_OID)?;
            let value = attr_reader.read_tlv()?;
            let is_string = matches!(
                value.tag,
                der::TAG_UTF8_STRING | der::TAG_PRINTABLE_STRING | der::TAG_IA5_STRING
            );
            if oid.content == OID_COMMON_NAME && is_string {
                return Ok(Some(String::from_utf8_lossy(value.content).into_owned()));
            }
        }
    }
    Ok(None)
}

/// Extracts the Ed25519 key from a SubjectPublicKeyInfo.
fn ed25519_key(spki: &[u8]) -> Result<VerifyingKey, IdentityError> {
    let mut reader = Reader::new(spki);
    let algorithm = reader.expect(der::TAG_SEQUENCE)?;
    let mut alg_reader = Reader::new(algorithm.content);
    let oid = alg_reader.expect(der::TAG_OID)?;
    if oid.content != OID_ED25519 {
        return Err(IdentityError::UnsupportedKey);
    }
    let bit_string = reader.expect(der::TAG_BIT_STRING)?;
    let key_bytes = bit_string
        .content
        .split_first()
        .filter(|(unused, _)| **unused == 0)
        .map(|(_, rest)| rest)
        .ok_or_else(|| IdentityError::Parse("public key bit string malformed".to_string()))?;
    let key_array: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| IdentityError::Parse("public key length invalid".to_string()))?;
    VerifyingKey::from_bytes(&key_array)
        .map_err(|_| IdentityError::Parse("public key rejected".to_string()))
}
