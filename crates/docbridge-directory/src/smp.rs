// crates/docbridge-directory/src/smp.rs
// ============================================================================
// Module: SMP Wire Documents
// Description: Hostname derivation and discovery document parsing.
// Purpose: Turn participant identifiers into lookup hosts and parse the
//          capability and service-metadata documents they serve.
// Dependencies: docbridge-core
// ============================================================================

//! ## Overview
//! Discovery is a pure function followed by two document fetches. The lookup
//! hostname is derived from the SHA-256 hash of the canonical participant
//! form, so any party computes the same host without coordination. The
//! capability document lists service references by document type; the service
//! metadata document lists concrete endpoints per transport profile with the
//! peer certificate embedded as base64 DER. Parsing here is shape-only;
//! trust decisions stay with the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use docbridge_core::ParticipantId;
use docbridge_core::Timestamp;
use docbridge_core::hashing::sha256_hex;
use docbridge_core::xmlscan;

// ============================================================================
// SECTION: Hostname Derivation
// ============================================================================

/// Hex digits of the canonical-form hash kept in the lookup host label.
///
/// DNS labels cap at 63 octets; 32 hex digits (128 bits) keep the label
/// short while leaving collisions out of reach.
const HOST_HASH_DIGITS: usize = 32;

/// Derives the lookup hostname for a participant under a root domain.
///
/// The label is `b-` followed by the first [`HOST_HASH_DIGITS`] hex digits of
/// the SHA-256 hash of the lowercase canonical `scheme::identifier` form.
///
/// # Invariants
/// - Pure function of scheme, identifier, and root domain.
/// - Identifiers differing only in case map to the same hostname.
#[must_use]
pub fn lookup_hostname(participant: &ParticipantId, root_domain: &str) -> String {
    let digest = sha256_hex(participant.canonical().as_bytes());
    let label = &digest[..HOST_HASH_DIGITS];
    format!("b-{label}.{root_domain}")
}

// ============================================================================
// SECTION: URL Path Encoding
// ============================================================================

/// Percent-encodes one URL path segment.
///
/// Unreserved characters pass through; everything else is encoded, including
/// `:` so scheme-qualified identifiers survive as single segments.
#[must_use]
pub fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            }
            other => {
                out.push('%');
                out.push_str(&format!("{other:02X}"));
            }
        }
    }
    out
}

/// Percent-decodes one URL path segment; invalid escapes resolve to `None`.
#[must_use]
pub fn decode_segment(value: &str) -> Option<String> {
    let mut out = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'%' {
            let hex = bytes.get(pos + 1..pos + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            pos += 3;
        } else {
            out.push(bytes[pos]);
            pos += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ============================================================================
// SECTION: Capability Document
// ============================================================================

/// Returns the service reference hrefs listed in a capability document.
///
/// Order follows document order; malformed references are skipped.
#[must_use]
pub fn service_references(xml: &str) -> Vec<String> {
    xmlscan::elements(xml, "ServiceMetadataReference")
        .into_iter()
        .filter_map(|element| xmlscan::attribute(element.tag, "href"))
        .collect()
}

/// Returns true when a service reference href addresses the document type.
///
/// The document type is carried as the percent-encoded final path segment of
/// the href.
#[must_use]
pub fn reference_matches(href: &str, document_type: &str) -> bool {
    let trimmed = href.trim_end_matches('/');
    let Some((_, segment)) = trimmed.rsplit_once('/') else {
        return false;
    };
    decode_segment(segment).is_some_and(|decoded| decoded == document_type)
}

// ============================================================================
// SECTION: Service Metadata Document
// ============================================================================

/// One endpoint entry parsed from a service metadata document.
///
/// # Invariants
/// - `certificate_b64` is carried verbatim; decoding and validation are the
///   caller's trust decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Wire identifier of the endpoint's transport profile.
    pub transport_profile: String,
    /// Endpoint address URL.
    pub address: String,
    /// Peer certificate as base64 DER, whitespace preserved from the wire.
    pub certificate_b64: String,
    /// Whether the peer requires a business-level signature.
    pub require_signature: bool,
    /// Service activation instant, when declared.
    pub activation: Option<Timestamp>,
    /// Service expiration instant, when declared.
    pub expiration: Option<Timestamp>,
}

/// Parses the endpoint entries of a service metadata document.
///
/// Entries missing an address or certificate are dropped; the document may
/// legitimately carry endpoints for transport profiles this access point
/// does not speak.
#[must_use]
pub fn endpoints(xml: &str) -> Vec<EndpointRecord> {
    xmlscan::elements(xml, "Endpoint")
        .into_iter()
        .filter_map(|element| {
            let transport_profile = xmlscan::attribute(element.tag, "transportProfile")?;
            let address = xmlscan::text(element.inner, "Address")?;
            let certificate_b64 = xmlscan::text(element.inner, "Certificate")?;
            let require_signature = xmlscan::text(element.inner, "RequireBusinessLevelSignature")
                .is_some_and(|value| value == "true");
            let activation = xmlscan::text(element.inner, "ServiceActivationDate")
                .and_then(|value| Timestamp::parse_rfc3339(&value));
            let expiration = xmlscan::text(element.inner, "ServiceExpirationDate")
                .and_then(|value| Timestamp::parse_rfc3339(&value));
            Some(EndpointRecord {
                transport_profile,
                address,
                certificate_b64,
                require_signature,
                activation,
                expiration,
            })
        })
        .collect()
}
