// crates/docbridge-core/src/core/hashing.rs
// ============================================================================
// Module: Docbridge Hashing
// Description: Shared digest helpers for fingerprints and discovery hashing.
// Purpose: Keep digest derivation identical across identity and directory.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Certificate pinning and discovery hostname derivation both depend on
//! deterministic SHA-256 digests. This module is the single definition so the
//! two crates cannot drift; hostname agreement is an interoperability
//! requirement, not a local choice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Digest Helpers
// ============================================================================

/// Returns the SHA-256 digest of the input bytes.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Returns the lowercase hex encoding of the SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&sha256(data))
}

/// Encodes bytes as lowercase hex.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
