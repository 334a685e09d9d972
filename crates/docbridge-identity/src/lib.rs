// crates/docbridge-identity/src/lib.rs
// ============================================================================
// Module: Docbridge Identity Library
// Description: Access point X.509 identity, signing, and transport trust.
// Purpose: Own certificate material and expose signing and pinning primitives.
// Dependencies: docbridge-core, base64, ed25519-dalek, thiserror, time
// ============================================================================

//! ## Overview
//! Docbridge Identity owns the access point's certificate and private key:
//! loading and validity checks, SHA-256 fingerprints for pinning, Ed25519
//! signing and verification, and the transport trust configuration applied to
//! peer connections.
//! Invariants:
//! - An expired certificate is rejected at load time and at every trust check.
//! - Rotation swaps the whole identity atomically; readers never observe a
//!   mixed certificate/key pair.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod certificate;
pub mod der;
pub mod manager;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use certificate::AccessPointCertificate;
pub use certificate::ExpiryStatus;
pub use certificate::Fingerprint;
pub use certificate::IdentityError;
pub use manager::CertificateManager;
pub use manager::Identity;
pub use manager::SigningError;
pub use manager::TlsVersion;
pub use manager::TransportTrustConfig;
