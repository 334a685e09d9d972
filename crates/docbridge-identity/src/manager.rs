// crates/docbridge-identity/src/manager.rs
// ============================================================================
// Module: Certificate Manager
// Description: Atomically swappable access point identity and trust config.
// Purpose: Expose signing, verification, and pinning without leaking key
//          material to callers.
// Dependencies: crate::certificate, docbridge-core, ed25519-dalek, thiserror
// ============================================================================

//! ## Overview
//! The manager owns the single process-wide identity behind an atomically
//! swappable reference. Signing and trust-config reads proceed concurrently;
//! rotation is the sole writer and replaces the whole identity in one swap,
//! so readers observe either the fully-old or fully-new certificate/key pair
//! and never a mixture.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;

use docbridge_core::Timestamp;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use thiserror::Error;

use crate::certificate::AccessPointCertificate;
use crate::certificate::ExpiryStatus;
use crate::certificate::Fingerprint;
use crate::certificate::IdentityError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signing errors.
///
/// # Invariants
/// - Signing failures are terminal for the attempt and never retried; they
///   indicate corrupted identity material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// No private key is loaded for the active identity.
    #[error("no private key loaded for signing")]
    NoPrivateKey,
}

// ============================================================================
// SECTION: Transport Trust
// ============================================================================

/// Minimum TLS protocol version for peer connections.
///
/// # Invariants
/// - Variants are stable for configuration parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    /// TLS 1.2 minimum.
    Tls12,
    /// TLS 1.3 minimum.
    Tls13,
}

impl TlsVersion {
    /// Returns the configuration label for the version.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tls12 => "1.2",
            Self::Tls13 => "1.3",
        }
    }

    /// Parses a configuration label.
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "1.2" => Some(Self::Tls12),
            "1.3" => Some(Self::Tls13),
            _ => None,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport trust configuration applied to peer connections.
///
/// # Invariants
/// - An empty pin set disables pinning; a non-empty set rejects every peer
///   fingerprint outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportTrustConfig {
    /// Minimum negotiated TLS protocol version.
    pub min_tls_version: TlsVersion,
    /// Pinned peer certificate fingerprints.
    pub pinned_fingerprints: BTreeSet<Fingerprint>,
}

impl TransportTrustConfig {
    /// Returns true when fingerprint pinning is enabled.
    #[must_use]
    pub fn pinning_enabled(&self) -> bool {
        !self.pinned_fingerprints.is_empty()
    }

    /// Returns true when a peer fingerprint is acceptable under this config.
    #[must_use]
    pub fn permits(&self, fingerprint: &Fingerprint) -> bool {
        !self.pinning_enabled() || self.pinned_fingerprints.contains(fingerprint)
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// One immutable certificate/key pairing.
///
/// # Invariants
/// - When a signing key is present, its public half matches the certificate.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Parsed access point certificate.
    pub certificate: AccessPointCertificate,
    /// Private signing key, absent for verify-only deployments.
    signing_key: Option<SigningKey>,
}

impl Identity {
    /// Loads an identity from PEM certificate and optional PEM key files.
    ///
    /// The certificate must be inside its validity window at load time.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] for unreadable files, malformed material, an
    /// out-of-window certificate, a key mismatch, or an encrypted key
    /// (a non-empty passphrase is rejected as unsupported).
    pub fn load(
        cert_path: &Path,
        key_path: Option<&Path>,
        passphrase: Option<&str>,
    ) -> Result<Self, IdentityError> {
        if passphrase.is_some_and(|value| !value.is_empty()) {
            return Err(IdentityError::EncryptedKeyUnsupported);
        }
        let certificate = AccessPointCertificate::load(cert_path)?;
        certificate.ensure_valid_at(Timestamp::now())?;
        let signing_key = match key_path {
            Some(path) => {
                let pem = std::fs::read_to_string(path)
                    .map_err(|err| IdentityError::Io(format!("{}: {err}", path.display())))?;
                let key = SigningKey::from_pkcs8_pem(&pem)
                    .map_err(|err| IdentityError::KeyParse(err.to_string()))?;
                if key.verifying_key() != certificate.public_key {
                    return Err(IdentityError::KeyMismatch);
                }
                Some(key)
            }
            None => None,
        };
        Ok(Self {
            certificate,
            signing_key,
        })
    }

    /// Returns true when this identity can sign.
    #[must_use]
    pub const fn can_sign(&self) -> bool {
        self.signing_key.is_some()
    }
}

// ============================================================================
// SECTION: Certificate Manager
// ============================================================================

/// Process-wide owner of the active access point identity.
///
/// # Invariants
/// - Readers observe a complete identity; rotation is an atomic swap.
pub struct CertificateManager {
    /// Active identity behind an atomically swappable reference.
    active: RwLock<Arc<Identity>>,
}

impl CertificateManager {
    /// Creates a manager around an already-validated identity.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            active: RwLock::new(Arc::new(identity)),
        }
    }

    /// Loads the identity from disk and wraps it in a manager.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when loading or validation fails.
    pub fn load(
        cert_path: &Path,
        key_path: Option<&Path>,
        passphrase: Option<&str>,
    ) -> Result<Self, IdentityError> {
        Ok(Self::new(Identity::load(cert_path, key_path, passphrase)?))
    }

    /// Returns a snapshot of the active identity.
    #[must_use]
    pub fn current(&self) -> Arc<Identity> {
        self.active.read().map(|guard| Arc::clone(&guard)).unwrap_or_else(|poisoned| {
            // A poisoned lock still holds a complete identity snapshot.
            Arc::clone(&poisoned.into_inner())
        })
    }

    /// Signs data with the active private key (deterministic Ed25519).
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::NoPrivateKey`] for verify-only identities.
    pub fn sign(&self, data: &[u8]) -> Result<Signature, SigningError> {
        let identity = self.current();
        match &identity.signing_key {
            Some(key) => Ok(key.sign(data)),
            None => Err(SigningError::NoPrivateKey),
        }
    }

    /// Verifies a signature against a peer public key.
    ///
    /// Never fails hard: malformed signatures and key mismatches return
    /// `false`.
    #[must_use]
    pub fn verify(data: &[u8], signature: &[u8], peer_key: &VerifyingKey) -> bool {
        Signature::from_slice(signature)
            .is_ok_and(|sig| peer_key.verify_strict(data, &sig).is_ok())
    }

    /// Produces the transport trust configuration for peer connections.
    #[must_use]
    pub fn trust_config(
        &self,
        min_tls_version: TlsVersion,
        pinned_fingerprints: BTreeSet<Fingerprint>,
    ) -> TransportTrustConfig {
        TransportTrustConfig {
            min_tls_version,
            pinned_fingerprints,
        }
    }

    /// Returns the expiry status of the active certificate.
    #[must_use]
    pub fn expiry_status(&self) -> ExpiryStatus {
        self.current().certificate.expiry_status(Timestamp::now())
    }

    /// Replaces the active identity after validating its time window.
    ///
    /// In-flight operations holding the previous snapshot complete against
    /// it; new operations observe the replacement.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the replacement certificate is outside
    /// its validity window; the active identity is left untouched.
    pub fn rotate(&self, replacement: Identity) -> Result<(), IdentityError> {
        replacement.certificate.ensure_valid_at(Timestamp::now())?;
        let next = Arc::new(replacement);
        match self.active.write() {
            Ok(mut guard) => {
                *guard = next;
                Ok(())
            }
            Err(poisoned) => {
                *poisoned.into_inner() = next;
                Ok(())
            }
        }
    }

    /// Loads a replacement identity from disk and rotates to it.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when loading or validation fails.
    pub fn rotate_from_files(
        &self,
        cert_path: &Path,
        key_path: Option<&Path>,
        passphrase: Option<&str>,
    ) -> Result<(), IdentityError> {
        self.rotate(Identity::load(cert_path, key_path, passphrase)?)
    }
}
