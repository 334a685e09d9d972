// crates/docbridge-identity/tests/identity_unit.rs
// ============================================================================
// Module: Identity Unit Tests
// Description: Certificate loading, signing, pinning, and rotation tests.
// Purpose: Verify temporal validation, key matching, and atomic rotation.
// ============================================================================

//! ## Overview
//! Unit tests for the identity crate against rcgen-generated material:
//! - PEM/DER parsing of subject, validity window, and fingerprint.
//! - Expired and not-yet-valid certificates rejected at load time.
//! - Ed25519 sign/verify round trip and failure modes.
//! - Trust-config pinning semantics and atomic rotation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;
use std::path::PathBuf;

use docbridge_identity::AccessPointCertificate;
use docbridge_identity::CertificateManager;
use docbridge_identity::ExpiryStatus;
use docbridge_identity::Fingerprint;
use docbridge_identity::Identity;
use docbridge_identity::IdentityError;
use docbridge_identity::TlsVersion;
use docbridge_core::Timestamp;
use rcgen::CertificateParams;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::KeyPair;
use rcgen::PKCS_ED25519;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;

struct TestIdentity {
    cert_path: PathBuf,
    key_path: PathBuf,
    fingerprint: Fingerprint,
}

fn write_identity(
    dir: &TempDir,
    name: &str,
    common_name: &str,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> TestIdentity {
    let key = KeyPair::generate_for(&PKCS_ED25519).expect("generate key");
    let mut params =
        CertificateParams::new(vec!["ap.example.test".to_string()]).expect("params");
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.not_before = not_before;
    params.not_after = not_after;
    let cert = params.self_signed(&key).expect("self-signed cert");
    let cert_path = dir.path().join(format!("{name}.crt.pem"));
    let key_path = dir.path().join(format!("{name}.key.pem"));
    std::fs::write(&cert_path, cert.pem()).expect("write cert");
    std::fs::write(&key_path, key.serialize_pem()).expect("write key");
    let parsed = AccessPointCertificate::from_pem(&cert.pem()).expect("parse generated cert");
    TestIdentity {
        cert_path,
        key_path,
        fingerprint: parsed.fingerprint,
    }
}

fn valid_window() -> (OffsetDateTime, OffsetDateTime) {
    let now = OffsetDateTime::now_utc();
    (now - Duration::days(1), now + Duration::days(365))
}

#[test]
fn loads_certificate_fields() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let material = write_identity(&dir, "ap", "Docbridge Test AP", not_before, not_after);
    let identity = Identity::load(&material.cert_path, Some(&material.key_path), None)
        .expect("load identity");
    assert_eq!(identity.certificate.subject, "Docbridge Test AP");
    assert_eq!(identity.certificate.fingerprint, material.fingerprint);
    assert_eq!(identity.certificate.fingerprint.as_str().len(), 64);
    assert!(identity.can_sign());
    assert!(identity.certificate.not_before < identity.certificate.not_after);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = Identity::load(&dir.path().join("absent.pem"), None, None)
        .expect_err("absent certificate");
    assert!(matches!(err, IdentityError::Io(_)));
}

#[test]
fn expired_certificate_is_rejected_at_load() {
    let dir = TempDir::new().expect("tempdir");
    let now = OffsetDateTime::now_utc();
    let material =
        write_identity(&dir, "old", "Expired AP", now - Duration::days(400), now - Duration::days(5));
    let err = Identity::load(&material.cert_path, Some(&material.key_path), None)
        .expect_err("expired certificate");
    assert!(matches!(err, IdentityError::Expired(_)));
}

#[test]
fn not_yet_valid_certificate_is_rejected_at_load() {
    let dir = TempDir::new().expect("tempdir");
    let now = OffsetDateTime::now_utc();
    let material = write_identity(
        &dir,
        "future",
        "Future AP",
        now + Duration::days(5),
        now + Duration::days(400),
    );
    let err = Identity::load(&material.cert_path, Some(&material.key_path), None)
        .expect_err("future certificate");
    assert!(matches!(err, IdentityError::NotYetValid(_)));
}

#[test]
fn near_expiry_is_a_warning_not_a_failure() {
    let dir = TempDir::new().expect("tempdir");
    let now = OffsetDateTime::now_utc();
    let material = write_identity(
        &dir,
        "soon",
        "Expiring AP",
        now - Duration::days(300),
        now + Duration::days(10),
    );
    let identity = Identity::load(&material.cert_path, Some(&material.key_path), None)
        .expect("still loadable");
    let status = identity.certificate.expiry_status(Timestamp::now());
    assert!(matches!(status, ExpiryStatus::ExpiringSoon { days_left } if days_left <= 10));
}

#[test]
fn key_mismatch_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let first = write_identity(&dir, "first", "First AP", not_before, not_after);
    let second = write_identity(&dir, "second", "Second AP", not_before, not_after);
    let err = Identity::load(&first.cert_path, Some(&second.key_path), None)
        .expect_err("mismatched key");
    assert_eq!(err, IdentityError::KeyMismatch);
}

#[test]
fn encrypted_key_passphrase_is_unsupported() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let material = write_identity(&dir, "enc", "Enc AP", not_before, not_after);
    let err = Identity::load(&material.cert_path, Some(&material.key_path), Some("secret"))
        .expect_err("passphrase unsupported");
    assert_eq!(err, IdentityError::EncryptedKeyUnsupported);
}

#[test]
fn sign_verify_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let material = write_identity(&dir, "sig", "Signing AP", not_before, not_after);
    let manager = CertificateManager::load(&material.cert_path, Some(&material.key_path), None)
        .expect("manager");
    let payload = b"envelope body bytes";
    let signature = manager.sign(payload).expect("signature");
    let public_key = manager.current().certificate.public_key;
    assert!(CertificateManager::verify(payload, &signature.to_bytes(), &public_key));
    assert!(!CertificateManager::verify(b"tampered bytes", &signature.to_bytes(), &public_key));
    assert!(!CertificateManager::verify(payload, &[0u8; 64], &public_key));
    assert!(!CertificateManager::verify(payload, b"short", &public_key));
}

#[test]
fn verify_only_identity_cannot_sign() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let material = write_identity(&dir, "ro", "Verify Only AP", not_before, not_after);
    let manager =
        CertificateManager::load(&material.cert_path, None, None).expect("manager");
    let err = manager.sign(b"data").expect_err("no private key");
    assert_eq!(err, docbridge_identity::SigningError::NoPrivateKey);
}

#[test]
fn trust_config_pins_peer_fingerprints() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let local = write_identity(&dir, "local", "Local AP", not_before, not_after);
    let peer = write_identity(&dir, "peer", "Peer AP", not_before, not_after);
    let stranger = write_identity(&dir, "stranger", "Stranger AP", not_before, not_after);
    let manager = CertificateManager::load(&local.cert_path, Some(&local.key_path), None)
        .expect("manager");

    let open = manager.trust_config(TlsVersion::Tls12, BTreeSet::new());
    assert!(!open.pinning_enabled());
    assert!(open.permits(&stranger.fingerprint));

    let pinned = manager
        .trust_config(TlsVersion::Tls13, BTreeSet::from([peer.fingerprint.clone()]));
    assert!(pinned.pinning_enabled());
    assert!(pinned.permits(&peer.fingerprint));
    assert!(!pinned.permits(&stranger.fingerprint));
}

#[test]
fn rotation_swaps_identity_atomically() {
    let dir = TempDir::new().expect("tempdir");
    let (not_before, not_after) = valid_window();
    let first = write_identity(&dir, "rot-a", "Rotation A", not_before, not_after);
    let second = write_identity(&dir, "rot-b", "Rotation B", not_before, not_after);
    let manager = CertificateManager::load(&first.cert_path, Some(&first.key_path), None)
        .expect("manager");
    let before = manager.current();
    assert_eq!(before.certificate.fingerprint, first.fingerprint);

    manager
        .rotate_from_files(&second.cert_path, Some(&second.key_path), None)
        .expect("rotate");
    let after = manager.current();
    assert_eq!(after.certificate.fingerprint, second.fingerprint);
    // The held snapshot is still the complete previous identity.
    assert_eq!(before.certificate.fingerprint, first.fingerprint);
}

#[test]
fn rotation_to_expired_identity_fails_and_keeps_active() {
    let dir = TempDir::new().expect("tempdir");
    let now = OffsetDateTime::now_utc();
    let (not_before, not_after) = valid_window();
    let good = write_identity(&dir, "keep", "Keep AP", not_before, not_after);
    let expired = write_identity(
        &dir,
        "dead",
        "Dead AP",
        now - Duration::days(400),
        now - Duration::days(5),
    );
    let manager = CertificateManager::load(&good.cert_path, Some(&good.key_path), None)
        .expect("manager");
    let err = manager
        .rotate_from_files(&expired.cert_path, Some(&expired.key_path), None)
        .expect_err("expired replacement");
    assert!(matches!(err, IdentityError::Expired(_)));
    assert_eq!(manager.current().certificate.fingerprint, good.fingerprint);
}

#[test]
fn fingerprint_parse_normalizes_separators() {
    let raw = "AA:BB".repeat(16);
    let parsed = Fingerprint::parse(&raw).expect("colon-separated fingerprint");
    assert_eq!(parsed.as_str(), "aabb".repeat(16));
    assert!(Fingerprint::parse("not-hex").is_none());
    assert!(Fingerprint::parse("abcd").is_none());
}
