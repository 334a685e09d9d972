// crates/docbridge-server/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Configuration loading, defaults, and fail-closed rules.
// Purpose: Verify TOML parsing, default values, and the production
//          validation gate.
// ============================================================================

//! ## Overview
//! Loads TOML fixtures from temporary files and checks applied defaults and
//! every production fail-closed rule.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;

use docbridge_server::AccessPointConfig;
use docbridge_server::ConfigError;
use docbridge_server::Environment;
use docbridge_store_sqlite::SqliteJournalMode;
use docbridge_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

const PIN: &str = "abababababababababababababababababababababababababababababababab";

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("docbridge.toml");
    std::fs::write(&path, content).expect("write config");
    path
}

fn base_sections(environment: &str) -> String {
    format!(
        r#"
[server]
environment = "{environment}"

[identity]
certificate_path = "/etc/docbridge/ap.crt.pem"
private_key_path = "/etc/docbridge/ap.key.pem"

[ledger]
path = "/var/lib/docbridge/ledger.db"
"#
    )
}

fn load(path: &Path) -> Result<AccessPointConfig, ConfigError> {
    AccessPointConfig::load(Some(path))
}

#[test]
fn minimal_test_config_applies_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, &base_sections("test"));
    let config = load(&path).expect("valid config");

    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.server.environment, Environment::Test);
    assert!(config.server.max_body_bytes > 0);
    assert_eq!(config.directory.root_domain, "edelivery.tech.ec.europa.eu");
    assert!(!config.directory.allow_http);
    assert_eq!(config.transport.max_attempts, 3);
    assert_eq!(config.ledger.journal_mode, SqliteJournalMode::Wal);
    assert_eq!(config.ledger.sync_mode, SqliteSyncMode::Full);
    assert!(config.pinned_fingerprints().expect("pins").is_empty());
}

#[test]
fn production_config_with_pins_is_accepted() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[trust]\npinned_fingerprints = [\"{PIN}\"]\n",
        base_sections("production")
    );
    let path = write_config(&dir, &content);
    let config = load(&path).expect("valid production config");
    assert_eq!(config.server.environment, Environment::Production);
    assert_eq!(config.pinned_fingerprints().expect("pins").len(), 1);
}

#[test]
fn environment_defaults_to_production() {
    let dir = TempDir::new().expect("tempdir");
    // No environment and no pins: the production gate must reject it.
    let content = base_sections("production").replace("environment = \"production\"\n", "");
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("pins required by default");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("pinned_fingerprints")));
}

#[test]
fn production_requires_pinned_fingerprints() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, &base_sections("production"));
    let err = load(&path).expect_err("pins required");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("pinned_fingerprints")));
}

#[test]
fn production_rejects_cleartext_discovery() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[directory]\nallow_http = true\n\n[trust]\npinned_fingerprints = [\"{PIN}\"]\n",
        base_sections("production")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("cleartext discovery refused");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("directory.allow_http")));
}

#[test]
fn production_rejects_cleartext_delivery() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[transport]\nallow_http = true\n\n[trust]\npinned_fingerprints = [\"{PIN}\"]\n",
        base_sections("production")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("cleartext delivery refused");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("transport.allow_http")));
}

#[test]
fn production_rejects_host_override() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[directory]\nhost_override = \"127.0.0.1:3000\"\n\n[trust]\npinned_fingerprints = \
         [\"{PIN}\"]\n",
        base_sections("production")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("host override refused");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("host_override")));
}

#[test]
fn production_requires_a_private_key() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[trust]\npinned_fingerprints = [\"{PIN}\"]\n",
        base_sections("production").replace("private_key_path = \"/etc/docbridge/ap.key.pem\"\n", "")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("signing key required");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("private_key_path")));
}

#[test]
fn invalid_bind_address_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let content = base_sections("test")
        .replace("[server]\n", "[server]\nbind = \"not-an-address\"\n");
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("bad bind");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("bind")));
}

#[test]
fn invalid_fingerprint_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[trust]\npinned_fingerprints = [\"zz:not-hex\"]\n",
        base_sections("test")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("bad fingerprint");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("fingerprint")));
}

#[test]
fn colon_separated_fingerprints_are_accepted() {
    let dir = TempDir::new().expect("tempdir");
    let separated = PIN
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).expect("ascii"))
        .collect::<Vec<_>>()
        .join(":");
    let content = format!(
        "{}\n[trust]\npinned_fingerprints = [\"{separated}\"]\n",
        base_sections("test")
    );
    let path = write_config(&dir, &content);
    let config = load(&path).expect("valid config");
    assert_eq!(config.pinned_fingerprints().expect("pins").len(), 1);
}

#[test]
fn invalid_min_tls_version_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!(
        "{}\n[trust]\nmin_tls_version = \"1.1\"\n",
        base_sections("test")
    );
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("bad tls version");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("min_tls_version")));
}

#[test]
fn zero_max_attempts_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let content = format!("{}\n[transport]\nmax_attempts = 0\n", base_sections("test"));
    let path = write_config(&dir, &content);
    let err = load(&path).expect_err("zero attempts");
    assert!(matches!(err, ConfigError::Invalid(detail) if detail.contains("max_attempts")));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = load(&dir.path().join("absent.toml")).expect_err("missing file");
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn unparsable_toml_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "not toml at all [");
    let err = load(&path).expect_err("bad toml");
    assert!(matches!(err, ConfigError::Parse(_)));
}
