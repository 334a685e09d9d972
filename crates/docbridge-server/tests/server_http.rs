// crates/docbridge-server/tests/server_http.rs
// ============================================================================
// Module: Server HTTP Tests
// Description: End-to-end inbound endpoint and health probe tests.
// Purpose: Verify the running server answers envelopes with receipts,
//          persists ledger rows, and reports readiness.
// ============================================================================

//! ## Overview
//! Boots a real server on an ephemeral port with a generated identity and a
//! temporary database, then exercises `POST /as4/inbound` and `GET /healthz`
//! over
//! HTTP.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use docbridge_core::ConversationId;
use docbridge_core::DocumentTypeId;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::ParticipantId;
use docbridge_core::ProcessId;
use docbridge_core::Timestamp;
use docbridge_core::TransmissionLedger;
use docbridge_core::TransmissionStatus;
use docbridge_core::error_codes;
use docbridge_exchange::Envelope;
use docbridge_exchange::parse_receipt;
use docbridge_identity::CertificateManager;
use docbridge_server::AccessPointConfig;
use docbridge_server::AccessPointServer;
use docbridge_store_sqlite::SqliteLedger;
use docbridge_store_sqlite::SqliteLedgerConfig;
use rcgen::CertificateParams;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::KeyPair;
use rcgen::PKCS_ED25519;
use tempfile::TempDir;
use time::Duration;
use time::OffsetDateTime;

const DOC_TYPE: &str = "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0";

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn write_identity(dir: &Path, common_name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let key = KeyPair::generate_for(&PKCS_ED25519).expect("generate key");
    let mut params = CertificateParams::new(vec!["ap.example.test".to_string()]).expect("params");
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, common_name);
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(1);
    params.not_after = now + Duration::days(365);
    let cert = params.self_signed(&key).expect("self-signed cert");
    let cert_path = dir.join(format!("{common_name}.crt.pem"));
    let key_path = dir.join(format!("{common_name}.key.pem"));
    std::fs::write(&cert_path, cert.pem()).expect("write cert");
    std::fs::write(&key_path, key.serialize_pem()).expect("write key");
    (cert_path, key_path)
}

struct RunningServer {
    base: String,
    ledger_path: std::path::PathBuf,
    _dir: TempDir,
}

/// Boots a server with a fresh identity and database on an ephemeral port.
fn boot_server(max_body_bytes: usize) -> RunningServer {
    let dir = TempDir::new().expect("tempdir");
    let (cert_path, key_path) = write_identity(dir.path(), "server-ap");
    let ledger_path = dir.path().join("ledger.db");
    let config_toml = format!(
        r#"
[server]
bind = "127.0.0.1:0"
environment = "test"
max_body_bytes = {max_body_bytes}

[identity]
certificate_path = "{cert}"
private_key_path = "{key}"

[ledger]
path = "{ledger}"
"#,
        cert = cert_path.display(),
        key = key_path.display(),
        ledger = ledger_path.display(),
    );
    let config_path = dir.path().join("docbridge.toml");
    std::fs::write(&config_path, config_toml).expect("write config");
    let config = AccessPointConfig::load(Some(&config_path)).expect("load config");
    let server = AccessPointServer::from_config(&config).expect("build server");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime");
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("bind listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");
    std::thread::spawn(move || {
        let _ = runtime.block_on(server.serve_on(listener));
    });

    RunningServer {
        base: format!("http://{addr}"),
        ledger_path,
        _dir: dir,
    }
}

fn inbound_message(payload: &[u8]) -> Message {
    Message {
        message_id: MessageId::new("msg-http-0001@peer"),
        conversation_id: ConversationId::new("conv-http"),
        timestamp: Timestamp::now(),
        from: ParticipantId::new("0192", "991825827").expect("registered scheme"),
        to: ParticipantId::new("0208", "0840559537").expect("registered scheme"),
        document_type: DocumentTypeId::new(DOC_TYPE),
        process: ProcessId::new("urn:fdc:peppol.eu:2017:poacc:billing:01:1.0#process"),
        payload: payload.to_vec(),
    }
}

fn signed_envelope_xml(sender_dir: &Path, message: &Message) -> String {
    let (cert_path, key_path) = write_identity(sender_dir, "sender-ap");
    let manager = Arc::new(
        CertificateManager::load(&cert_path, Some(&key_path), None).expect("sender manager"),
    );
    let identity = manager.current();
    let mut envelope =
        Envelope::from_message(message, identity.certificate.der.clone(), Timestamp::now());
    let signature = manager.sign(envelope.signing_input().as_bytes()).expect("sign");
    envelope.signature = signature.to_bytes().to_vec();
    envelope.to_xml()
}

fn post_as4(base: &str, body: String) -> reqwest::blocking::Response {
    reqwest::blocking::Client::new()
        .post(format!("{base}/as4/inbound"))
        .body(body)
        .send()
        .expect("post envelope")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn health_probe_reports_ready() {
    let server = boot_server(1024 * 1024);
    let response =
        reqwest::blocking::get(format!("{}/healthz", server.base)).expect("health probe");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().expect("body"), "ok");
}

#[test]
fn valid_envelope_is_processed_and_persisted() {
    let server = boot_server(1024 * 1024);
    let sender_dir = TempDir::new().expect("tempdir");
    let message = inbound_message(b"<Invoice/>");
    let raw = signed_envelope_xml(sender_dir.path(), &message);

    let response = post_as4(&server.base, raw);
    assert_eq!(response.status().as_u16(), 200);
    let receipt = parse_receipt(&response.text().expect("body")).expect("receipt document");
    assert!(receipt.is_success());
    assert_eq!(receipt.ref_to_message_id, message.message_id);

    // The row is durable: a second connection sees it settled.
    let ledger = SqliteLedger::open(&SqliteLedgerConfig::for_path(&server.ledger_path))
        .expect("reopen ledger");
    let row = ledger.find(&message.message_id).expect("find").expect("row exists");
    assert_eq!(row.status, TransmissionStatus::Processed);
    assert!(row.receipt.is_some());
}

#[test]
fn malformed_body_gets_a_failure_receipt() {
    let server = boot_server(1024 * 1024);
    let response = post_as4(&server.base, "not an envelope".to_string());
    assert_eq!(response.status().as_u16(), 200);
    let receipt = parse_receipt(&response.text().expect("body")).expect("receipt document");
    assert_eq!(receipt.error_code.as_deref(), Some(error_codes::ENVELOPE_MALFORMED));
    assert_eq!(receipt.ref_to_message_id.as_str(), "unknown");
}

#[test]
fn tenant_header_is_accepted_and_bounded() {
    let server = boot_server(1024 * 1024);
    let sender_dir = TempDir::new().expect("tempdir");
    let message = inbound_message(b"<Invoice/>");
    let raw = signed_envelope_xml(sender_dir.path(), &message);
    let client = reqwest::blocking::Client::new();

    let response = client
        .post(format!("{}/as4/inbound", server.base))
        .header("x-tenant-id", "tenant-7")
        .body(raw)
        .send()
        .expect("post with tenant header");
    let receipt = parse_receipt(&response.text().expect("body")).expect("receipt document");
    assert!(receipt.is_success());

    let response = client
        .post(format!("{}/as4/inbound", server.base))
        .header("x-tenant-id", "t".repeat(512))
        .body("<Envelope/>")
        .send()
        .expect("post with overlong tenant header");
    let receipt = parse_receipt(&response.text().expect("body")).expect("receipt document");
    assert_eq!(receipt.error_code.as_deref(), Some(error_codes::PARTY_INVALID));
}

#[test]
fn oversize_body_is_refused_with_a_receipt() {
    let server = boot_server(256);
    let response = post_as4(&server.base, "x".repeat(4096));
    assert_eq!(response.status().as_u16(), 413);
    let receipt = parse_receipt(&response.text().expect("body")).expect("receipt document");
    assert_eq!(receipt.error_code.as_deref(), Some(error_codes::ENVELOPE_MALFORMED));
}
