// crates/docbridge-exchange/tests/envelope_wire.rs
// ============================================================================
// Module: Envelope Wire Tests
// Description: Envelope and receipt build/parse and signing input tests.
// Purpose: Verify the wire formats round-trip and the signing input covers
//          every signed field.
// ============================================================================

//! ## Overview
//! Wire-format tests: envelope round trips including escaped content, the
//! deterministic signing input, freshness judgments, and receipt round trips.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use docbridge_core::ConversationId;
use docbridge_core::DocumentTypeId;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::ParticipantId;
use docbridge_core::ProcessId;
use docbridge_core::Receipt;
use docbridge_core::ReceiptStatus;
use docbridge_core::Timestamp;
use docbridge_exchange::Envelope;
use docbridge_exchange::EnvelopeError;
use docbridge_exchange::FRESHNESS_WINDOW_SECS;
use docbridge_exchange::parse_receipt;
use docbridge_exchange::receipt_to_xml;

fn sample_message() -> Message {
    Message {
        message_id: MessageId::new("msg-0001@docbridge"),
        conversation_id: ConversationId::new("conv-77"),
        timestamp: Timestamp::from_unix_millis(1_724_659_200_000),
        from: ParticipantId::new("0192", "991825827").expect("registered scheme"),
        to: ParticipantId::new("0208", "0840559537").expect("registered scheme"),
        document_type: DocumentTypeId::new("urn:fdc:peppol.eu:2017:poacc:billing:01:1.0"),
        process: ProcessId::new("urn:fdc:peppol.eu:2017:poacc:billing:01:1.0#process"),
        payload: b"<Invoice>&\"total\"</Invoice>".to_vec(),
    }
}

fn sample_envelope() -> Envelope {
    let created = Timestamp::from_unix_millis(1_724_659_200_000);
    let mut envelope = Envelope::from_message(&sample_message(), vec![0x30, 0x82, 0x01], created);
    envelope.signature = vec![0xAB; 64];
    envelope
}

#[test]
fn envelope_round_trips() {
    let built = sample_envelope();
    let parsed = Envelope::parse(&built.to_xml()).expect("parse built envelope");
    assert_eq!(parsed, built);
}

#[test]
fn envelope_rebuilds_the_message() {
    let built = sample_envelope();
    let parsed = Envelope::parse(&built.to_xml()).expect("parse built envelope");
    let message = parsed.to_message().expect("valid parties");
    assert_eq!(message, sample_message());
}

#[test]
fn expires_follows_created_by_the_freshness_window() {
    let envelope = sample_envelope();
    assert_eq!(envelope.expires, envelope.created.plus_seconds(FRESHNESS_WINDOW_SECS));
}

#[test]
fn signing_input_is_deterministic_and_payload_sensitive() {
    let envelope = sample_envelope();
    assert_eq!(envelope.signing_input(), envelope.signing_input());

    let mut altered = envelope.clone();
    altered.payload.push(b'!');
    assert_ne!(envelope.signing_input(), altered.signing_input());

    let mut rerouted = envelope;
    rerouted.to_identifier = "0840559538".to_string();
    assert_ne!(rerouted.signing_input(), sample_envelope().signing_input());
}

#[test]
fn signing_input_excludes_the_signature_itself() {
    let unsigned = {
        let mut envelope = sample_envelope();
        envelope.signature = Vec::new();
        envelope
    };
    assert_eq!(unsigned.signing_input(), sample_envelope().signing_input());
}

#[test]
fn freshness_window_tolerates_bounded_skew() {
    let created = Timestamp::now();
    let mut envelope = sample_envelope();
    envelope.created = created;
    envelope.expires = created.plus_seconds(FRESHNESS_WINDOW_SECS);
    assert!(envelope.is_fresh(created.plus_seconds(10)));

    // Expired beyond skew.
    assert!(!envelope.is_fresh(envelope.expires.plus_seconds(120)));
    // Created too far in the future.
    assert!(!envelope.is_fresh(created.plus_seconds(-120)));
}

#[test]
fn parse_names_the_first_missing_element() {
    let built = sample_envelope();
    let xml = built.to_xml().replace("<ConversationId>conv-77</ConversationId>", "");
    let err = Envelope::parse(&xml).expect_err("missing conversation id");
    assert_eq!(err, EnvelopeError::Malformed("ConversationId"));

    assert_eq!(
        Envelope::parse("not xml at all").expect_err("garbage input"),
        EnvelopeError::Malformed("Header")
    );
}

#[test]
fn parse_rejects_undecodable_base64() {
    let built = sample_envelope();
    let bad_signature = built.to_xml().replace(
        &format!(
            "<SignatureValue>{}</SignatureValue>",
            {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(&built.signature)
            }
        ),
        "<SignatureValue>@@@@</SignatureValue>",
    );
    let err = Envelope::parse(&bad_signature).expect_err("bad signature base64");
    assert_eq!(err, EnvelopeError::Malformed("SignatureValue"));
}

#[test]
fn empty_payload_still_parses() {
    let mut built = sample_envelope();
    built.payload = Vec::new();
    let parsed = Envelope::parse(&built.to_xml()).expect("empty payload body");
    assert!(parsed.payload.is_empty());
}

#[test]
fn success_receipt_round_trips() {
    let receipt = Receipt::success(
        MessageId::new("msg-0001@docbridge"),
        Timestamp::from_unix_millis(1_724_659_260_000),
    );
    let parsed = parse_receipt(&receipt_to_xml(&receipt)).expect("parse success receipt");
    assert_eq!(parsed, receipt);
    assert_eq!(parsed.status, ReceiptStatus::Success);
}

#[test]
fn failure_receipt_round_trips_with_code_and_description() {
    let receipt = Receipt::failure(
        MessageId::new("msg-0002@docbridge"),
        Timestamp::from_unix_millis(1_724_659_260_000),
        "DB:0002",
        "envelope signature does not verify",
    );
    let parsed = parse_receipt(&receipt_to_xml(&receipt)).expect("parse failure receipt");
    assert_eq!(parsed, receipt);
}

#[test]
fn receipt_with_unknown_status_is_malformed() {
    let xml = "<Receipt><RefToMessageId>m</RefToMessageId>\
               <Timestamp>2026-08-26T00:00:00Z</Timestamp>\
               <Status>Maybe</Status></Receipt>";
    assert_eq!(parse_receipt(xml).expect_err("unknown status"), EnvelopeError::Malformed("Status"));
}
