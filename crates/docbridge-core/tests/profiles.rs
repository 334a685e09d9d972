// crates/docbridge-core/tests/profiles.rs
// ============================================================================
// Module: Document Profile Tests
// Description: Profile identifiers, validation, and payload mapping tests.
// Purpose: Verify the closed profile set and the document mapper seam.
// ============================================================================

//! ## Overview
//! Exercises the supported document profiles: identifier constants, required
//! field validation, payload rendering with escaping, and the
//! [`DocumentMapper`] trait over raw document bytes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use docbridge_core::DocumentMapper;
use docbridge_core::DocumentProfile;
use docbridge_core::MapperError;
use docbridge_core::PassthroughMapper;
use serde_json::json;

fn sample_document() -> serde_json::Value {
    json!({
        "invoice_number": "INV-2026-001",
        "issue_date": "2026-08-26",
        "supplier": "Acme & Sons",
        "customer": "Globex",
        "total": "1250.00",
    })
}

#[test]
fn profile_identifiers_are_stable() {
    assert_eq!(
        DocumentProfile::PeppolBis3.document_type().as_str(),
        "urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0"
    );
    assert_eq!(
        DocumentProfile::JpPint.document_type().as_str(),
        "urn:peppol:pint:billing-1@jp-1"
    );
    assert_eq!(
        DocumentProfile::InvoiceNowSg.process().as_str(),
        "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0"
    );
    assert_eq!(DocumentProfile::JpPint.process().as_str(), "urn:peppol:bis:billing");
}

#[test]
fn validation_names_the_first_missing_field() {
    let mut document = sample_document();
    document.as_object_mut().expect("object").remove("supplier");
    let err = DocumentProfile::PeppolBis3.validate(&document).expect_err("missing supplier");
    assert_eq!(err, MapperError::MissingField("supplier"));

    let err = DocumentProfile::PeppolBis3.validate(&json!([])).expect_err("not an object");
    assert_eq!(err, MapperError::NotAnObject);
}

#[test]
fn blank_required_fields_are_rejected() {
    let mut document = sample_document();
    document["customer"] = json!("   ");
    let err = DocumentProfile::PeppolBis3.validate(&document).expect_err("blank customer");
    assert_eq!(err, MapperError::MissingField("customer"));
}

#[test]
fn payload_carries_profile_identifiers_and_escapes_content() {
    let payload = DocumentProfile::PeppolBis3
        .to_envelope_payload(&sample_document())
        .expect("mapped payload");
    let xml = String::from_utf8(payload).expect("utf-8 payload");
    assert!(xml.contains("<ID>INV-2026-001</ID>"));
    assert!(xml.contains("<SupplierName>Acme &amp; Sons</SupplierName>"));
    assert!(xml.contains(
        "<CustomizationID>urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0</CustomizationID>"
    ));
}

#[test]
fn mapper_trait_parses_document_bytes() {
    let bytes = serde_json::to_vec(&sample_document()).expect("serialize document");
    let mapper: &dyn DocumentMapper = &DocumentProfile::InvoiceNowSg;
    let payload = mapper.map_to_payload(&bytes).expect("mapped payload");
    let xml = String::from_utf8(payload).expect("utf-8 payload");
    assert!(xml.contains("<CustomerName>Globex</CustomerName>"));
}

#[test]
fn mapper_trait_rejects_unparsable_bytes() {
    let mapper: &dyn DocumentMapper = &DocumentProfile::PeppolBis3;
    let err = mapper.map_to_payload(b"not json").expect_err("unparsable document");
    assert!(matches!(err, MapperError::Invalid(_)));
}

#[test]
fn passthrough_mapper_keeps_bytes_unchanged() {
    let payload = PassthroughMapper
        .map_to_payload(b"<Invoice/>")
        .expect("passthrough");
    assert_eq!(payload, b"<Invoice/>");
}
