// crates/docbridge-core/tests/identifiers.rs
// ============================================================================
// Module: Identifier Unit Tests
// Description: Scheme registry validation and canonical form tests.
// Purpose: Verify participant validation is deterministic and total.
// ============================================================================

//! ## Overview
//! Unit tests for the closed scheme registry:
//! - Supported schemes construct; unknown schemes and empty identifiers fail
//!   with the declared error kinds.
//! - Canonical discovery form is a pure function of scheme and identifier.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use docbridge_core::ParticipantId;
use docbridge_core::SchemeError;
use docbridge_core::TransportProfile;
use docbridge_core::supported_schemes;
use proptest::prelude::any;
use proptest::prelude::proptest;

#[test]
fn supported_schemes_construct() {
    for entry in supported_schemes() {
        let participant =
            ParticipantId::new(entry.code, "987654325").expect("registry scheme accepted");
        assert_eq!(participant.scheme(), entry.code);
        assert_eq!(participant.identifier(), "987654325");
    }
}

#[test]
fn unknown_scheme_is_rejected() {
    let err = ParticipantId::new("9999", "123").expect_err("scheme outside registry");
    assert_eq!(err, SchemeError::UnsupportedScheme("9999".to_string()));
}

#[test]
fn empty_identifier_is_rejected() {
    let err = ParticipantId::new("0192", "   ").expect_err("blank identifier");
    assert_eq!(err, SchemeError::EmptyIdentifier);
}

#[test]
fn formatted_and_parse_round_trip() {
    let participant = ParticipantId::new("0192", "987654325").expect("valid participant");
    assert_eq!(participant.formatted(), "0192:987654325");
    let parsed = ParticipantId::parse(&participant.formatted()).expect("parse wire form");
    assert_eq!(parsed, participant);
}

#[test]
fn parse_without_separator_fails() {
    let err = ParticipantId::parse("0192987654325").expect_err("missing separator");
    assert_eq!(err, SchemeError::EmptyIdentifier);
}

#[test]
fn canonical_form_is_lowercase() {
    let participant = ParticipantId::new("0195", "T12UEN345X").expect("valid participant");
    assert_eq!(participant.canonical(), "0195::t12uen345x");
}

#[test]
fn transport_profile_round_trips() {
    let profile = TransportProfile::As4V2;
    assert_eq!(TransportProfile::from_identifier(profile.as_str()), Some(profile));
    assert_eq!(TransportProfile::from_identifier("busdox-transport-start"), None);
}

proptest! {
    // Validation must be total: any input resolves to Ok or a declared error.
    #[test]
    fn validation_is_total(scheme in any::<String>(), identifier in any::<String>()) {
        match ParticipantId::new(&scheme, &identifier) {
            Ok(participant) => {
                assert_eq!(participant.scheme(), scheme);
                assert_eq!(participant.identifier(), identifier.trim());
            }
            Err(SchemeError::UnsupportedScheme(reported)) => assert_eq!(reported, scheme),
            Err(SchemeError::EmptyIdentifier) => assert!(identifier.trim().is_empty()),
        }
    }

    // Identical inputs always produce identical canonical forms.
    #[test]
    fn canonical_is_deterministic(identifier in "[A-Za-z0-9]{1,24}") {
        let first = ParticipantId::new("0192", &identifier).expect("valid participant");
        let second = ParticipantId::new("0192", &identifier).expect("valid participant");
        assert_eq!(first.canonical(), second.canonical());
    }
}
