// crates/docbridge-core/src/core/profile.rs
// ============================================================================
// Module: Docbridge Document Profiles
// Description: Closed set of supported business-document profiles.
// Purpose: Map internal documents to envelope payload bytes per profile.
// Dependencies: crate::core::{identifiers, xmlscan}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Docbridge supports a closed set of country document profiles: the generic
//! EU billing profile, InvoiceNow (Singapore), and JP PINT (Japan). Each
//! variant implements the same narrow mapping contract, `validate` and
//! `to_envelope_payload`; the exchange layer stays profile-agnostic and only
//! consumes the mapped bytes plus document/process identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::DocumentTypeId;
use crate::core::identifiers::ProcessId;
use crate::core::xmlscan;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Document mapping errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapperError {
    /// Internal document is missing a required field.
    #[error("document missing required field: {0}")]
    MissingField(&'static str),
    /// Internal document is not an object.
    #[error("document must be a json object")]
    NotAnObject,
    /// Internal document bytes could not be parsed.
    #[error("document unparsable: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Document Profiles
// ============================================================================

/// Supported business-document profiles.
///
/// # Invariants
/// - The set is closed; adding a profile is a code change, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentProfile {
    /// Generic EU billing profile (Peppol BIS Billing 3.0).
    PeppolBis3,
    /// Singapore InvoiceNow profile.
    InvoiceNowSg,
    /// Japan JP PINT profile.
    JpPint,
}

/// Fields every profile requires from the internal document.
const REQUIRED_FIELDS: &[&str] = &["invoice_number", "issue_date", "supplier", "customer", "total"];

impl DocumentProfile {
    /// Returns the customization (document type) identifier for the profile.
    #[must_use]
    pub fn document_type(self) -> DocumentTypeId {
        let id = match self {
            Self::PeppolBis3 => {
                "urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0"
            }
            Self::InvoiceNowSg => {
                "urn:cen.eu:en16931:2017#conformant#urn:fdc:peppol.eu:2017:poacc:billing:international:sg:3.0"
            }
            Self::JpPint => "urn:peppol:pint:billing-1@jp-1",
        };
        DocumentTypeId::new(id)
    }

    /// Returns the process identifier for the profile.
    #[must_use]
    pub fn process(self) -> ProcessId {
        let id = match self {
            Self::PeppolBis3 | Self::InvoiceNowSg => "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0",
            Self::JpPint => "urn:peppol:bis:billing",
        };
        ProcessId::new(id)
    }

    /// Validates the internal document against the profile contract.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError`] when the document is not an object or a
    /// required field is missing or empty.
    pub fn validate(self, document: &Value) -> Result<(), MapperError> {
        let map = document.as_object().ok_or(MapperError::NotAnObject)?;
        for field in REQUIRED_FIELDS {
            let present = map.get(*field).is_some_and(|value| match value {
                Value::String(text) => !text.trim().is_empty(),
                Value::Null => false,
                _ => true,
            });
            if !present {
                return Err(MapperError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Maps the internal document to envelope payload bytes.
    ///
    /// The payload is a minimal invoice document carrying the profile's
    /// customization and process identifiers; full schema rendering is the
    /// concern of an upstream mapping collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError`] when validation fails.
    pub fn to_envelope_payload(self, document: &Value) -> Result<Vec<u8>, MapperError> {
        self.validate(document)?;
        let field = |name: &'static str| -> String {
            document
                .get(name)
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };
        let xml = format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
                "<Invoice>",
                "<CustomizationID>{customization}</CustomizationID>",
                "<ProfileID>{profile}</ProfileID>",
                "<ID>{id}</ID>",
                "<IssueDate>{issued}</IssueDate>",
                "<SupplierName>{supplier}</SupplierName>",
                "<CustomerName>{customer}</CustomerName>",
                "<PayableAmount>{total}</PayableAmount>",
                "</Invoice>",
            ),
            customization = xmlscan::escape(self.document_type().as_str()),
            profile = xmlscan::escape(self.process().as_str()),
            id = xmlscan::escape(&field("invoice_number")),
            issued = xmlscan::escape(&field("issue_date")),
            supplier = xmlscan::escape(&field("supplier")),
            customer = xmlscan::escape(&field("customer")),
            total = xmlscan::escape(&field("total")),
        );
        Ok(xml.into_bytes())
    }
}
