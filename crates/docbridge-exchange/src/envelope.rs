// crates/docbridge-exchange/src/envelope.rs
// ============================================================================
// Module: AS4 Envelope Wire Format
// Description: Envelope and receipt build, parse, and signing input.
// Purpose: Carry business documents and receipts in a fixed XML shape with a
//          deterministic signing input.
// Dependencies: docbridge-core, base64, thiserror
// ============================================================================

//! ## Overview
//! The wire envelope carries message info, scheme-qualified parties,
//! collaboration info, a security block with a freshness window, the sender
//! certificate token, a detached signature, and the base64 payload body.
//! The signing input is a deterministic line-oriented digest of every field
//! the signature covers, so build and parse agree byte-for-byte on what was
//! signed. Parsing is shape-only; signature and trust checks stay with the
//! exchange layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::Receipt;
use docbridge_core::ReceiptStatus;
use docbridge_core::SchemeError;
use docbridge_core::Timestamp;
use docbridge_core::hashing::sha256_hex;
use docbridge_core::xmlscan;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Seconds a security block stays fresh after its `Created` instant.
pub const FRESHNESS_WINDOW_SECS: i64 = 300;

/// Clock skew tolerated when judging freshness, in seconds.
pub const CLOCK_SKEW_SECS: i64 = 60;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope and receipt parsing errors.
///
/// # Invariants
/// - The embedded name identifies the first missing or malformed element.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A required element is missing or malformed.
    #[error("envelope malformed: {0}")]
    Malformed(&'static str),
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Parsed or to-be-built wire envelope.
///
/// Parties are carried as raw scheme/identifier strings so that registry
/// validation stays a separate, reportable step.
///
/// # Invariants
/// - `expires` is strictly after `created` in built envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message identifier.
    pub message_id: String,
    /// Conversation identifier.
    pub conversation_id: String,
    /// Business timestamp of the message.
    pub timestamp: Timestamp,
    /// Sender scheme code.
    pub from_scheme: String,
    /// Sender identifier.
    pub from_identifier: String,
    /// Receiver scheme code.
    pub to_scheme: String,
    /// Receiver identifier.
    pub to_identifier: String,
    /// Document type identifier (wire `Action`).
    pub document_type: String,
    /// Process identifier (wire `Service`).
    pub process: String,
    /// Security block creation instant.
    pub created: Timestamp,
    /// Security block expiry instant.
    pub expires: Timestamp,
    /// Sender certificate as DER bytes.
    pub sender_cert_der: Vec<u8>,
    /// Detached signature over [`Envelope::signing_input`].
    pub signature: Vec<u8>,
    /// Raw business payload bytes.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Builds an unsigned envelope from a message and sender certificate.
    #[must_use]
    pub fn from_message(message: &Message, sender_cert_der: Vec<u8>, created: Timestamp) -> Self {
        Self {
            message_id: message.message_id.as_str().to_string(),
            conversation_id: message.conversation_id.as_str().to_string(),
            timestamp: message.timestamp,
            from_scheme: message.from.scheme().to_string(),
            from_identifier: message.from.identifier().to_string(),
            to_scheme: message.to.scheme().to_string(),
            to_identifier: message.to.identifier().to_string(),
            document_type: message.document_type.as_str().to_string(),
            process: message.process.as_str().to_string(),
            created,
            expires: created.plus_seconds(FRESHNESS_WINDOW_SECS),
            sender_cert_der,
            signature: Vec::new(),
            payload: message.payload.clone(),
        }
    }

    /// Returns the deterministic signing input covering all signed fields.
    ///
    /// The payload enters by SHA-256 digest so the input stays small and
    /// independent of payload size.
    #[must_use]
    pub fn signing_input(&self) -> String {
        let lines = [
            self.message_id.as_str(),
            self.conversation_id.as_str(),
            &self.timestamp.to_rfc3339(),
            &format!("{}:{}", self.from_scheme, self.from_identifier),
            &format!("{}:{}", self.to_scheme, self.to_identifier),
            self.document_type.as_str(),
            self.process.as_str(),
            &self.created.to_rfc3339(),
            &self.expires.to_rfc3339(),
            &sha256_hex(&self.payload),
        ];
        lines.join("\n")
    }

    /// Returns true when the security block is fresh at `now`.
    ///
    /// Allows [`CLOCK_SKEW_SECS`] of skew on both window edges.
    #[must_use]
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        let created_limit = now.plus_seconds(CLOCK_SKEW_SECS);
        let expires_floor = now.plus_seconds(-CLOCK_SKEW_SECS);
        self.created <= created_limit && self.expires >= expires_floor
    }

    /// Validates the parties against the scheme registry and rebuilds the
    /// business message.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError`] for unknown schemes or empty identifiers.
    pub fn to_message(&self) -> Result<Message, SchemeError> {
        Ok(Message {
            message_id: docbridge_core::MessageId::new(self.message_id.clone()),
            conversation_id: docbridge_core::ConversationId::new(self.conversation_id.clone()),
            timestamp: self.timestamp,
            from: docbridge_core::ParticipantId::new(&self.from_scheme, &self.from_identifier)?,
            to: docbridge_core::ParticipantId::new(&self.to_scheme, &self.to_identifier)?,
            document_type: docbridge_core::DocumentTypeId::new(self.document_type.clone()),
            process: docbridge_core::ProcessId::new(self.process.clone()),
            payload: self.payload.clone(),
        })
    }

    /// Serializes the envelope to its wire XML form.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            "<Envelope>\
             <Header>\
             <MessageInfo>\
             <MessageId>{}</MessageId>\
             <ConversationId>{}</ConversationId>\
             <Timestamp>{}</Timestamp>\
             </MessageInfo>\
             <PartyInfo>\
             <From scheme=\"{}\">{}</From>\
             <To scheme=\"{}\">{}</To>\
             </PartyInfo>\
             <CollaborationInfo>\
             <Service>{}</Service>\
             <Action>{}</Action>\
             </CollaborationInfo>\
             <Security>\
             <Created>{}</Created>\
             <Expires>{}</Expires>\
             <BinarySecurityToken>{}</BinarySecurityToken>\
             <SignatureValue>{}</SignatureValue>\
             </Security>\
             </Header>\
             <Body>\
             <Payload>{}</Payload>\
             </Body>\
             </Envelope>",
            xmlscan::escape(&self.message_id),
            xmlscan::escape(&self.conversation_id),
            self.timestamp.to_rfc3339(),
            xmlscan::escape(&self.from_scheme),
            xmlscan::escape(&self.from_identifier),
            xmlscan::escape(&self.to_scheme),
            xmlscan::escape(&self.to_identifier),
            xmlscan::escape(&self.process),
            xmlscan::escape(&self.document_type),
            self.created.to_rfc3339(),
            self.expires.to_rfc3339(),
            BASE64.encode(&self.sender_cert_der),
            BASE64.encode(&self.signature),
            BASE64.encode(&self.payload),
        )
    }

    /// Parses a wire envelope; every required element must be present.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] naming the first missing or
    /// undecodable element.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let header = xmlscan::first_element(raw, "Header")
            .ok_or(EnvelopeError::Malformed("Header"))?;
        let header = header.inner;
        let from = xmlscan::first_element(header, "From")
            .ok_or(EnvelopeError::Malformed("From"))?;
        let to = xmlscan::first_element(header, "To").ok_or(EnvelopeError::Malformed("To"))?;
        Ok(Self {
            message_id: required_text(header, "MessageId")?,
            conversation_id: required_text(header, "ConversationId")?,
            timestamp: required_time(header, "Timestamp")?,
            from_scheme: xmlscan::attribute(from.tag, "scheme")
                .ok_or(EnvelopeError::Malformed("From scheme"))?,
            from_identifier: xmlscan::unescape(from.inner.trim()),
            to_scheme: xmlscan::attribute(to.tag, "scheme")
                .ok_or(EnvelopeError::Malformed("To scheme"))?,
            to_identifier: xmlscan::unescape(to.inner.trim()),
            document_type: required_text(header, "Action")?,
            process: required_text(header, "Service")?,
            created: required_time(header, "Created")?,
            expires: required_time(header, "Expires")?,
            sender_cert_der: required_base64(header, "BinarySecurityToken")?,
            signature: required_base64(header, "SignatureValue")?,
            payload: {
                let body = xmlscan::first_element(raw, "Body")
                    .ok_or(EnvelopeError::Malformed("Body"))?;
                required_base64(body.inner, "Payload")?
            },
        })
    }
}

// ============================================================================
// SECTION: Receipt Wire Format
// ============================================================================

/// Serializes a receipt to its wire XML form.
#[must_use]
pub fn receipt_to_xml(receipt: &Receipt) -> String {
    let mut out = format!(
        "<Receipt>\
         <RefToMessageId>{}</RefToMessageId>\
         <Timestamp>{}</Timestamp>\
         <Status>{}</Status>",
        xmlscan::escape(receipt.ref_to_message_id.as_str()),
        receipt.timestamp.to_rfc3339(),
        receipt.status.as_str(),
    );
    if let Some(code) = &receipt.error_code {
        out.push_str(&format!("<ErrorCode>{}</ErrorCode>", xmlscan::escape(code)));
    }
    if let Some(description) = &receipt.error_description {
        out.push_str(&format!(
            "<ErrorDescription>{}</ErrorDescription>",
            xmlscan::escape(description)
        ));
    }
    out.push_str("</Receipt>");
    out
}

/// Parses a wire receipt.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] naming the first missing or
/// malformed element.
pub fn parse_receipt(raw: &str) -> Result<Receipt, EnvelopeError> {
    let receipt = xmlscan::first_element(raw, "Receipt")
        .ok_or(EnvelopeError::Malformed("Receipt"))?;
    let inner = receipt.inner;
    let status_label = required_text(inner, "Status")?;
    let status = ReceiptStatus::from_label(&status_label)
        .ok_or(EnvelopeError::Malformed("Status"))?;
    Ok(Receipt {
        ref_to_message_id: MessageId::new(required_text(inner, "RefToMessageId")?),
        timestamp: required_time(inner, "Timestamp")?,
        status,
        error_code: xmlscan::text(inner, "ErrorCode"),
        error_description: xmlscan::text(inner, "ErrorDescription"),
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a required text element.
fn required_text(xml: &str, local: &'static str) -> Result<String, EnvelopeError> {
    let value = xmlscan::text(xml, local).ok_or(EnvelopeError::Malformed(local))?;
    if value.is_empty() {
        return Err(EnvelopeError::Malformed(local));
    }
    Ok(value)
}

/// Reads a required RFC 3339 timestamp element.
fn required_time(xml: &str, local: &'static str) -> Result<Timestamp, EnvelopeError> {
    let value = xmlscan::text(xml, local).ok_or(EnvelopeError::Malformed(local))?;
    Timestamp::parse_rfc3339(&value).ok_or(EnvelopeError::Malformed(local))
}

/// Reads a required base64 element; decodes after stripping whitespace.
fn required_base64(xml: &str, local: &'static str) -> Result<Vec<u8>, EnvelopeError> {
    let value = xmlscan::text(xml, local).ok_or(EnvelopeError::Malformed(local))?;
    let compact: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
    BASE64.decode(compact.as_bytes()).map_err(|_| EnvelopeError::Malformed(local))
}
