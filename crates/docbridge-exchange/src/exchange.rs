// crates/docbridge-exchange/src/exchange.rs
// ============================================================================
// Module: Message Exchange
// Description: Outbound send and inbound receive orchestration.
// Purpose: Drive resolve/sign/deliver and verify/record flows against the
//          transmission ledger, with audit events per attempt.
// Dependencies: crate::envelope, crate::transport, docbridge-core,
//               docbridge-directory, docbridge-identity, rand, thiserror
// ============================================================================

//! ## Overview
//! The exchange is the only writer of transmission state. Outbound sends
//! create a `Pending` row before any network I/O, check the caller's cancel
//! flag, resolve the endpoint, enforce certificate pinning before any
//! connection, sign, transition to `Sent`, deliver, and settle the row from
//! the peer receipt. Inbound receives never fail hard: every envelope is
//! answered with a receipt, and anything that parsed far enough to carry
//! valid parties leaves a ledger row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use docbridge_core::AuditAction;
use docbridge_core::AuditEvent;
use docbridge_core::AuditOutcome;
use docbridge_core::AuditSink;
use docbridge_core::ConversationId;
use docbridge_core::Direction;
use docbridge_core::DocumentTypeId;
use docbridge_core::LedgerError;
use docbridge_core::Message;
use docbridge_core::MessageId;
use docbridge_core::ParticipantId;
use docbridge_core::ProcessId;
use docbridge_core::Receipt;
use docbridge_core::Timestamp;
use docbridge_core::TransmissionLedger;
use docbridge_core::TransmissionStatus;
use docbridge_core::error_codes;
use docbridge_directory::DirectoryError;
use docbridge_directory::ParticipantDirectory;
use docbridge_identity::AccessPointCertificate;
use docbridge_identity::CertificateManager;
use docbridge_identity::SigningError;
use docbridge_identity::TransportTrustConfig;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::envelope::parse_receipt;
use crate::transport::MessageTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Outbound send errors.
///
/// # Invariants
/// - `Rejected` carries the peer's code and description verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Endpoint resolution failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// Endpoint certificate is not in the pin set.
    #[error("untrusted peer: {0}")]
    UntrustedPeer(String),
    /// Envelope signing failed.
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// Delivery failed at the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Peer answered with an unparsable receipt.
    #[error("unparsable receipt: {0}")]
    Receipt(String),
    /// Peer rejected the message.
    #[error("peer rejected message: {code:?} {description:?}")]
    Rejected {
        /// Peer error code, verbatim.
        code: Option<String>,
        /// Peer error description, verbatim.
        description: Option<String>,
    },
    /// Ledger write failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Caller cancelled before dispatch.
    #[error("send cancelled before dispatch")]
    Cancelled,
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Caller-held cancellation flag checked once before dispatch.
///
/// # Invariants
/// - Cancellation is observed only at the pre-dispatch checkpoint; an
///   envelope already handed to the transport is never recalled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Shared cancellation flag.
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true when cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

// ============================================================================
// SECTION: Message Identifiers
// ============================================================================

/// Boot-scoped message identifier generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime and never
///   reused across attempts.
#[derive(Debug)]
pub struct MessageIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for identifiers issued in this process.
    counter: AtomicU64,
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIdGenerator {
    /// Creates a new generator with fresh boot entropy.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new message identifier.
    #[must_use]
    pub fn issue(&self) -> MessageId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        MessageId::new(format!("msg-{:016x}-{seq:016x}@docbridge", self.boot_id))
    }
}

// ============================================================================
// SECTION: Send Request
// ============================================================================

/// One outbound send request; the exchange assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Sending participant.
    pub from: ParticipantId,
    /// Receiving participant.
    pub to: ParticipantId,
    /// Document type identifier.
    pub document_type: DocumentTypeId,
    /// Process identifier.
    pub process: ProcessId,
    /// Business payload bytes.
    pub payload: Vec<u8>,
}

// ============================================================================
// SECTION: Message Exchange
// ============================================================================

/// Orchestrates outbound sends and inbound receives.
///
/// # Invariants
/// - Every outbound attempt that reaches `Pending` ends in a terminal ledger
///   state, except attempts cancelled before dispatch.
/// - Inbound processing always produces a receipt.
pub struct MessageExchange {
    /// Access point identity for signing and verification.
    identity: Arc<CertificateManager>,
    /// Participant directory for endpoint resolution.
    directory: ParticipantDirectory,
    /// Outbound envelope transport.
    transport: MessageTransport,
    /// Transmission ledger.
    ledger: Arc<dyn TransmissionLedger>,
    /// Compliance audit sink.
    audit: Arc<dyn AuditSink>,
    /// Transport trust configuration, including pins.
    trust: TransportTrustConfig,
    /// Message identifier generator.
    ids: MessageIdGenerator,
}

impl MessageExchange {
    /// Creates an exchange over the given collaborators.
    #[must_use]
    pub fn new(
        identity: Arc<CertificateManager>,
        directory: ParticipantDirectory,
        transport: MessageTransport,
        ledger: Arc<dyn TransmissionLedger>,
        audit: Arc<dyn AuditSink>,
        trust: TransportTrustConfig,
    ) -> Self {
        Self {
            identity,
            directory,
            transport,
            ledger,
            audit,
            trust,
            ids: MessageIdGenerator::new(),
        }
    }

    /// Sends one message; returns the assigned message identifier.
    ///
    /// A ledger row is created `Pending` before any network I/O. The cancel
    /// token is checked once, before dispatch; a cancelled attempt leaves the
    /// row `Pending` and performs no network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] for every failure class; the ledger row is moved
    /// to `Failed` for all of them except [`SendError::Cancelled`].
    pub fn send(
        &self,
        request: &SendRequest,
        cancel: &CancelToken,
    ) -> Result<MessageId, SendError> {
        let started = Instant::now();
        let message_id = self.ids.issue();
        let message = Message {
            message_id: message_id.clone(),
            conversation_id: request.conversation_id.clone(),
            timestamp: Timestamp::now(),
            from: request.from.clone(),
            to: request.to.clone(),
            document_type: request.document_type.clone(),
            process: request.process.clone(),
            payload: request.payload.clone(),
        };
        let result = self.dispatch(&message, cancel);
        let (outcome, detail) = match &result {
            Ok(()) => (AuditOutcome::Ok, None),
            Err(SendError::Cancelled) => (AuditOutcome::Warning, Some("cancelled".to_string())),
            Err(err) => (AuditOutcome::Error, Some(err.to_string())),
        };
        self.audit.record(AuditEvent {
            action: AuditAction::Send,
            message_id: Some(message_id.clone()),
            outcome,
            detail,
            duration: started.elapsed(),
        });
        result.map(|()| message_id)
    }

    /// Runs the outbound pipeline for one message.
    fn dispatch(&self, message: &Message, cancel: &CancelToken) -> Result<(), SendError> {
        self.ledger.create(message, Direction::Outbound)?;
        if cancel.is_cancelled() {
            return Err(SendError::Cancelled);
        }

        let endpoint = match self.directory.resolve(&message.to, &message.document_type) {
            Ok(endpoint) => endpoint,
            Err(err) => return self.settle_failed(&message.message_id, err.into()),
        };

        // Pin check happens before any connection to the endpoint.
        if !self.trust.permits(&endpoint.certificate.fingerprint) {
            let err = SendError::UntrustedPeer(format!(
                "endpoint certificate {} is not pinned",
                endpoint.certificate.fingerprint.as_str()
            ));
            return self.settle_failed(&message.message_id, err);
        }

        let identity = self.identity.current();
        let mut envelope =
            Envelope::from_message(message, identity.certificate.der.clone(), Timestamp::now());
        let signature = match self.identity.sign(envelope.signing_input().as_bytes()) {
            Ok(signature) => signature,
            Err(err) => return self.settle_failed(&message.message_id, err.into()),
        };
        envelope.signature = signature.to_bytes().to_vec();
        let body = envelope.to_xml();

        self.ledger.transition(&message.message_id, TransmissionStatus::Sent, None, None)?;
        let response = match self.transport.post(
            &endpoint.url,
            &body,
            &self.trust,
            &endpoint.certificate.der,
        ) {
            Ok(response) => response,
            Err(err) => return self.settle_failed(&message.message_id, err.into()),
        };

        let receipt = match parse_receipt(&response) {
            Ok(receipt) => receipt,
            Err(err) => {
                return self.settle_failed(&message.message_id, SendError::Receipt(err.to_string()));
            }
        };
        if receipt.is_success() {
            self.ledger.transition(
                &message.message_id,
                TransmissionStatus::Delivered,
                Some(&receipt),
                None,
            )?;
            return Ok(());
        }
        let err = SendError::Rejected {
            code: receipt.error_code.clone(),
            description: receipt.error_description.clone(),
        };
        self.ledger.transition(
            &message.message_id,
            TransmissionStatus::Failed,
            Some(&receipt),
            receipt.error_description.as_deref(),
        )?;
        Err(err)
    }

    /// Moves the row to `Failed` with the error detail, then returns the
    /// original error.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Ledger`] when the failure itself cannot be
    /// recorded; the original error is superseded.
    fn settle_failed(&self, message_id: &MessageId, err: SendError) -> Result<(), SendError> {
        self.ledger.transition(
            message_id,
            TransmissionStatus::Failed,
            None,
            Some(&err.to_string()),
        )?;
        Err(err)
    }

    /// Processes one inbound envelope; always answers with a receipt.
    ///
    /// Malformed envelopes and invalid parties produce failure receipts with
    /// no ledger row; everything that parsed with valid parties leaves a row,
    /// rejected or processed. Duplicates of settled inbound rows return the
    /// stored receipt unchanged; identifiers colliding with outbound rows are
    /// refused.
    pub fn receive(&self, raw: &str) -> Receipt {
        let started = Instant::now();
        let receipt = self.accept(raw);
        let outcome = if receipt.is_success() { AuditOutcome::Ok } else { AuditOutcome::Error };
        self.audit.record(AuditEvent {
            action: AuditAction::Receive,
            message_id: Some(receipt.ref_to_message_id.clone()),
            outcome,
            detail: receipt.error_code.clone(),
            duration: started.elapsed(),
        });
        receipt
    }

    /// Runs the inbound pipeline for one raw envelope.
    fn accept(&self, raw: &str) -> Receipt {
        let now = Timestamp::now();
        let Ok(envelope) = Envelope::parse(raw) else {
            return Receipt::failure(
                MessageId::new("unknown"),
                now,
                error_codes::ENVELOPE_MALFORMED,
                "envelope could not be parsed",
            );
        };
        let message_id = MessageId::new(envelope.message_id.clone());

        let message = match envelope.to_message() {
            Ok(message) => message,
            Err(err) => {
                return Receipt::failure(
                    message_id,
                    now,
                    error_codes::PARTY_INVALID,
                    err.to_string(),
                );
            }
        };

        match self.ledger.find(&message_id) {
            Ok(Some(existing)) => {
                // Replay applies only to inbound rows; an identifier already
                // used by an outbound send is a collision, not a duplicate.
                let stored = (existing.direction == Direction::Inbound)
                    .then_some(existing.receipt)
                    .flatten();
                return stored.unwrap_or_else(|| {
                    Receipt::failure(
                        message_id,
                        now,
                        error_codes::PARTY_INVALID,
                        "message id already in use",
                    )
                });
            }
            Ok(None) => {}
            Err(err) => {
                return Receipt::failure(
                    message_id,
                    now,
                    error_codes::TRANSPORT_FAILURE,
                    err.to_string(),
                );
            }
        }
        if let Err(err) = self.ledger.create(&message, Direction::Inbound) {
            return Receipt::failure(
                message_id,
                now,
                error_codes::TRANSPORT_FAILURE,
                err.to_string(),
            );
        }

        if let Some(receipt) = self.screen(&envelope, &message_id, now) {
            self.reject(&receipt);
            return receipt;
        }

        let receipt = Receipt::success(message_id.clone(), now);
        if let Err(err) = self.ledger.transition(
            &message_id,
            TransmissionStatus::Processed,
            Some(&receipt),
            None,
        ) {
            return Receipt::failure(
                message_id,
                now,
                error_codes::TRANSPORT_FAILURE,
                err.to_string(),
            );
        }
        receipt
    }

    /// Screens a parsed inbound envelope; returns the failure receipt for
    /// the first violated check, if any.
    fn screen(
        &self,
        envelope: &Envelope,
        message_id: &MessageId,
        now: Timestamp,
    ) -> Option<Receipt> {
        let Ok(sender_cert) = AccessPointCertificate::from_der(&envelope.sender_cert_der) else {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::SIGNATURE_INVALID,
                "sender certificate token is unparsable",
            ));
        };
        if sender_cert.ensure_valid_at(now).is_err() {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::PEER_UNTRUSTED,
                "sender certificate is outside its validity window",
            ));
        }
        if !self.trust.permits(&sender_cert.fingerprint) {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::PEER_UNTRUSTED,
                "sender certificate is not pinned",
            ));
        }
        if !CertificateManager::verify(
            envelope.signing_input().as_bytes(),
            &envelope.signature,
            &sender_cert.public_key,
        ) {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::SIGNATURE_INVALID,
                "envelope signature does not verify",
            ));
        }
        if !envelope.is_fresh(now) {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::SECURITY_STALE,
                "security block is outside its freshness window",
            ));
        }
        if envelope.payload.is_empty() {
            return Some(Receipt::failure(
                message_id.clone(),
                now,
                error_codes::PAYLOAD_EMPTY,
                "payload is empty",
            ));
        }
        None
    }

    /// Records a rejection on the inbound row.
    fn reject(&self, receipt: &Receipt) {
        let started = Instant::now();
        // A lost race with an already-settled row keeps the stored receipt;
        // any other write failure leaves the row Received and is audited.
        if let Err(err) = self.ledger.transition(
            &receipt.ref_to_message_id,
            TransmissionStatus::Rejected,
            Some(receipt),
            receipt.error_description.as_deref(),
        ) && !matches!(err, LedgerError::InvalidTransition { .. })
        {
            self.audit.record(AuditEvent {
                action: AuditAction::Receive,
                message_id: Some(receipt.ref_to_message_id.clone()),
                outcome: AuditOutcome::Error,
                detail: Some(err.to_string()),
                duration: started.elapsed(),
            });
        }
    }
}
