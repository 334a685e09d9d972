// crates/docbridge-server/src/server.rs
// ============================================================================
// Module: Access Point Server
// Description: HTTP server exposing the inbound AS4 endpoint and health probe.
// Purpose: Wire identity, directory, transport, and ledger into a running
//          access point.
// Dependencies: docbridge-core, docbridge-exchange, docbridge-store-sqlite,
//               axum, tokio
// ============================================================================

//! ## Overview
//! The access point server answers two routes: `POST /as4/inbound` hands inbound
//! envelopes to the exchange and always responds with a receipt document, and
//! `GET /healthz` reports ledger readiness. Startup loads the identity,
//! audits an expiring certificate as a warning, and opens the durable ledger
//! before the listener binds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use docbridge_core::AuditAction;
use docbridge_core::AuditEvent;
use docbridge_core::AuditOutcome;
use docbridge_core::AuditSink;
use docbridge_core::MessageId;
use docbridge_core::Receipt;
use docbridge_core::Timestamp;
use docbridge_core::TransmissionLedger;
use docbridge_core::error_codes;
use docbridge_directory::ParticipantDirectory;
use docbridge_exchange::MessageExchange;
use docbridge_exchange::MessageTransport;
use docbridge_exchange::receipt_to_xml;
use docbridge_identity::CertificateManager;
use docbridge_identity::ExpiryStatus;
use docbridge_store_sqlite::SqliteLedger;
use thiserror::Error;

use crate::audit::StderrAuditSink;
use crate::config::AccessPointConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header naming the tenant an inbound envelope belongs to.
const TENANT_HEADER: &str = "x-tenant-id";
/// Maximum accepted `x-tenant-id` header length in bytes.
const MAX_TENANT_ID_BYTES: usize = 128;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Access point HTTP server.
pub struct AccessPointServer {
    /// Configured listen address.
    bind: SocketAddr,
    /// Shared handler state.
    state: Arc<AppState>,
}

/// Shared state for request handlers.
struct AppState {
    /// Message exchange orchestrator.
    exchange: MessageExchange,
    /// Durable transmission ledger, for readiness probes.
    ledger: Arc<SqliteLedger>,
    /// Maximum inbound request body size.
    max_body_bytes: usize,
}

impl AccessPointServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or initialization fails.
    pub fn from_config(config: &AccessPointConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let audit: Arc<dyn AuditSink> = Arc::new(StderrAuditSink);
        let started = Instant::now();

        let identity = CertificateManager::load(
            &config.identity.certificate_path,
            config.identity.private_key_path.as_deref(),
            config.identity.passphrase.as_deref(),
        )
        .map_err(|err| ServerError::Init(err.to_string()))?;
        if let ExpiryStatus::ExpiringSoon {
            days_left,
        } = identity.expiry_status()
        {
            audit.record(AuditEvent {
                action: AuditAction::Startup,
                message_id: None,
                outcome: AuditOutcome::Warning,
                detail: Some(format!("certificate expires in {days_left} days")),
                duration: started.elapsed(),
            });
        }

        let ledger = Arc::new(
            SqliteLedger::open(&config.ledger_config())
                .map_err(|err| ServerError::Init(err.to_string()))?,
        );
        let directory = ParticipantDirectory::new(config.directory_config())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let transport = MessageTransport::new(config.transport_config());
        let trust = config.trust_config().map_err(|err| ServerError::Config(err.to_string()))?;
        let exchange = MessageExchange::new(
            Arc::new(identity),
            directory,
            transport,
            Arc::clone(&ledger) as Arc<dyn TransmissionLedger>,
            Arc::clone(&audit),
            trust,
        );

        audit.record(AuditEvent {
            action: AuditAction::Startup,
            message_id: None,
            outcome: AuditOutcome::Ok,
            detail: Some(format!("environment {}", config.server.environment.as_str())),
            duration: started.elapsed(),
        });

        Ok(Self {
            bind,
            state: Arc::new(AppState {
                exchange,
                ledger,
                max_body_bytes: config.server.max_body_bytes,
            }),
        })
    }

    /// Serves requests on the configured bind address until failure.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("bind failed: {err}")))?;
        self.serve_on(listener).await
    }

    /// Serves requests on an already-bound listener until failure.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/as4/inbound", post(handle_inbound))
            .route("/healthz", get(handle_health))
            .with_state(self.state);
        axum::serve(listener, app)
            .await
            .map_err(|err| ServerError::Transport(format!("server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles one inbound envelope; always responds with a receipt document.
async fn handle_inbound(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    if let Err(detail) = check_tenant_header(&headers) {
        let receipt = Receipt::failure(
            MessageId::new("unknown"),
            Timestamp::now(),
            error_codes::PARTY_INVALID,
            detail,
        );
        return receipt_response(StatusCode::OK, &receipt);
    }
    if bytes.len() > state.max_body_bytes {
        let receipt = Receipt::failure(
            MessageId::new("unknown"),
            Timestamp::now(),
            error_codes::ENVELOPE_MALFORMED,
            "request body exceeds size limit",
        );
        return receipt_response(StatusCode::PAYLOAD_TOO_LARGE, &receipt);
    }
    let Ok(raw) = std::str::from_utf8(bytes.as_ref()) else {
        let receipt = Receipt::failure(
            MessageId::new("unknown"),
            Timestamp::now(),
            error_codes::ENVELOPE_MALFORMED,
            "request body is not valid utf-8",
        );
        return receipt_response(StatusCode::OK, &receipt);
    };
    let receipt = receive_blocking(&state, raw);
    receipt_response(StatusCode::OK, &receipt)
}

/// Reports ledger readiness.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.ledger.readiness() {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    }
}

/// Validates the `x-tenant-id` header shape when present.
///
/// Tenant routing itself is out of scope; the header is bounded and checked
/// so a later multi-tenant deployment can rely on its shape.
fn check_tenant_header(headers: &HeaderMap) -> Result<(), &'static str> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(());
    };
    let text = value.to_str().map_err(|_| "x-tenant-id header is not visible ascii")?;
    if text.is_empty() || text.len() > MAX_TENANT_ID_BYTES {
        return Err("x-tenant-id header length is out of range");
    }
    Ok(())
}

/// Runs inbound processing, shifting to a blocking context when available.
fn receive_blocking(state: &AppState, raw: &str) -> Receipt {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| state.exchange.receive(raw))
        }
        _ => state.exchange.receive(raw),
    }
}

/// Renders a receipt as an XML response.
fn receipt_response(status: StatusCode, receipt: &Receipt) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    (status, [(CONTENT_TYPE, "application/xml")], receipt_to_xml(receipt))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Access point server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
