// crates/docbridge-exchange/src/transport.rs
// ============================================================================
// Module: Trusted Message Transport
// Description: Outbound envelope delivery under the transport trust config.
// Purpose: POST envelopes to resolved endpoints with the peer certificate as
//          sole trust root and bounded retry on transport faults.
// Dependencies: docbridge-identity, reqwest, thiserror
// ============================================================================

//! ## Overview
//! The transport builds a fresh client per delivery because the trust root
//! differs per endpoint: the resolved peer certificate is installed as the
//! only accepted root, built-in roots are disabled, and the configured
//! minimum TLS version is enforced. Transport faults retry with bounded
//! exponential backoff; HTTP-level rejections and response handling never
//! retry, since the peer has already seen the envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use docbridge_identity::TlsVersion;
use docbridge_identity::TransportTrustConfig;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level delivery errors.
///
/// # Invariants
/// - `Unreachable` is the only retried class; it is returned after the final
///   attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP client could not be built for the endpoint.
    #[error("transport client build failed: {0}")]
    Client(String),
    /// Endpoint URL is unusable under the current policy.
    #[error("endpoint url rejected: {0}")]
    Url(String),
    /// Endpoint could not be reached after all attempts.
    #[error("endpoint unreachable after {attempts} attempts: {detail}")]
    Unreachable {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last transport fault observed.
        detail: String,
    },
    /// Endpoint answered with a non-success HTTP status.
    #[error("endpoint returned http status {0}")]
    Status(u16),
    /// Response body could not be read within limits.
    #[error("endpoint response unreadable: {0}")]
    Response(String),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Transport configuration.
///
/// # Invariants
/// - `max_attempts >= 1`; attempt `n` waits `backoff_base_ms * 2^(n-1)`
///   before retrying.
/// - `allow_http = false` blocks cleartext endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum delivery attempts for transport faults.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP endpoints (disabled by default).
    pub allow_http: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_attempts: 3,
            backoff_base_ms: 200,
            max_response_bytes: 256 * 1024,
            allow_http: false,
            user_agent: "docbridge/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Outbound envelope transport.
///
/// # Invariants
/// - Redirects are never followed.
/// - The peer certificate is the only accepted TLS root.
pub struct MessageTransport {
    /// Transport configuration, including retry policy.
    config: TransportConfig,
}

impl MessageTransport {
    /// Creates a transport with the given configuration.
    #[must_use]
    pub const fn new(config: TransportConfig) -> Self {
        Self {
            config,
        }
    }

    /// Delivers one envelope and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unreachable`] when every attempt faults,
    /// [`TransportError::Status`] for non-success HTTP answers, and
    /// [`TransportError::Url`] for endpoints the policy forbids.
    pub fn post(
        &self,
        url: &str,
        body: &str,
        trust: &TransportTrustConfig,
        peer_cert_der: &[u8],
    ) -> Result<String, TransportError> {
        let parsed =
            Url::parse(url).map_err(|_| TransportError::Url(format!("invalid url: {url}")))?;
        let secure = match parsed.scheme() {
            "https" => true,
            "http" if self.config.allow_http => false,
            other => {
                return Err(TransportError::Url(format!("unsupported scheme: {other}")));
            }
        };
        let client = self.build_client(trust, peer_cert_der, secure)?;

        let mut last_fault = String::new();
        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                let shift = attempt.saturating_sub(2).min(16);
                let delay = self.config.backoff_base_ms.saturating_mul(1_u64 << shift);
                std::thread::sleep(Duration::from_millis(delay));
            }
            match client
                .post(parsed.clone())
                .header("content-type", "application/xml")
                .body(body.to_string())
                .send()
            {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(TransportError::Status(status.as_u16()));
                    }
                    return read_limited(response, self.config.max_response_bytes);
                }
                Err(err) => {
                    last_fault = err.to_string();
                }
            }
        }
        Err(TransportError::Unreachable {
            attempts: self.config.max_attempts,
            detail: last_fault,
        })
    }

    /// Builds a client pinned to the peer certificate and trust policy.
    fn build_client(
        &self,
        trust: &TransportTrustConfig,
        peer_cert_der: &[u8],
        secure: bool,
    ) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .user_agent(self.config.user_agent.clone())
            .redirect(Policy::none());
        if secure {
            let root = reqwest::Certificate::from_der(peer_cert_der)
                .map_err(|err| TransportError::Client(err.to_string()))?;
            builder = builder
                .add_root_certificate(root)
                .tls_built_in_root_certs(false)
                .min_tls_version(match trust.min_tls_version {
                    TlsVersion::Tls12 => reqwest::tls::Version::TLS_1_2,
                    TlsVersion::Tls13 => reqwest::tls::Version::TLS_1_3,
                });
        }
        builder.build().map_err(|err| TransportError::Client(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body while enforcing a byte limit.
fn read_limited(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<String, TransportError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TransportError::Response("size limit exceeds u64".to_string()))?;
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err(TransportError::Response("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Response(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(TransportError::Response("response exceeds size limit".to_string()));
    }
    String::from_utf8(buf).map_err(|_| TransportError::Response("response not utf-8".to_string()))
}
