// crates/docbridge-directory/src/directory.rs
// ============================================================================
// Module: Participant Directory
// Description: Capability lookup and endpoint resolution over HTTP(S).
// Purpose: Resolve participants to trusted delivery endpoints, fail closed.
// Dependencies: crate::smp, docbridge-core, docbridge-identity, base64,
//               reqwest, thiserror, url
// ============================================================================

//! ## Overview
//! The directory answers one question: where, and under which certificate,
//! does a participant receive a given document type. Resolution derives the
//! lookup host from the participant hash, fetches the capability document,
//! follows the matching service reference, and picks the endpoint for the
//! locally supported transport profile. The embedded peer certificate is
//! decoded and window-checked before the endpoint is handed to callers;
//! anything out of shape or out of window is an error, never a guess.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use docbridge_core::DocumentTypeId;
use docbridge_core::ParticipantId;
use docbridge_core::SchemeError;
use docbridge_core::Timestamp;
use docbridge_core::TransportProfile;
use docbridge_identity::AccessPointCertificate;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

use crate::smp;
use crate::smp::EndpointRecord;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Directory lookup errors.
///
/// # Invariants
/// - `NoEndpoint` means the participant is reachable but does not accept the
///   document type over a supported profile; `Lookup` means discovery itself
///   failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Discovery request failed or returned a malformed document.
    #[error("directory lookup failed: {0}")]
    Lookup(String),
    /// No endpoint advertises the document type over a supported profile.
    #[error("no endpoint for participant {participant} and document type {document_type}")]
    NoEndpoint {
        /// Formatted participant identifier.
        participant: String,
        /// Requested document type identifier.
        document_type: String,
    },
    /// The advertised endpoint certificate is unusable.
    #[error("untrusted endpoint: {0}")]
    UntrustedEndpoint(String),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for directory lookups.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` lookups.
/// - `max_response_bytes` is a hard upper bound on discovery documents.
/// - `host_override` replaces the derived host, for static or test
///   deployments; hostname derivation still runs and stays observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Root domain under which lookup hosts are derived.
    pub root_domain: String,
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum discovery document size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Optional fixed `host[:port]` replacing the derived lookup host.
    pub host_override: Option<String>,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            root_domain: "edelivery.tech.ec.europa.eu".to_string(),
            allow_http: false,
            timeout_ms: 5_000,
            max_response_bytes: 512 * 1024,
            host_override: None,
            user_agent: "docbridge/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Resolved Endpoint
// ============================================================================

/// One resolved, window-checked delivery endpoint.
///
/// # Invariants
/// - `certificate` was inside its validity window at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Transport profile the endpoint speaks.
    pub transport_profile: TransportProfile,
    /// Endpoint address URL.
    pub url: String,
    /// Parsed peer certificate.
    pub certificate: AccessPointCertificate,
    /// Whether the peer requires a business-level signature.
    pub require_signature: bool,
    /// Service activation instant, when declared.
    pub activation: Option<Timestamp>,
    /// Service expiration instant, when declared.
    pub expiration: Option<Timestamp>,
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Participant directory backed by hash-derived HTTP(S) lookups.
///
/// # Invariants
/// - Redirects are never followed.
/// - Responses exceeding the configured size fail closed.
pub struct ParticipantDirectory {
    /// Lookup configuration, including limits and policy.
    config: DirectoryConfig,
    /// HTTP client used for discovery requests.
    client: Client,
}

impl ParticipantDirectory {
    /// Creates a directory with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Lookup`] when the HTTP client cannot be
    /// built.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| DirectoryError::Lookup("http client build failed".to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Validates a scheme/identifier pair against the closed registry.
    ///
    /// Deterministic and total: equal inputs always produce equal results.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError`] for unknown schemes or empty identifiers.
    pub fn validate(scheme: &str, identifier: &str) -> Result<ParticipantId, SchemeError> {
        ParticipantId::new(scheme, identifier)
    }

    /// Returns the lookup base URL for a participant.
    fn base_url(&self, participant: &ParticipantId) -> String {
        let host = self.config.host_override.clone().unwrap_or_else(|| {
            smp::lookup_hostname(participant, &self.config.root_domain)
        });
        let scheme = if self.config.allow_http { "http" } else { "https" };
        format!("{scheme}://{host}")
    }

    /// Resolves a participant and document type to a delivery endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Lookup`] when discovery fails,
    /// [`DirectoryError::NoEndpoint`] when the participant does not accept
    /// the document type over a supported profile, and
    /// [`DirectoryError::UntrustedEndpoint`] when the advertised certificate
    /// is malformed or outside its window.
    pub fn resolve(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
    ) -> Result<Endpoint, DirectoryError> {
        let base = self.base_url(participant);
        let group_url = format!("{base}/{}", smp::encode_segment(&participant.formatted()));
        let group_xml = self.fetch(&group_url)?;

        let href = smp::service_references(&group_xml)
            .into_iter()
            .find(|href| smp::reference_matches(href, document_type.as_str()))
            .ok_or_else(|| DirectoryError::NoEndpoint {
                participant: participant.formatted(),
                document_type: document_type.as_str().to_string(),
            })?;

        let metadata_xml = self.fetch(&self.rebase_reference(&href, &base)?)?;
        let record = smp::endpoints(&metadata_xml)
            .into_iter()
            .find(|record| record.transport_profile == TransportProfile::As4V2.as_str())
            .ok_or_else(|| DirectoryError::NoEndpoint {
                participant: participant.formatted(),
                document_type: document_type.as_str().to_string(),
            })?;

        Self::check_endpoint(record, Timestamp::now())
    }

    /// Returns true when the participant accepts the document type.
    ///
    /// Non-failing probe: lookup errors collapse to `false`.
    #[must_use]
    pub fn supports_capability(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
    ) -> bool {
        let base = self.base_url(participant);
        let group_url = format!("{base}/{}", smp::encode_segment(&participant.formatted()));
        self.fetch(&group_url).is_ok_and(|xml| {
            smp::service_references(&xml)
                .iter()
                .any(|href| smp::reference_matches(href, document_type.as_str()))
        })
    }

    /// Rewrites a service reference onto the lookup host when overridden.
    ///
    /// Static and test deployments serve metadata from the same host as the
    /// capability document, whatever host the stored href names.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Lookup`] for unparsable hrefs.
    fn rebase_reference(&self, href: &str, base: &str) -> Result<String, DirectoryError> {
        if self.config.host_override.is_none() {
            return Ok(href.to_string());
        }
        let url = Url::parse(href)
            .map_err(|_| DirectoryError::Lookup(format!("invalid service reference: {href}")))?;
        Ok(format!("{base}{}", url.path()))
    }

    /// Fetches one discovery document with limits enforced.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Lookup`] on transport faults, non-success
    /// status, redirects, or oversized bodies.
    fn fetch(&self, url: &str) -> Result<String, DirectoryError> {
        let parsed = Url::parse(url)
            .map_err(|_| DirectoryError::Lookup(format!("invalid lookup url: {url}")))?;
        match parsed.scheme() {
            "https" => {}
            "http" if self.config.allow_http => {}
            other => {
                return Err(DirectoryError::Lookup(format!("unsupported url scheme: {other}")));
            }
        }
        let response = self
            .client
            .get(parsed.clone())
            .send()
            .map_err(|err| DirectoryError::Lookup(format!("request failed: {err}")))?;
        if response.url() != &parsed {
            return Err(DirectoryError::Lookup("redirect not allowed".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Lookup(format!("lookup returned status {status}")));
        }
        let body = read_limited(response, self.config.max_response_bytes)?;
        String::from_utf8(body)
            .map_err(|_| DirectoryError::Lookup("discovery document is not utf-8".to_string()))
    }

    /// Decodes and window-checks an endpoint record.
    fn check_endpoint(record: EndpointRecord, now: Timestamp) -> Result<Endpoint, DirectoryError> {
        let compact: String =
            record.certificate_b64.chars().filter(|ch| !ch.is_whitespace()).collect();
        let der = BASE64.decode(compact.as_bytes()).map_err(|_| {
            DirectoryError::UntrustedEndpoint("endpoint certificate is not base64".to_string())
        })?;
        let certificate = AccessPointCertificate::from_der(&der)
            .map_err(|err| DirectoryError::UntrustedEndpoint(err.to_string()))?;
        certificate
            .ensure_valid_at(now)
            .map_err(|err| DirectoryError::UntrustedEndpoint(err.to_string()))?;
        if record.activation.is_some_and(|start| now < start) {
            return Err(DirectoryError::UntrustedEndpoint(
                "endpoint service is not yet active".to_string(),
            ));
        }
        if record.expiration.is_some_and(|end| now > end) {
            return Err(DirectoryError::UntrustedEndpoint(
                "endpoint service has expired".to_string(),
            ));
        }
        Ok(Endpoint {
            transport_profile: TransportProfile::As4V2,
            url: record.address,
            certificate,
            require_signature: record.require_signature,
            activation: record.activation,
            expiration: record.expiration,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body while enforcing a byte limit.
fn read_limited(
    response: reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, DirectoryError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| DirectoryError::Lookup("size limit exceeds u64".to_string()))?;
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err(DirectoryError::Lookup("discovery document exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|_| DirectoryError::Lookup("failed to read discovery document".to_string()))?;
    if buf.len() > max_bytes {
        return Err(DirectoryError::Lookup("discovery document exceeds size limit".to_string()));
    }
    Ok(buf)
}
