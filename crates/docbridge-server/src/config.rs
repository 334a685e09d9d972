// crates/docbridge-server/src/config.rs
// ============================================================================
// Module: Access Point Configuration
// Description: Configuration loading and validation for the access point.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: docbridge-directory, docbridge-exchange, docbridge-identity,
//               docbridge-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Production deployments fail closed: cleartext discovery, directory host
//! overrides, missing signing keys, and empty pin sets are all rejected
//! before the server starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use docbridge_directory::DirectoryConfig;
use docbridge_exchange::TransportConfig;
use docbridge_identity::Fingerprint;
use docbridge_identity::TlsVersion;
use docbridge_identity::TransportTrustConfig;
use docbridge_store_sqlite::SqliteJournalMode;
use docbridge_store_sqlite::SqliteLedgerConfig;
use docbridge_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "docbridge.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "DOCBRIDGE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default server bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum inbound request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
/// Default SML root domain for participant lookups.
const DEFAULT_ROOT_DOMAIN: &str = "edelivery.tech.ec.europa.eu";
/// Default discovery request timeout in milliseconds.
const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 5_000;
/// Default maximum discovery response size in bytes.
const DEFAULT_DIRECTORY_MAX_BYTES: usize = 512 * 1024;
/// Default delivery request timeout in milliseconds.
const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 10_000;
/// Default delivery attempt limit.
const DEFAULT_TRANSPORT_MAX_ATTEMPTS: u32 = 3;
/// Default backoff base in milliseconds between delivery attempts.
const DEFAULT_TRANSPORT_BACKOFF_BASE_MS: u64 = 200;
/// Default maximum delivery response size in bytes.
const DEFAULT_TRANSPORT_MAX_BYTES: usize = 256 * 1024;
/// Default ledger busy timeout in milliseconds.
const DEFAULT_LEDGER_BUSY_TIMEOUT_MS: u64 = 5_000;
/// User agent advertised on outbound HTTP requests.
const USER_AGENT: &str = "docbridge/0.1";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Deployment environment for the access point.
///
/// # Invariants
/// - `Production` enforces the fail-closed validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Production deployment with strict validation.
    #[default]
    Production,
    /// Test deployment; cleartext and overrides are permitted.
    Test,
}

impl Environment {
    /// Returns the configuration label for the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Access point configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessPointConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerSection,
    /// Certificate and key configuration.
    pub identity: IdentitySection,
    /// Participant discovery configuration.
    #[serde(default)]
    pub directory: DirectorySection,
    /// Outbound delivery configuration.
    #[serde(default)]
    pub transport: TransportSection,
    /// Peer trust configuration.
    #[serde(default)]
    pub trust: TrustSection,
    /// Transmission ledger configuration.
    pub ledger: LedgerSection,
}

/// HTTP server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum inbound request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            environment: Environment::default(),
        }
    }
}

/// Certificate and key configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySection {
    /// Path to the PEM certificate file.
    pub certificate_path: PathBuf,
    /// Path to the PEM private key file; absent for verify-only deployments.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    /// Key passphrase; encrypted keys are rejected at load time.
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Participant discovery configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySection {
    /// SML root domain for hashed participant hostnames.
    #[serde(default = "default_root_domain")]
    pub root_domain: String,
    /// Permits cleartext discovery requests.
    #[serde(default)]
    pub allow_http: bool,
    /// Discovery request timeout in milliseconds.
    #[serde(default = "default_directory_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum discovery response size in bytes.
    #[serde(default = "default_directory_max_bytes")]
    pub max_response_bytes: usize,
    /// Replaces the hashed lookup host; test deployments only.
    #[serde(default)]
    pub host_override: Option<String>,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            root_domain: default_root_domain(),
            allow_http: false,
            timeout_ms: default_directory_timeout_ms(),
            max_response_bytes: default_directory_max_bytes(),
            host_override: None,
        }
    }
}

/// Outbound delivery configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSection {
    /// Delivery request timeout in milliseconds.
    #[serde(default = "default_transport_timeout_ms")]
    pub timeout_ms: u64,
    /// Delivery attempt limit.
    #[serde(default = "default_transport_max_attempts")]
    pub max_attempts: u32,
    /// Backoff base in milliseconds between delivery attempts.
    #[serde(default = "default_transport_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delivery response size in bytes.
    #[serde(default = "default_transport_max_bytes")]
    pub max_response_bytes: usize,
    /// Permits cleartext delivery requests.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_transport_timeout_ms(),
            max_attempts: default_transport_max_attempts(),
            backoff_base_ms: default_transport_backoff_base_ms(),
            max_response_bytes: default_transport_max_bytes(),
            allow_http: false,
        }
    }
}

/// Peer trust configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustSection {
    /// Minimum negotiated TLS protocol version label.
    #[serde(default = "default_min_tls_version")]
    pub min_tls_version: String,
    /// Pinned peer certificate fingerprints (hex, optionally colon-separated).
    #[serde(default)]
    pub pinned_fingerprints: Vec<String>,
}

impl Default for TrustSection {
    fn default() -> Self {
        Self {
            min_tls_version: default_min_tls_version(),
            pinned_fingerprints: Vec::new(),
        }
    }
}

/// Transmission ledger configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_ledger_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

// ============================================================================
// SECTION: Default Helpers
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default SML root domain.
fn default_root_domain() -> String {
    DEFAULT_ROOT_DOMAIN.to_string()
}

/// Returns the default discovery timeout.
const fn default_directory_timeout_ms() -> u64 {
    DEFAULT_DIRECTORY_TIMEOUT_MS
}

/// Returns the default discovery response cap.
const fn default_directory_max_bytes() -> usize {
    DEFAULT_DIRECTORY_MAX_BYTES
}

/// Returns the default delivery timeout.
const fn default_transport_timeout_ms() -> u64 {
    DEFAULT_TRANSPORT_TIMEOUT_MS
}

/// Returns the default delivery attempt limit.
const fn default_transport_max_attempts() -> u32 {
    DEFAULT_TRANSPORT_MAX_ATTEMPTS
}

/// Returns the default delivery backoff base.
const fn default_transport_backoff_base_ms() -> u64 {
    DEFAULT_TRANSPORT_BACKOFF_BASE_MS
}

/// Returns the default delivery response cap.
const fn default_transport_max_bytes() -> usize {
    DEFAULT_TRANSPORT_MAX_BYTES
}

/// Returns the default minimum TLS version label.
fn default_min_tls_version() -> String {
    TlsVersion::Tls12.as_str().to_string()
}

/// Returns the default ledger busy timeout.
const fn default_ledger_busy_timeout_ms() -> u64 {
    DEFAULT_LEDGER_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl AccessPointConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from the argument, the `DOCBRIDGE_CONFIG`
    /// environment variable, or `docbridge.toml` in the working directory,
    /// in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be positive".to_string()));
        }
        if self.transport.max_attempts == 0 {
            return Err(ConfigError::Invalid("transport.max_attempts must be positive".to_string()));
        }
        self.min_tls_version()?;
        self.pinned_fingerprints()?;
        if self.server.environment == Environment::Production {
            self.validate_production()?;
        }
        Ok(())
    }

    /// Applies the fail-closed production rules.
    fn validate_production(&self) -> Result<(), ConfigError> {
        if self.directory.allow_http {
            return Err(ConfigError::Invalid(
                "directory.allow_http is not permitted in production".to_string(),
            ));
        }
        if self.transport.allow_http {
            return Err(ConfigError::Invalid(
                "transport.allow_http is not permitted in production".to_string(),
            ));
        }
        if self.directory.host_override.is_some() {
            return Err(ConfigError::Invalid(
                "directory.host_override is not permitted in production".to_string(),
            ));
        }
        if self.identity.private_key_path.is_none() {
            return Err(ConfigError::Invalid(
                "identity.private_key_path is required in production".to_string(),
            ));
        }
        if self.trust.pinned_fingerprints.is_empty() {
            return Err(ConfigError::Invalid(
                "trust.pinned_fingerprints must not be empty in production".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparsable address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.server.bind)))
    }

    /// Returns the parsed minimum TLS version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown version label.
    pub fn min_tls_version(&self) -> Result<TlsVersion, ConfigError> {
        TlsVersion::from_label(&self.trust.min_tls_version).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid trust.min_tls_version: {}",
                self.trust.min_tls_version
            ))
        })
    }

    /// Returns the parsed pin set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparsable fingerprint.
    pub fn pinned_fingerprints(&self) -> Result<BTreeSet<Fingerprint>, ConfigError> {
        self.trust
            .pinned_fingerprints
            .iter()
            .map(|value| {
                Fingerprint::parse(value).ok_or_else(|| {
                    ConfigError::Invalid(format!("invalid pinned fingerprint: {value}"))
                })
            })
            .collect()
    }

    /// Builds the transport trust configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when trust settings are unparsable.
    pub fn trust_config(&self) -> Result<TransportTrustConfig, ConfigError> {
        Ok(TransportTrustConfig {
            min_tls_version: self.min_tls_version()?,
            pinned_fingerprints: self.pinned_fingerprints()?,
        })
    }

    /// Builds the participant directory configuration.
    #[must_use]
    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            root_domain: self.directory.root_domain.clone(),
            allow_http: self.directory.allow_http,
            timeout_ms: self.directory.timeout_ms,
            max_response_bytes: self.directory.max_response_bytes,
            host_override: self.directory.host_override.clone(),
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Builds the outbound delivery configuration.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout_ms: self.transport.timeout_ms,
            max_attempts: self.transport.max_attempts,
            backoff_base_ms: self.transport.backoff_base_ms,
            max_response_bytes: self.transport.max_response_bytes,
            allow_http: self.transport.allow_http,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Builds the `SQLite` ledger configuration.
    #[must_use]
    pub fn ledger_config(&self) -> SqliteLedgerConfig {
        SqliteLedgerConfig {
            path: self.ledger.path.clone(),
            busy_timeout_ms: self.ledger.busy_timeout_ms,
            journal_mode: self.ledger.journal_mode,
            sync_mode: self.ledger.sync_mode,
        }
    }
}

/// Resolves the configuration path from argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(value) = env::var(CONFIG_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(PathBuf::from(value));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Applies hard limits to the configuration path shape.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(
                "config path component exceeds length limit".to_string(),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration is internally inconsistent.
    #[error("config invalid: {0}")]
    Invalid(String),
}
