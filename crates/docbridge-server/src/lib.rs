// crates/docbridge-server/src/lib.rs
// ============================================================================
// Module: Docbridge Server Library
// Description: Access point configuration, audit sink, and HTTP server.
// Purpose: Assemble the access point from its crates and expose it over HTTP.
// Dependencies: docbridge-core, docbridge-directory, docbridge-exchange,
//               docbridge-identity, docbridge-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! Docbridge Server loads TOML configuration, builds the exchange over the
//! durable ledger, and serves the inbound AS4 endpoint and health probe.
//! Invariants:
//! - Production configuration fails closed: no cleartext, no host overrides,
//!   a signing key, and a non-empty pin set are all required.
//! - Inbound requests are always answered with a receipt document.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod config;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::StderrAuditSink;
pub use config::AccessPointConfig;
pub use config::ConfigError;
pub use config::Environment;
pub use server::AccessPointServer;
pub use server::ServerError;
