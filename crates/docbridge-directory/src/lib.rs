// crates/docbridge-directory/src/lib.rs
// ============================================================================
// Module: Docbridge Directory Library
// Description: Participant capability discovery and endpoint resolution.
// Purpose: Map participants to trusted delivery endpoints via hash-derived
//          HTTP(S) lookups.
// Dependencies: docbridge-core, docbridge-identity, base64, reqwest,
//               thiserror, url
// ============================================================================

//! ## Overview
//! Docbridge Directory implements participant discovery: scheme validation
//! against the closed registry, hash-derived lookup hostnames, capability and
//! service-metadata document fetches, and endpoint extraction with peer
//! certificate window checks.
//! Invariants:
//! - Hostname derivation is a pure function of scheme, identifier, and root
//!   domain.
//! - Resolution fails closed: malformed documents, unsupported profiles, and
//!   out-of-window certificates are errors, never best guesses.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod directory;
pub mod smp;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use directory::DirectoryConfig;
pub use directory::DirectoryError;
pub use directory::Endpoint;
pub use directory::ParticipantDirectory;
pub use smp::EndpointRecord;
pub use smp::lookup_hostname;
